//! mx-batch: flat-array batch evaluation for mixeos.
//!
//! Contains:
//! - descriptor (the flat per-cell / per-material array boundary)
//! - driver (parallel per-cell closure and the batch report)
//! - context (registry + solver policy + worker pool, init/finalize)
//! - deck (YAML/JSON batch decks for running the engine without Rust code)

pub mod context;
pub mod deck;
pub mod descriptor;
pub mod driver;

pub use context::EosContext;
pub use deck::{BatchDeck, DeckError, DeckResult};
pub use descriptor::{
    BatchBuffers, BatchLayout, CellArrays, CellBatch, CellInit, MaterialArrays,
};
pub use driver::{BatchReport, CellFailure, CellStatus, FRACTION_TOL, run_batch};
