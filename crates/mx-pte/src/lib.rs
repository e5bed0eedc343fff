//! Pressure-temperature equilibrium (PTE) closure for mixed cells.
//!
//! Given the mass fractions of the materials sharing a cell and the cell's
//! independent-variable pair, this crate finds one pressure and temperature
//! shared by every material such that the materials' specific volumes and
//! energies add up to the cell's. The unknowns depend on the input mode:
//! (P, T) for density-energy input, P alone for density-temperature input,
//! T alone for density-pressure input, and nothing for pressure-temperature
//! input.
//!
//! The density-energy solve is a damped Newton iteration on (P, T) with a
//! nested pressure-bisection fallback. All per-cell working memory lives in a
//! reusable `PteScratch`, so the iteration itself never allocates.

pub mod config;
pub mod error;
mod fallback;
pub mod mode;
mod newton;
pub mod pte;
pub mod scratch;
pub mod single;

pub use config::{FallbackPolicy, PteConfig};
pub use error::{MixError, MixResult};
pub use mode::InputMode;
pub use pte::{CellTarget, PteSolution, solve};
pub use scratch::{PteScratch, SlotState};
