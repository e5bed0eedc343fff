//! mx-core: stable foundation for mixeos.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (Real + tolerances + float helpers)
//! - ids (compact material identifiers)
//! - roots (bracketed 1-D root finding)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod roots;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use roots::{Bracket, RootConfig, admissible_start, expand_bracket, newton_bisect};
pub use units::*;
