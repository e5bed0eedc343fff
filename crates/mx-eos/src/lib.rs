//! mx-eos: single-material equations of state for mixeos.
//!
//! Provides:
//! - `EosModel`, the capability contract every material model implements
//! - analytic models (ideal gas, JWL, Mie-Grüneisen, Davis reactants and products)
//! - `MaterialState`, a fully evaluated single-material state
//! - `MaterialRegistry`, the material id → model table used during batch evaluation
//!
//! # Architecture
//!
//! The mixed-cell solver only talks to `&dyn EosModel`. Models are expressed in
//! (density, temperature) as the primary independent pair; everything else
//! (energy inversion, pressure-temperature inversion, bulk modulus, Grüneisen
//! parameter) has a default implementation in terms of that pair, which analytic
//! models override with closed forms. Table-backed models plug in the same way.
//!
//! # Example
//!
//! ```
//! use mx_core::MaterialId;
//! use mx_eos::{EosModel, MaterialRegistry};
//!
//! let mut registry = MaterialRegistry::new(2);
//! let air = MaterialId::from_index(0).unwrap();
//! registry.register_ideal_gas(air, 0.4, 718.0).unwrap();
//!
//! let model = registry.lookup(air).unwrap();
//! let p = model.pressure_from_density_temperature(1.2, 300.0).unwrap();
//! assert!((p - 0.4 * 1.2 * 718.0 * 300.0).abs() < 1e-6);
//! ```

pub mod error;
pub mod model;
pub mod models;
pub mod registry;
pub mod state;

// Re-exports for ergonomics
pub use error::{EosError, EosResult};
pub use model::{EosModel, StateDerivatives};
pub use models::{
    DavisProducts, DavisProductsParams, DavisReactants, DavisReactantsParams, Gruneisen,
    GruneisenParams, IdealGas, Jwl, JwlParams,
};
pub use registry::MaterialRegistry;
pub use state::MaterialState;
