//! Analytic equation-of-state models.

pub mod davis_products;
pub mod davis_reactants;
pub mod gruneisen;
pub mod ideal_gas;
pub mod jwl;

pub use davis_products::{DavisProducts, DavisProductsParams};
pub use davis_reactants::{DavisReactants, DavisReactantsParams};
pub use gruneisen::{Gruneisen, GruneisenParams};
pub use ideal_gas::IdealGas;
pub use jwl::{Jwl, JwlParams};
