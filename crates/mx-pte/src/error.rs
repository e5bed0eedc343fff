//! Error types for mixed-cell evaluation.

use mx_core::CoreError;
use mx_eos::EosError;
use thiserror::Error;

/// Errors that can occur while closing a cell or a batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MixError {
    #[error("Invalid material id {id} (registry holds {nmat} materials)")]
    InvalidMaterialId { id: usize, nmat: usize },

    #[error("No EOS model registered for material {id}")]
    UnknownMaterial { id: usize },

    #[error("Out of model domain: {0}")]
    OutOfDomain(EosError),

    /// `pressure` and `temperature` are the last evaluated iterate, NaN when
    /// no iterate could be evaluated.
    #[error(
        "PTE did not converge after {iterations} iterations (residual {residual:.3e}, P={pressure:.6e}, T={temperature:.6e})"
    )]
    PteConvergenceFailure {
        iterations: usize,
        residual: f64,
        pressure: f64,
        temperature: f64,
    },

    #[error("Malformed batch: {what}")]
    MalformedBatch { what: String },

    #[error("Invalid solver configuration: {what}")]
    InvalidConfig { what: &'static str },

    #[error("EOS error: {0}")]
    Eos(EosError),
}

pub type MixResult<T> = Result<T, MixError>;

impl MixError {
    /// True for failures confined to one cell; the rest of the batch proceeds.
    pub fn is_cell_local(&self) -> bool {
        matches!(
            self,
            MixError::OutOfDomain(_)
                | MixError::PteConvergenceFailure { .. }
                | MixError::MalformedBatch { .. }
                | MixError::Eos(_)
        )
    }
}

impl From<EosError> for MixError {
    fn from(e: EosError) -> Self {
        match e {
            EosError::InvalidMaterialId { id, nmat } => MixError::InvalidMaterialId { id, nmat },
            EosError::UnknownMaterial { id } => MixError::UnknownMaterial { id },
            EosError::OutOfDomain { .. } | EosError::Numeric(_) => MixError::OutOfDomain(e),
            other => MixError::Eos(other),
        }
    }
}

impl From<CoreError> for MixError {
    fn from(e: CoreError) -> Self {
        MixError::OutOfDomain(EosError::Numeric(e))
    }
}
