//! Equation-of-state and registry errors.

use mx_core::CoreError;
use thiserror::Error;

/// Result type for EOS operations.
pub type EosResult<T> = Result<T, EosError>;

/// Errors raised by material models and the material registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EosError {
    /// Model parameters that cannot describe a physical material.
    #[error("Non-physical parameter: {what}")]
    NonPhysical { what: &'static str },

    /// State outside the model's valid range.
    #[error("{what} out of model domain: {value}")]
    OutOfDomain { what: &'static str, value: f64 },

    /// Invalid argument.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Material id outside the registry's configured range.
    #[error("Invalid material id {id} (registry holds {nmat} materials)")]
    InvalidMaterialId { id: usize, nmat: usize },

    /// Material id in range but no model registered.
    #[error("No EOS model registered for material {id}")]
    UnknownMaterial { id: usize },

    /// Failure inside a model inversion.
    #[error("Numeric error: {0}")]
    Numeric(#[from] CoreError),
}

impl EosError {
    /// True for registry misuse, which aborts a whole batch rather than one cell.
    pub fn is_registry_error(&self) -> bool {
        matches!(
            self,
            EosError::InvalidMaterialId { .. } | EosError::UnknownMaterial { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EosError::OutOfDomain {
            what: "density",
            value: -1.0,
        };
        assert!(err.to_string().contains("density"));

        let err = EosError::InvalidMaterialId { id: 7, nmat: 3 };
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn registry_errors_are_classified() {
        assert!(EosError::UnknownMaterial { id: 0 }.is_registry_error());
        assert!(!EosError::InvalidArg { what: "x" }.is_registry_error());
    }

    #[test]
    fn core_error_converts() {
        let err: EosError = CoreError::InvalidArg { what: "x" }.into();
        assert!(matches!(err, EosError::Numeric(_)));
    }
}
