use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("No admissible point for {what} between {lo} and {hi}")]
    NoAdmissiblePoint { what: &'static str, lo: f64, hi: f64 },

    #[error("Root not bracketed for {what}: f({lo})={f_lo}, f({hi})={f_hi}")]
    NotBracketed {
        what: &'static str,
        lo: f64,
        hi: f64,
        f_lo: f64,
        f_hi: f64,
    },

    #[error("Root search for {what} did not converge in {iterations} iterations (best x={best})")]
    NoConvergence {
        what: &'static str,
        iterations: usize,
        best: f64,
    },
}
