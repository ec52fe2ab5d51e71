//! Error types shared by the scheduler and the optimizer

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors reported by scheduling and fitting operations.
///
/// All variants are local and recoverable. Every operation is deterministic
/// given identical inputs, so the caller decides whether a retry makes sense.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Malformed or logically inconsistent card, rating, config or log input
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Fitting attempted on an empty or degenerate corpus
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// An intermediate value became NaN or infinite
    #[error("Numeric divergence: {0}")]
    NumericDivergence(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    pub(crate) fn insufficient(msg: impl Into<String>) -> Self {
        Error::InsufficientData(msg.into())
    }

    pub(crate) fn diverged(msg: impl Into<String>) -> Self {
        Error::NumericDivergence(msg.into())
    }
}

/// Result type for all fallible lethe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Surface a non-finite value instead of letting it flow into a card or weight.
pub(crate) fn ensure_finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::diverged(format!("{what} evaluated to {value}")))
    }
}
