use thiserror::Error;

/// Errors returned by audio buffer and resampler operations.
#[derive(Debug, Error)]
pub enum ResamplerError {
    /// A buffer or parameter supplied by the caller does not match what the
    /// resampler was configured for.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The conversion engine failed, or the resampler was used in the wrong
    /// lifecycle state.
    #[error("resampler: {0}")]
    Runtime(String),
}

impl ResamplerError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ResamplerError::InvalidArgument(msg.into())
    }

    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        ResamplerError::Runtime(msg.into())
    }

    /// Returns true for caller errors.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, ResamplerError::InvalidArgument(_))
    }
}

impl From<rubato::ResamplerConstructionError> for ResamplerError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        ResamplerError::Runtime(format!("rubato: {}", e))
    }
}

impl From<rubato::ResampleError> for ResamplerError {
    fn from(e: rubato::ResampleError) -> Self {
        ResamplerError::Runtime(format!("rubato: {}", e))
    }
}

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ResamplerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResamplerError::invalid("layout mismatch");
        assert_eq!(err.to_string(), "invalid argument: layout mismatch");

        let err = ResamplerError::runtime("not opened");
        assert_eq!(err.to_string(), "resampler: not opened");
    }

    #[test]
    fn test_error_kind() {
        assert!(ResamplerError::invalid("x").is_invalid_argument());
        assert!(!ResamplerError::runtime("x").is_invalid_argument());
    }
}
