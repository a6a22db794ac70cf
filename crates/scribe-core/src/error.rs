//! Error taxonomy shared by every Scribe crate.

/// Errors raised by the retrieval engine.
#[derive(Debug, thiserror::Error)]
pub enum ScribeError {
    /// Bad chunking parameters, `top_k == 0`, unknown provider, and similar.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The embedding provider requires a credential and none was resolved.
    #[error("Missing credential for embedding provider '{0}'")]
    MissingCredential(String),

    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A record violates the store contract (e.g. empty text).
    #[error("Invalid record '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    /// A source document could not be turned into text (bad or image-only PDF).
    #[error("Text extraction failed: {0}")]
    Extraction(String),

    /// Config file could not be read, parsed, or written.
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScribeError {
    /// Whether the caller may safely retry the failed operation.
    ///
    /// Ingestion always starts by clearing and queries never mutate state,
    /// so a retry after one of these leaves the store consistent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingUnavailable(_) | Self::StoreUnavailable(_) | Self::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ScribeError::EmbeddingUnavailable("503".into()).is_retryable());
        assert!(ScribeError::StoreUnavailable("locked".into()).is_retryable());
        assert!(ScribeError::Timeout(100).is_retryable());
        assert!(!ScribeError::MissingCredential("openai".into()).is_retryable());
        assert!(!ScribeError::InvalidConfiguration("overlap".into()).is_retryable());
        assert!(!ScribeError::DimensionMismatch { expected: 3, actual: 2 }.is_retryable());
        assert!(!ScribeError::Extraction("encrypted".into()).is_retryable());
    }

    #[test]
    fn test_display_messages() {
        let err = ScribeError::DimensionMismatch { expected: 1536, actual: 768 };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 1536, got 768");
        let err = ScribeError::MissingCredential("openai".into());
        assert!(err.to_string().contains("openai"));
    }
}
