//! Error types for the recommendation engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in the recommendation engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Catalog loading or normalization error.
    #[error("catalog error: {0}")]
    Catalog(#[from] shopsense_catalog::CatalogError),

    /// Embedding or index error.
    #[error("embedding error: {0}")]
    Embedding(#[from] shopsense_embeddings::EmbeddingError),

    /// Empty or whitespace-only query text.
    #[error("query text must not be empty")]
    InvalidQuery,

    /// An external provider exceeded its bounded timeout.
    #[error("{operation} timed out after {timeout_secs}s")]
    ProviderTimeout {
        operation: &'static str,
        timeout_secs: u64,
    },

    /// Description generation failed.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Whether the caller may retry the same request unchanged.
    ///
    /// Timeouts and transient provider failures are retryable; input
    /// errors and build-fatal errors are not.
    pub fn is_retryable(&self) -> bool {
        use shopsense_embeddings::EmbeddingError;

        match self {
            Self::ProviderTimeout { .. } => true,
            Self::Embedding(
                EmbeddingError::ApiRequest(_)
                | EmbeddingError::RateLimited { .. }
                | EmbeddingError::Http(_),
            ) => true,
            _ => false,
        }
    }
}
