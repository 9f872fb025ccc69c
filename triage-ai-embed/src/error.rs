//! Error types for the embedding backends.

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type covering embedding backend construction and encoding.
///
/// Integrates with [`thiserror`] for [`std::error::Error`] and supports
/// chaining so callers see the underlying model failure, not just a label.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// A backend was asked to do something its configuration cannot support.
    #[error("invalid backend configuration: {message}")]
    InvalidConfig { message: String },

    /// The dense model could not be loaded.
    #[error("model initialization failed: {source}")]
    ModelInitialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Encoding a batch of texts failed.
    #[error("embedding generation failed: {source}")]
    EmbeddingGeneration {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A blocking embedding task panicked or was cancelled.
    #[error("async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Errors surfaced by the underlying embedding library.
    #[error("external error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Wraps an error that occurred while loading the dense model.
    pub fn model_init<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ModelInitialization {
            source: Box::new(source),
        }
    }

    /// Wraps an error that occurred while encoding a batch.
    pub fn embedding_gen<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::EmbeddingGeneration {
            source: Box::new(source),
        }
    }

    /// Creates a configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
