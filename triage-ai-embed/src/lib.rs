//! # triage-ai-embed
//!
//! Embedding backends for the triage knowledge base. Maps batches of text
//! to fixed-dimension vectors behind a single [`EmbeddingBackend`] trait,
//! with two implementations:
//!
//! - [`DenseBackend`]: a local sentence-embedding model (fastembed /
//!   AllMiniLML6V2, ONNX). Preferred when the model can be loaded.
//! - [`TfIdfBackend`]: a TF-IDF fallback fit once from the chunk corpus,
//!   requiring nothing beyond the corpus itself.
//!
//! [`select_backend`] performs the one-time selection at index-build time:
//! it tries the dense model and falls back to TF-IDF, reporting the
//! substitution through `tracing` rather than failing the build.
//!
//! Vectors produced by one backend instance are directly comparable with
//! each other and with nothing else: an index and every query against it
//! must go through the same backend instance for the index's lifetime.
//!
//! ## Quick Start
//!
//! ```no_run
//! use triage_ai_embed::{BackendChoice, EmbeddingBackend, select_backend};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let corpus = vec!["fever and cough".to_string(), "runny nose".to_string()];
//! let backend = select_backend(&corpus, BackendChoice::Auto).await?;
//! let matrix = backend.encode(&corpus).await?;
//! assert_eq!(matrix.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod tfidf;

pub use backend::{BackendChoice, DenseBackend, EmbeddingBackend, EmbeddingMatrix, select_backend};
pub use error::{EmbedError, Result};
pub use tfidf::TfIdfBackend;
