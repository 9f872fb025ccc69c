//! triage-ai-retriever: local knowledge-base indexing and top-k retrieval
//!
//! Builds an in-memory vector index over a directory of plain-text and
//! markdown documents and serves nearest-neighbor lookups by cosine
//! similarity. The index is constructed once, synchronously, at startup and
//! is immutable afterwards, so it can be shared read-only across any number
//! of concurrent queries.
//!
//! ## Architecture
//!
//! ```text
//! Documents → Chunker → Embedding Backend → KbRetriever
//!                                               ↓
//!                                  retrieve(query, k) → RetrievedChunk
//! ```
//!
//! Chunking comes from `triage-ai-chunk`; the embedding backend (dense
//! model with TF-IDF fallback) comes from `triage-ai-embed`. This crate
//! wires them together and owns the scoring.

pub mod retrieval;

pub use retrieval::config::RetrieverConfig;
pub use retrieval::retriever::{KbRetriever, RetrievedChunk};
pub use retrieval::scoring::cosine_similarity;
