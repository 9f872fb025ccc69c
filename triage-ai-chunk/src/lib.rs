//! Heading-aware text chunking for the triage knowledge base.
//!
//! This crate turns raw knowledge-base documents (plain text or markdown)
//! into addressable passages suitable for embedding and retrieval. Documents
//! are first split on `#`/`##` heading boundaries into titled sections;
//! sections longer than the configured maximum are windowed with overlap so
//! that no passage exceeds the embedding model's comfortable input size.
//!
//! Every chunk carries a deterministic id derived from its source file name
//! and a content fingerprint. The same corpus always produces the same ids,
//! which is what allows downstream output to cite chunks stably across
//! rebuilds.
//!
//! # Example
//!
//! ```
//! use triage_ai_chunk::{ChunkConfig, Chunker};
//!
//! let chunker = Chunker::new(ChunkConfig::default()).unwrap();
//! let chunks = chunker.chunk("## Flu\nFever, cough, fatigue.", "flu.md");
//!
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].title, "Flu");
//! assert_eq!(chunks[0].source, "flu.md");
//! ```

pub mod chunk;

pub use chunk::{ChunkConfig, ChunkError, Chunker, KbChunk};
