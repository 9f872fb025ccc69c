//! Index construction and top-k retrieval.

use crate::retrieval::config::RetrieverConfig;
use crate::retrieval::scoring::cosine_similarity;
use anyhow::{Context, Result, ensure};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use triage_ai_chunk::{Chunker, KbChunk};
use triage_ai_embed::{EmbeddingBackend, select_backend};

/// A chunk plus its similarity score for one query. Transient, per query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub title: String,
    pub text: String,
    pub score: f32,
}

/// In-memory knowledge-base index with cosine-similarity retrieval.
///
/// Holds the chunk corpus and its embeddings in parallel order, plus the
/// backend instance that produced them. Built once, immutable afterwards:
/// retrieval borrows `&self`, so a built index is safe to share across
/// concurrent queries without locking.
pub struct KbRetriever {
    chunks: Vec<KbChunk>,
    embeddings: Vec<Vec<f32>>,
    backend: Arc<dyn EmbeddingBackend>,
}

impl std::fmt::Debug for KbRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KbRetriever")
            .field("chunks", &self.chunks.len())
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

impl KbRetriever {
    /// Reads every `.txt` / `.md` document under `config.kb_dir`, chunks
    /// them, selects the embedding backend, and encodes the whole corpus in
    /// one batch (which doubles as the TF-IDF fit).
    ///
    /// A missing or empty directory produces a valid empty index and a
    /// warning, not an error; an unreadable directory propagates as an
    /// error since nothing can be served without an index.
    pub async fn build(config: RetrieverConfig) -> Result<Self> {
        let chunker = Chunker::new(config.chunking.clone())?;

        let mut chunks: Vec<KbChunk> = Vec::new();
        if config.kb_dir.is_dir() {
            for path in kb_files(&config.kb_dir).await? {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read KB document {}", path.display()))?;
                // Best-effort decode: one bad file must not sink the build.
                let text = String::from_utf8_lossy(&bytes);
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();
                chunks.extend(chunker.chunk(&text, &name));
            }
        } else {
            tracing::warn!(
                "KB directory {} not found; building an empty index",
                config.kb_dir.display()
            );
        }

        if chunks.is_empty() {
            tracing::warn!("No KB chunks found; retrieval will return empty results");
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let backend = select_backend(&texts, config.backend).await?;
        let retriever = Self::from_chunks(chunks, backend).await?;

        tracing::info!(
            "Indexed {} chunks from {} ({} backend)",
            retriever.len(),
            config.kb_dir.display(),
            retriever.backend_name()
        );
        Ok(retriever)
    }

    /// Builds an index over an already-chunked corpus with an injected
    /// backend. This is the seam tests and the eval harness use to run
    /// against a known corpus without touching the filesystem.
    pub async fn from_chunks(
        chunks: Vec<KbChunk>,
        backend: Arc<dyn EmbeddingBackend>,
    ) -> Result<Self> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let matrix = backend.encode(&texts).await?;
        ensure!(
            matrix.len() == chunks.len(),
            "backend returned {} vectors for {} chunks",
            matrix.len(),
            chunks.len()
        );
        Ok(Self {
            chunks,
            embeddings: matrix.vectors,
            backend,
        })
    }

    /// Returns the top-`k` chunks for `query`, ranked by descending cosine
    /// similarity.
    ///
    /// `k == 0` and an empty index both yield an empty result without
    /// error; `k` beyond the corpus size returns the whole corpus ranked.
    /// Equal scores keep corpus order, so results are reproducible.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let matrix = self.backend.encode(&[query.to_string()]).await?;
        let query_vector = matrix
            .vectors
            .into_iter()
            .next()
            .context("backend returned no vector for the query")?;

        let mut scored: Vec<(f32, usize)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(index, embedding)| (cosine_similarity(&query_vector, embedding), index))
            .collect();
        // Stable sort: ties keep corpus order.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, index)| {
                let chunk = &self.chunks[index];
                RetrievedChunk {
                    id: chunk.id.clone(),
                    title: chunk.title.clone(),
                    text: chunk.text.clone(),
                    score,
                }
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }
}

/// Collects KB document paths in lexicographic filename order, so chunk
/// ordering (and therefore ranking tie-breaks) is reproducible.
async fn kb_files(kb_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(kb_dir)
        .await
        .with_context(|| format!("failed to read KB directory {}", kb_dir.display()))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed to list KB directory {}", kb_dir.display()))?
    {
        let path = entry.path();
        if path.is_file() && is_kb_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn is_kb_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "txt" | "md"))
        .unwrap_or(false)
}
