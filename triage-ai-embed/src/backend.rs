//! The embedding backend trait, the dense-model implementation, and the
//! one-time backend selection performed at index-build time.

use crate::error::{EmbedError, Result};
use crate::tfidf::TfIdfBackend;
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

/// Batch size for dense encoding; keeps peak memory bounded.
const DENSE_BATCH_SIZE: usize = 16;

/// A batch of embeddings, one row per input text.
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    /// The embedding vectors, in input order.
    pub vectors: Vec<Vec<f32>>,
    /// Dimensionality of each row, inferred from the first one.
    pub dimension: usize,
}

impl EmbeddingMatrix {
    pub fn new(vectors: Vec<Vec<f32>>) -> Self {
        let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);
        Self { vectors, dimension }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// A backend that maps batches of text into one fixed vector space.
///
/// Encoding is deterministic for a given backend instance and free of
/// observable side effects. Vectors from different instances are not
/// comparable; the index and its queries must share one instance.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Encodes a batch of texts into a matrix of shape `[len, dim]`.
    async fn encode(&self, texts: &[String]) -> Result<EmbeddingMatrix>;

    /// Dimensionality of the vectors this backend produces.
    fn dimension(&self) -> usize;

    /// Short identifier for logs and diagnostics.
    fn backend_name(&self) -> &str;
}

/// Which embedding backend to use for an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendChoice {
    /// Try the dense model, fall back to TF-IDF if it cannot be loaded.
    #[default]
    Auto,
    /// Require the dense model; construction fails if unavailable.
    Dense,
    /// Use the TF-IDF fallback unconditionally.
    TfIdf,
}

/// Selects the embedding backend for a corpus, once, at startup.
///
/// Under [`BackendChoice::Auto`] the dense model is preferred; if it cannot
/// be constructed the TF-IDF fallback is fit from `corpus` instead, and the
/// substitution is reported at warn level. The decision is made here and
/// never revisited per call.
pub async fn select_backend(
    corpus: &[String],
    choice: BackendChoice,
) -> Result<Arc<dyn EmbeddingBackend>> {
    match choice {
        BackendChoice::Dense => {
            let dense = DenseBackend::create().await?;
            Ok(Arc::new(dense))
        }
        BackendChoice::TfIdf => Ok(Arc::new(TfIdfBackend::fit(corpus))),
        BackendChoice::Auto => match DenseBackend::create().await {
            Ok(dense) => {
                tracing::info!(
                    "Using dense embedding backend ({}, dimension {})",
                    dense.backend_name(),
                    dense.dimension()
                );
                Ok(Arc::new(dense))
            }
            Err(err) => {
                tracing::warn!(
                    "Dense embedding model unavailable ({err}); falling back to TF-IDF"
                );
                Ok(Arc::new(TfIdfBackend::fit(corpus)))
            }
        },
    }
}

/// Dense sentence-embedding backend over a local ONNX model.
///
/// The model already L2-normalizes its output; normalization is applied
/// again here so downstream code may rely on unit vectors even if a future
/// model does not.
pub struct DenseBackend {
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl std::fmt::Debug for DenseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseBackend")
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl DenseBackend {
    /// Loads the built-in sentence-embedding model.
    ///
    /// Loading happens on a blocking task; the dimension is probed with a
    /// test embedding rather than hard-coded.
    pub async fn create() -> Result<Self> {
        let (model, dimension) =
            tokio::task::spawn_blocking(|| -> Result<(TextEmbedding, usize)> {
                tracing::debug!("Loading embedding model: AllMiniLML6V2");

                let init_options =
                    InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
                let mut model = TextEmbedding::try_new(init_options)
                    .map_err(|e| EmbedError::External { source: e })?;

                let probe = model
                    .embed(vec!["test".to_string()], None)
                    .map_err(|e| EmbedError::External { source: e })?;
                let dimension = probe.first().map(|emb| emb.len()).unwrap_or(384);

                tracing::debug!("Model loaded, dimension {dimension}");
                Ok((model, dimension))
            })
            .await??;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimension,
        })
    }

    fn normalize(embeddings: Vec<Vec<f32>>) -> Vec<Vec<f32>> {
        embeddings
            .into_iter()
            .map(|mut embedding| {
                let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for value in &mut embedding {
                        *value /= norm;
                    }
                }
                embedding
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingBackend for DenseBackend {
    async fn encode(&self, texts: &[String]) -> Result<EmbeddingMatrix> {
        if texts.is_empty() {
            return Ok(EmbeddingMatrix::new(vec![]));
        }

        tracing::debug!("Encoding {} texts with the dense backend", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(DENSE_BATCH_SIZE) {
            let batch = batch.to_vec();
            let model = Arc::clone(&self.model);

            let batch_embeddings = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                let mut guard = model.lock().unwrap();
                guard
                    .embed(batch, None)
                    .map_err(|e| EmbedError::External { source: e })
            })
            .await??;

            all_embeddings.extend(Self::normalize(batch_embeddings));
        }

        Ok(EmbeddingMatrix::new(all_embeddings))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend_name(&self) -> &str {
        "fastembed"
    }
}
