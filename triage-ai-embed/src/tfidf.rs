//! TF-IDF fallback backend.
//!
//! Used when the dense model cannot be loaded. The vocabulary and idf
//! weights are fit exactly once, from the chunk corpus, before any query is
//! encoded; queries reuse the fitted state without refitting. Tokens unseen
//! at fit time are silently dropped; the fallback cannot retrieve on
//! vocabulary it never saw, which is an accepted limit of this variant.

use crate::backend::{EmbeddingBackend, EmbeddingMatrix};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};

/// TF-IDF vectorizer over a fixed, fitted vocabulary.
pub struct TfIdfBackend {
    vocab: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl std::fmt::Debug for TfIdfBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfIdfBackend")
            .field("vocabulary", &self.vocab.len())
            .finish()
    }
}

impl TfIdfBackend {
    /// Fits the vocabulary and idf weights from the corpus.
    ///
    /// Columns are assigned in sorted token order so the vector space is
    /// deterministic for a given corpus. The smoothed form
    /// `idf(t) = ln((N+1)/(df(t)+1)) + 1` keeps every weight strictly
    /// positive, even for tokens present in all documents.
    pub fn fit(corpus: &[String]) -> Self {
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        for doc in corpus {
            let mut seen: HashSet<String> = HashSet::new();
            for token in tokenize(doc) {
                if seen.insert(token.clone()) {
                    *doc_freq.entry(token).or_insert(0) += 1;
                }
            }
        }

        let n = corpus.len();
        let mut vocab = HashMap::with_capacity(doc_freq.len());
        let mut idf = Vec::with_capacity(doc_freq.len());
        for (column, (token, df)) in doc_freq.into_iter().enumerate() {
            vocab.insert(token, column);
            idf.push(((n + 1) as f32 / (df + 1) as f32).ln() + 1.0);
        }

        tracing::debug!("Fitted TF-IDF vocabulary of {} tokens", idf.len());
        Self { vocab, idf }
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.idf.len()];
        for token in tokenize(text) {
            if let Some(&column) = self.vocab.get(&token) {
                vector[column] += 1.0;
            }
        }
        for (value, weight) in vector.iter_mut().zip(&self.idf) {
            *value *= weight;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        // A zero-norm vector stays zero and scores 0 against everything.
        vector
    }

    #[cfg(test)]
    pub(crate) fn idf_weights(&self) -> &[f32] {
        &self.idf
    }
}

#[async_trait]
impl EmbeddingBackend for TfIdfBackend {
    async fn encode(&self, texts: &[String]) -> Result<EmbeddingMatrix> {
        let vectors = texts.iter().map(|text| self.encode_one(text)).collect();
        Ok(EmbeddingMatrix {
            vectors,
            dimension: self.idf.len(),
        })
    }

    fn dimension(&self) -> usize {
        self.idf.len()
    }

    fn backend_name(&self) -> &str {
        "tfidf"
    }
}

/// Lowercases and extracts maximal runs of ASCII alphanumerics.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            current.push(ch.to_ascii_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
