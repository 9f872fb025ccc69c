use std::path::PathBuf;
use triage_ai_chunk::ChunkConfig;
use triage_ai_embed::BackendChoice;

/// Configuration for building a knowledge-base index.
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Directory containing the `.txt` / `.md` knowledge-base documents.
    pub kb_dir: PathBuf,
    /// Chunking parameters applied to every document.
    pub chunking: ChunkConfig,
    /// Embedding backend selection, decided once at build time.
    pub backend: BackendChoice,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            kb_dir: PathBuf::from("medical_kb"),
            chunking: ChunkConfig::default(),
            backend: BackendChoice::Auto,
        }
    }
}

impl RetrieverConfig {
    pub fn new(kb_dir: impl Into<PathBuf>) -> Self {
        Self {
            kb_dir: kb_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_backend(mut self, backend: BackendChoice) -> Self {
        self.backend = backend;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_kb_layout() {
        let config = RetrieverConfig::default();
        assert_eq!(config.kb_dir, PathBuf::from("medical_kb"));
        assert_eq!(config.chunking.max_chars, 1500);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.backend, BackendChoice::Auto);
    }

    #[test]
    fn test_builder_overrides() {
        let config = RetrieverConfig::new("/tmp/kb")
            .with_chunking(ChunkConfig::new(500, 50))
            .with_backend(BackendChoice::TfIdf);
        assert_eq!(config.kb_dir, PathBuf::from("/tmp/kb"));
        assert_eq!(config.chunking.max_chars, 500);
        assert_eq!(config.backend, BackendChoice::TfIdf);
    }
}
