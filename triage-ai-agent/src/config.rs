//! Agent configuration, with environment overrides.

use std::path::PathBuf;

/// Runtime configuration for the triage agent.
///
/// Defaults match the knowledge-base layout; each field can be overridden
/// through the environment (`MEDICAL_KB_DIR`, `RAG_TOP_K`, `MODEL_ID`,
/// `GEMINI_API_KEY`) or through CLI flags downstream.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Directory holding the knowledge-base documents.
    pub kb_dir: PathBuf,
    /// Number of KB chunks retrieved per query.
    pub top_k: usize,
    /// Gemini model identifier.
    pub model_id: String,
    /// API key; absent means the agent cannot call the model.
    pub api_key: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            kb_dir: PathBuf::from("medical_kb"),
            top_k: 8,
            model_id: "gemini-2.0-flash".to_string(),
            api_key: None,
        }
    }
}

impl AgentConfig {
    /// Loads the default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(kb_dir) = std::env::var("MEDICAL_KB_DIR") {
            config.kb_dir = PathBuf::from(kb_dir);
        }
        if let Some(top_k) = std::env::var("RAG_TOP_K")
            .ok()
            .and_then(|value| value.parse().ok())
        {
            config.top_k = top_k;
        }
        if let Ok(model_id) = std::env::var("MODEL_ID") {
            config.model_id = model_id;
        }
        if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
            if !api_key.is_empty() {
                config.api_key = Some(api_key);
            }
        }
        config
    }

    pub fn with_kb_dir(mut self, kb_dir: impl Into<PathBuf>) -> Self {
        self.kb_dir = kb_dir.into();
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.kb_dir, PathBuf::from("medical_kb"));
        assert_eq!(config.top_k, 8);
        assert_eq!(config.model_id, "gemini-2.0-flash");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = AgentConfig::default().with_kb_dir("/data/kb").with_top_k(3);
        assert_eq!(config.kb_dir, PathBuf::from("/data/kb"));
        assert_eq!(config.top_k, 3);
    }
}
