//! The language-model seam.
//!
//! [`TriageModel`] is the single capability the pipeline needs from a
//! model; [`GeminiClient`] is the production implementation over the
//! Gemini `generateContent` REST endpoint. Tests stub the trait instead of
//! talking to the network.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// A model that turns a system prompt and a user prompt into raw text.
#[async_trait]
pub trait TriageModel: Send + Sync {
    async fn generate(&self, system_instruction: &str, prompt: &str) -> Result<String>;

    /// Identifier for logs.
    fn model_id(&self) -> &str;
}

/// Gemini REST client.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model_id: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model_id: model_id.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: RequestContent<'a>,
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl TriageModel for GeminiClient {
    async fn generate(&self, system_instruction: &str, prompt: &str) -> Result<String> {
        let url = format!("{GEMINI_API_BASE}/{}:generateContent", self.model_id);
        let request = GenerateContentRequest {
            system_instruction: RequestContent {
                parts: vec![RequestPart {
                    text: system_instruction,
                }],
            },
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        tracing::debug!("Calling {} ({} prompt chars)", self.model_id, prompt.len());
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("failed to reach the Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Gemini API returned {status}: {body}");
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("failed to decode the Gemini API response")?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(anyhow!("Gemini response contained no text"));
        }
        Ok(text)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
