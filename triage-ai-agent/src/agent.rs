//! The triage pipeline: red flags → retrieval → model → validated output.

use crate::llm::TriageModel;
use crate::prompt::{SAFETY_SYSTEM_PROMPT, differential_prompt, format_kb_excerpts, patient_block};
use crate::safety::check_red_flags;
use crate::schemas::{EmergencyOutput, SymptomInput, TriageOutput};
use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;
use triage_ai_retriever::KbRetriever;

static JSON_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<JSON>\s*(.*?)\s*</JSON>").expect("tag pattern is valid"));
static SUMMARY_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<SUMMARY>\s*(.*?)\s*</SUMMARY>").expect("tag pattern is valid")
});
static JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("block pattern is valid"));

/// The outcome of one triage run.
#[derive(Debug)]
pub struct TriageReport {
    /// The rule-based red-flag result, regardless of what the model said.
    pub emergency: EmergencyOutput,
    /// Parsed and validated structured output, when the model produced one.
    pub structured: Option<TriageOutput>,
    /// Human-readable summary (the model's, or its raw response as a
    /// fallback when no summary tags were found).
    pub summary: String,
}

/// Runs the triage pipeline against an injected retriever and model.
pub struct TriageAgent {
    retriever: KbRetriever,
    model: Box<dyn TriageModel>,
    top_k: usize,
}

impl TriageAgent {
    pub fn new(retriever: KbRetriever, model: Box<dyn TriageModel>, top_k: usize) -> Self {
        Self {
            retriever,
            model,
            top_k,
        }
    }

    pub async fn run(&self, input: &SymptomInput) -> Result<TriageReport> {
        let emergency = check_red_flags(input);
        if emergency.is_emergency {
            tracing::info!("Red flags triggered: {}", emergency.reasons.join("; "));
        }

        let retrieved = self
            .retriever
            .retrieve(&input.symptoms_text, self.top_k)
            .await?;
        if retrieved.is_empty() {
            tracing::warn!("Knowledge base returned no supporting chunks for this query");
        }

        let prompt = differential_prompt(&patient_block(input), &format_kb_excerpts(&retrieved));
        let raw = self.model.generate(SAFETY_SYSTEM_PROMPT, &prompt).await?;
        tracing::debug!(
            "Model {} returned {} chars",
            self.model.model_id(),
            raw.len()
        );

        let (mut structured, summary) = parse_model_output(&raw);

        // The rule-based result outranks the model's emergency section.
        if emergency.is_emergency {
            if let Some(output) = structured.as_mut() {
                output.emergency = emergency.clone();
            }
        }

        Ok(TriageReport {
            emergency,
            structured,
            summary,
        })
    }
}

/// Extracts the structured output and summary from a model response.
///
/// Prefers a `<JSON>…</JSON>` block, falling back to the first `{…}` span;
/// the summary comes from `<SUMMARY>…</SUMMARY>` or defaults to the whole
/// response. A response that cannot be parsed or fails validation yields
/// `(None, summary)`: degraded, not fatal.
pub fn parse_model_output(raw: &str) -> (Option<TriageOutput>, String) {
    let json_str = JSON_TAG
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .or_else(|| JSON_BLOCK.find(raw).map(|m| m.as_str().to_string()));

    let summary = SUMMARY_TAG
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| raw.to_string());

    if let Some(json_str) = json_str {
        match serde_json::from_str::<TriageOutput>(&json_str) {
            Ok(output) => match output.validate() {
                Ok(()) => return (Some(output), summary),
                Err(err) => tracing::warn!("Model output failed validation: {err}"),
            },
            Err(err) => tracing::warn!("Could not parse structured model output: {err}"),
        }
    }

    (None, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::DISCLAIMER;
    use async_trait::async_trait;
    use std::sync::Arc;
    use triage_ai_chunk::{ChunkConfig, Chunker};
    use triage_ai_embed::TfIdfBackend;

    fn tagged_response() -> String {
        format!(
            "<JSON>{{\"emergency\": {{\"is_emergency\": false}}, \
             \"most_important_questions\": [\"How long?\", \"Any fever?\", \"Any cough?\"], \
             \"disclaimer\": \"{DISCLAIMER}\"}}</JSON>\
             <SUMMARY>A calm recap.</SUMMARY>"
        )
    }

    #[test]
    fn test_parse_prefers_tagged_json_and_summary() {
        let (structured, summary) = parse_model_output(&tagged_response());
        let output = structured.unwrap();
        assert_eq!(output.most_important_questions.len(), 3);
        assert_eq!(summary, "A calm recap.");
    }

    #[test]
    fn test_parse_falls_back_to_bare_json_block() {
        let raw = "Here you go:\n{\"emergency\": {\"is_emergency\": true, \
                   \"reasons\": [\"chest pain\"], \"immediate_action\": \"Call 911.\"}}";
        let (structured, summary) = parse_model_output(raw);
        assert!(structured.unwrap().emergency.is_emergency);
        assert_eq!(summary, raw);
    }

    #[test]
    fn test_parse_tolerates_garbage() {
        let (structured, summary) = parse_model_output("I am sorry, I cannot help with that.");
        assert!(structured.is_none());
        assert_eq!(summary, "I am sorry, I cannot help with that.");
    }

    #[test]
    fn test_parse_drops_invalid_structured_output() {
        let raw = "{\"emergency\": {\"is_emergency\": false}, \"differential\": [\
                   {\"condition\": \"X\", \"percent\": 500.0, \"confidence\": \"low\", \
                   \"supporting_features\": [], \"missing_or_contradicting_features\": [], \
                   \"rationale\": \"\"}]}";
        let (structured, _) = parse_model_output(raw);
        assert!(structured.is_none());
    }

    /// Model stub returning a canned response; records nothing, talks to nothing.
    struct StubModel {
        response: String,
    }

    #[async_trait]
    impl TriageModel for StubModel {
        async fn generate(&self, _system: &str, _prompt: &str) -> Result<String> {
            Ok(self.response.clone())
        }

        fn model_id(&self) -> &str {
            "stub"
        }
    }

    async fn kb_retriever() -> KbRetriever {
        let chunker = Chunker::new(ChunkConfig::default()).unwrap();
        let mut chunks = chunker.chunk("## Flu\nFever, cough, fatigue.", "flu.md");
        chunks.extend(chunker.chunk("## Cold\nRunny nose, sneezing.", "cold.md"));
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let backend = Arc::new(TfIdfBackend::fit(&texts));
        KbRetriever::from_chunks(chunks, backend).await.unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_forces_rule_based_emergency() {
        let agent = TriageAgent::new(
            kb_retriever().await,
            Box::new(StubModel {
                response: tagged_response(),
            }),
            8,
        );

        // The stub says is_emergency=false, but the rules disagree.
        let input = SymptomInput::from_text("crushing chest pain and fever");
        let report = agent.run(&input).await.unwrap();

        assert!(report.emergency.is_emergency);
        let structured = report.structured.unwrap();
        assert!(structured.emergency.is_emergency);
        assert!(!structured.emergency.reasons.is_empty());
        assert_eq!(report.summary, "A calm recap.");
    }

    #[tokio::test]
    async fn test_pipeline_passes_calm_output_through() {
        let agent = TriageAgent::new(
            kb_retriever().await,
            Box::new(StubModel {
                response: tagged_response(),
            }),
            8,
        );

        let input = SymptomInput::from_text("mild runny nose and sneezing");
        let report = agent.run(&input).await.unwrap();

        assert!(!report.emergency.is_emergency);
        assert!(!report.structured.unwrap().emergency.is_emergency);
    }
}
