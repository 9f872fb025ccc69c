//! Prompt construction for the triage model call.
//!
//! The system prompt and the differential template are fixed text; the
//! per-query prompt is assembled from the patient's structured input and
//! the retrieved knowledge-base excerpts (serialized with their chunk ids
//! so the model can cite them).

use crate::schemas::SymptomInput;
use serde_json::json;
use triage_ai_retriever::RetrievedChunk;

/// System-level safety prompt injected into every model call.
pub const SAFETY_SYSTEM_PROMPT: &str = "\
You are a medical-symptom educational triage assistant. You are NOT a doctor, \
NOT a clinician, and you do NOT provide medical diagnoses or treatment plans.

ABSOLUTE RULES — NEVER VIOLATE:
1. Begin every response by acknowledging: \"This is informational only and is \
not medical advice. It is not a substitute for professional medical evaluation.\"
2. NEVER claim to diagnose. Use phrases like \"possible conditions that could \
explain these symptoms\" or \"heuristic likelihood estimates for educational \
triage only.\"
3. NEVER recommend prescription medication changes. You may suggest general \
self-care (hydration, rest) ONLY when low-risk, and always with caveats.
4. If ANY emergency red flag is present, you MUST instruct the user to seek \
immediate emergency care (call 911) BEFORE any differential discussion.
5. Percentages you assign are heuristic educational estimates, NOT clinical \
probabilities. They MUST sum to 100 across the top 5. State this clearly.
6. When uncertain, flatten the distribution and label confidence \"low\". \
When the knowledge base lacks coverage, say so explicitly.
7. Ground all reasoning in the retrieved knowledge-base chunks. Cite chunk IDs. \
Do NOT fabricate medical facts.
8. Ask clarifying questions when input is insufficient.
9. Do NOT request unnecessary personal data. Do NOT store user data.
10. Be calm, clear, non-alarmist, and non-judgmental.";

/// Differential prompt body. `{patient_input}` and `{kb_excerpts}` are
/// substituted by [`differential_prompt`].
const DIFFERENTIAL_PROMPT_TEMPLATE: &str = r#"Given the following patient-reported symptoms and context, plus the retrieved knowledge-base excerpts below, produce a differential triage assessment.

=== PATIENT INPUT ===
{patient_input}

=== RETRIEVED KNOWLEDGE BASE EXCERPTS ===
{kb_excerpts}

=== INSTRUCTIONS ===
Return a JSON object matching this schema EXACTLY (no extra keys):
{
  "emergency": {
    "is_emergency": <bool>,
    "reasons": [<string>, ...],
    "immediate_action": "<string>"
  },
  "differential": [
    {
      "condition": "<string>",
      "percent": <number 0-100>,
      "confidence": "low" | "medium" | "high",
      "supporting_features": ["<string>", ...],
      "missing_or_contradicting_features": ["<string>", ...],
      "rationale": "<string — cite KB chunk IDs>",
      "citations": ["<chunk_id>", ...]
    }
    // ... up to 5 entries, percentages summing to 100
  ],
  "most_important_questions": ["<string>", ...],  // 3-8 questions
  "next_steps": {
    "self_care": ["<string>", ...],
    "see_a_clinician_if": ["<string>", ...],
    "suggested_clinician_type": "<string>"
  },
  "disclaimer": "INFORMATIONAL ONLY — NOT MEDICAL ADVICE. This output is not a substitute for professional medical evaluation. Heuristic likelihood estimates are for educational triage only, not clinical probabilities. Always consult a qualified healthcare professional for diagnosis and treatment."
}

RULES:
- Percentages MUST sum to exactly 100 across the top 5 differential entries.
- If uncertainty is high, flatten the distribution (e.g., 25/20/20/18/17) and mark confidence "low" on all entries.
- If KB coverage is insufficient, include fewer conditions and note the gap.
- Justify each percentage by symptom-match strength, base-rate info from KB (if available), and exclusions/contradictions.
- Cite KB chunk IDs in "citations" and in "rationale".
- If emergency red flags were detected upstream, keep is_emergency=true and repeat the immediate_action. The differential is secondary.
- Ask 3-8 targeted clarifying questions in "most_important_questions".
- NEVER recommend prescription changes.
- Wrap the JSON object in <JSON>...</JSON> tags and a short plain-language recap in <SUMMARY>...</SUMMARY> tags. No markdown fences, no commentary outside the tags."#;

/// Builds the full differential prompt for one query.
pub fn differential_prompt(patient_input: &str, kb_excerpts: &str) -> String {
    DIFFERENTIAL_PROMPT_TEMPLATE
        .replace("{patient_input}", patient_input)
        .replace("{kb_excerpts}", kb_excerpts)
}

/// Renders the patient's input as labeled lines, omitting absent fields.
pub fn patient_block(input: &SymptomInput) -> String {
    let mut lines = vec![format!("My symptoms: {}", input.symptoms_text)];

    if let Some(age_range) = input.age_range {
        lines.push(format!("Age range: {}", age_range.as_str()));
    }
    if let Some(sex) = &input.sex_at_birth {
        lines.push(format!("Sex at birth: {sex}"));
    }
    if let Some(pregnant) = input.pregnancy_possible {
        lines.push(format!("Pregnancy possible: {pregnant}"));
    }
    if let Some(duration) = &input.duration {
        lines.push(format!("Duration: {duration}"));
    }
    if let Some(severity) = input.severity {
        lines.push(format!("Severity: {}", severity.as_str()));
    }
    if let Some(temperature) = input.temperature_f {
        lines.push(format!("Temperature (F): {temperature}"));
    }
    if let Some(heart_rate) = input.heart_rate_bpm {
        lines.push(format!("Heart rate (bpm): {heart_rate}"));
    }
    if let Some(conditions) = &input.existing_conditions {
        lines.push(format!("Existing conditions: {}", conditions.join(", ")));
    }
    if let Some(medications) = &input.current_medications {
        lines.push(format!("Current medications: {}", medications.join(", ")));
    }
    if let Some(allergies) = &input.allergies {
        lines.push(format!("Allergies: {}", allergies.join(", ")));
    }

    lines.join("\n")
}

/// Serializes retrieved chunks as citation-bearing evidence for the prompt.
pub fn format_kb_excerpts(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return "(no knowledge-base excerpts were retrieved for this query)".to_string();
    }
    let entries: Vec<serde_json::Value> = chunks
        .iter()
        .map(|chunk| {
            json!({
                "id": chunk.id,
                "title": chunk.title,
                "text": chunk.text,
                "score": (chunk.score as f64 * 10_000.0).round() / 10_000.0,
            })
        })
        .collect();
    serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{AgeRange, Severity};

    #[test]
    fn test_patient_block_includes_only_present_fields() {
        let mut input = SymptomInput::from_text("fever and cough");
        input.age_range = Some(AgeRange::OlderAdult);
        input.severity = Some(Severity::Moderate);
        input.allergies = Some(vec!["penicillin".to_string(), "peanuts".to_string()]);

        let block = patient_block(&input);
        assert!(block.starts_with("My symptoms: fever and cough"));
        assert!(block.contains("Age range: older_adult"));
        assert!(block.contains("Severity: moderate"));
        assert!(block.contains("Allergies: penicillin, peanuts"));
        assert!(!block.contains("Duration:"));
        assert!(!block.contains("Heart rate"));
    }

    #[test]
    fn test_differential_prompt_substitutes_both_sections() {
        let prompt = differential_prompt("My symptoms: headache", "[{\"id\": \"kb_1\"}]");
        assert!(prompt.contains("=== PATIENT INPUT ===\nMy symptoms: headache"));
        assert!(prompt.contains("[{\"id\": \"kb_1\"}]"));
        assert!(!prompt.contains("{patient_input}"));
        assert!(!prompt.contains("{kb_excerpts}"));
        // The literal schema braces survive substitution.
        assert!(prompt.contains("\"is_emergency\": <bool>"));
    }

    #[test]
    fn test_kb_excerpts_carry_ids_and_rounded_scores() {
        let chunks = vec![RetrievedChunk {
            id: "flu_ab12cd34ef".to_string(),
            title: "Flu".to_string(),
            text: "Fever, cough, fatigue.".to_string(),
            score: 0.123456,
        }];
        let rendered = format_kb_excerpts(&chunks);
        assert!(rendered.contains("flu_ab12cd34ef"));
        assert!(rendered.contains("0.1235"));

        assert!(format_kb_excerpts(&[]).contains("no knowledge-base excerpts"));
    }
}
