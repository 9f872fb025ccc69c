//! Structured input/output types for the triage agent.
//!
//! Field and enum wire names match the JSON schema the model is instructed
//! to produce, so a model response deserializes directly into
//! [`TriageOutput`].

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Fixed disclaimer attached to every structured output.
pub const DISCLAIMER: &str = "INFORMATIONAL ONLY — NOT MEDICAL ADVICE. This output is not a \
substitute for professional medical evaluation. Heuristic likelihood estimates are for \
educational triage only, not clinical probabilities. Always consult a qualified healthcare \
professional for diagnosis and treatment.";

/// Maximum number of differential entries in a valid output.
pub const MAX_DIFFERENTIAL_ENTRIES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum AgeRange {
    Child,
    Teen,
    Adult,
    OlderAdult,
}

impl AgeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeRange::Child => "child",
            AgeRange::Teen => "teen",
            AgeRange::Adult => "adult",
            AgeRange::OlderAdult => "older_adult",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// User-provided symptom description plus optional structured fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymptomInput {
    /// Free-text description of symptoms.
    pub symptoms_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<AgeRange>,
    /// Optional: male / female / intersex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex_at_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pregnancy_possible: Option<bool>,
    /// e.g. "3 days", "2 hours", "1 week".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_f: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate_bpm: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_conditions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_medications: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<Vec<String>>,
}

impl SymptomInput {
    pub fn from_text(symptoms_text: impl Into<String>) -> Self {
        Self {
            symptoms_text: symptoms_text.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmergencyOutput {
    pub is_emergency: bool,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub immediate_action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferentialEntry {
    pub condition: String,
    /// Heuristic educational estimate in [0, 100], not a clinical probability.
    pub percent: f64,
    pub confidence: Confidence,
    pub supporting_features: Vec<String>,
    pub missing_or_contradicting_features: Vec<String>,
    pub rationale: String,
    /// KB chunk ids that ground this entry.
    #[serde(default)]
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NextSteps {
    #[serde(default)]
    pub self_care: Vec<String>,
    #[serde(default)]
    pub see_a_clinician_if: Vec<String>,
    #[serde(default)]
    pub suggested_clinician_type: String,
}

/// Top-level structured output returned by the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageOutput {
    pub emergency: EmergencyOutput,
    #[serde(default)]
    pub differential: Vec<DifferentialEntry>,
    #[serde(default)]
    pub most_important_questions: Vec<String>,
    #[serde(default)]
    pub next_steps: NextSteps,
    #[serde(default = "default_disclaimer")]
    pub disclaimer: String,
}

fn default_disclaimer() -> String {
    DISCLAIMER.to_string()
}

impl TriageOutput {
    /// Checks the structural constraints the schema promises downstream:
    /// at most five differential entries, each percent within [0, 100].
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.differential.len() <= MAX_DIFFERENTIAL_ENTRIES,
            "differential has {} entries, at most {} allowed",
            self.differential.len(),
            MAX_DIFFERENTIAL_ENTRIES
        );
        for entry in &self.differential {
            ensure!(
                (0.0..=100.0).contains(&entry.percent),
                "differential entry '{}' has percent {} outside [0, 100]",
                entry.condition,
                entry.percent
            );
        }
        Ok(())
    }

    /// Renders the structured output as a clear, calm, user-facing summary.
    pub fn to_human_readable(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        let rule = "=".repeat(60);

        if self.emergency.is_emergency {
            lines.push(rule.clone());
            lines.push("  *** URGENT — POSSIBLE EMERGENCY ***".to_string());
            lines.push(rule.clone());
            for reason in &self.emergency.reasons {
                lines.push(format!("  - {reason}"));
            }
            lines.push(format!("\n  >> {}", self.emergency.immediate_action));
            lines.push(rule.clone());
            lines.push(String::new());
        }

        if !self.differential.is_empty() {
            lines.push("--- Possible Conditions (heuristic estimates) ---".to_string());
            lines.push(
                "(These are educational estimates, NOT clinical probabilities.)\n".to_string(),
            );
            for (i, entry) in self.differential.iter().enumerate() {
                lines.push(format!(
                    "  {}. {}  —  ~{:.0}%  [confidence: {}]",
                    i + 1,
                    entry.condition,
                    entry.percent,
                    entry.confidence.as_str()
                ));
                lines.push(format!(
                    "     Supporting: {}",
                    entry.supporting_features.join(", ")
                ));
                if !entry.missing_or_contradicting_features.is_empty() {
                    lines.push(format!(
                        "     Missing/Contradicting: {}",
                        entry.missing_or_contradicting_features.join(", ")
                    ));
                }
                lines.push(format!("     Rationale: {}", entry.rationale));
                if !entry.citations.is_empty() {
                    lines.push(format!("     Sources: {}", entry.citations.join(", ")));
                }
                lines.push(String::new());
            }
        }

        if !self.most_important_questions.is_empty() {
            lines.push("--- Clarifying Questions ---".to_string());
            for question in &self.most_important_questions {
                lines.push(format!("  - {question}"));
            }
            lines.push(String::new());
        }

        let next = &self.next_steps;
        if !next.self_care.is_empty() || !next.see_a_clinician_if.is_empty() {
            lines.push("--- What To Do Next ---".to_string());
            if !next.self_care.is_empty() {
                lines.push("  Self-care (low-risk, general guidance):".to_string());
                for item in &next.self_care {
                    lines.push(format!("    - {item}"));
                }
            }
            if !next.see_a_clinician_if.is_empty() {
                lines.push("  See a clinician if:".to_string());
                for item in &next.see_a_clinician_if {
                    lines.push(format!("    - {item}"));
                }
            }
            if !next.suggested_clinician_type.is_empty() {
                lines.push(format!(
                    "  Suggested clinician type: {}",
                    next.suggested_clinician_type
                ));
            }
            lines.push(String::new());
        }

        lines.push(format!("[Disclaimer] {}", self.disclaimer));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_output() -> TriageOutput {
        TriageOutput {
            emergency: EmergencyOutput::default(),
            differential: vec![DifferentialEntry {
                condition: "Viral pharyngitis".to_string(),
                percent: 60.0,
                confidence: Confidence::Medium,
                supporting_features: vec!["sore throat".to_string()],
                missing_or_contradicting_features: vec![],
                rationale: "Consistent with KB chunk pharyngitis_ab12cd34ef.".to_string(),
                citations: vec!["pharyngitis_ab12cd34ef".to_string()],
            }],
            most_important_questions: vec!["How long has this lasted?".to_string()],
            next_steps: NextSteps::default(),
            disclaimer: DISCLAIMER.to_string(),
        }
    }

    #[test]
    fn test_enums_use_original_wire_names() {
        assert_eq!(
            serde_json::to_value(AgeRange::OlderAdult).unwrap(),
            json!("older_adult")
        );
        assert_eq!(serde_json::to_value(Severity::Mild).unwrap(), json!("mild"));
        assert_eq!(
            serde_json::to_value(Confidence::Low).unwrap(),
            json!("low")
        );
    }

    #[test]
    fn test_triage_output_round_trips_the_model_schema() {
        let raw = json!({
            "emergency": {
                "is_emergency": false,
                "reasons": [],
                "immediate_action": ""
            },
            "differential": [{
                "condition": "Common cold",
                "percent": 55.0,
                "confidence": "medium",
                "supporting_features": ["runny nose", "sneezing"],
                "missing_or_contradicting_features": ["no fever"],
                "rationale": "Matches cold_1a2b3c4d5e.",
                "citations": ["cold_1a2b3c4d5e"]
            }],
            "most_important_questions": ["Any fever?", "Any cough?", "How long?"],
            "next_steps": {
                "self_care": ["rest", "hydration"],
                "see_a_clinician_if": ["symptoms persist beyond 10 days"],
                "suggested_clinician_type": "primary care"
            },
            "disclaimer": DISCLAIMER
        });

        let output: TriageOutput = serde_json::from_value(raw.clone()).unwrap();
        assert!(output.validate().is_ok());
        assert_eq!(output.differential[0].percent, 55.0);
        assert_eq!(output.differential[0].confidence, Confidence::Medium);
        assert_eq!(serde_json::to_value(&output).unwrap(), raw);
    }

    #[test]
    fn test_missing_optional_sections_default() {
        let output: TriageOutput =
            serde_json::from_value(json!({ "emergency": { "is_emergency": false } })).unwrap();
        assert!(output.differential.is_empty());
        assert!(output.most_important_questions.is_empty());
        assert_eq!(output.disclaimer, DISCLAIMER);
    }

    #[test]
    fn test_validate_rejects_too_many_entries() {
        let mut output = sample_output();
        let entry = output.differential[0].clone();
        output.differential = vec![entry; 6];
        assert!(output.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_percent() {
        let mut output = sample_output();
        output.differential[0].percent = 150.0;
        assert!(output.validate().is_err());
        output.differential[0].percent = -1.0;
        assert!(output.validate().is_err());
    }

    #[test]
    fn test_human_readable_banner_only_on_emergency() {
        let calm = sample_output().to_human_readable();
        assert!(!calm.contains("URGENT"));
        assert!(calm.ends_with(&format!("[Disclaimer] {DISCLAIMER}")));

        let mut urgent = sample_output();
        urgent.emergency = EmergencyOutput {
            is_emergency: true,
            reasons: vec!["Chest pain may indicate a cardiac emergency.".to_string()],
            immediate_action: "Call 911 immediately.".to_string(),
        };
        let rendered = urgent.to_human_readable();
        assert!(rendered.contains("*** URGENT — POSSIBLE EMERGENCY ***"));
        assert!(rendered.contains(">> Call 911 immediately."));
    }
}
