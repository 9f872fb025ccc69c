//! Rule-based red-flag screening.
//!
//! A fixed table of regex rules scanned against the symptom text, plus two
//! vital-sign thresholds. These rules run before, and outrank, anything the
//! model says: a triggered flag forces the emergency section of the final
//! output.

use crate::schemas::{EmergencyOutput, SymptomInput};
use regex::Regex;
use std::sync::LazyLock;

const ER_ACTION: &str = "Call 911 or go to the nearest emergency department immediately.";

/// One red-flag rule: any pattern match triggers it.
pub struct RedFlag {
    pub name: &'static str,
    patterns: Vec<Regex>,
    pub reason: &'static str,
    pub action: &'static str,
}

impl RedFlag {
    fn new(
        name: &'static str,
        patterns: &[&str],
        reason: &'static str,
        action: &'static str,
    ) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("red-flag pattern is valid"))
            .collect();
        Self {
            name,
            patterns,
            reason,
            action,
        }
    }

    fn matches(&self, text: &str) -> bool {
        // One match per flag is enough.
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

pub static RED_FLAGS: LazyLock<Vec<RedFlag>> = LazyLock::new(|| {
    vec![
        RedFlag::new(
            "chest_pain",
            &[
                r"chest\s*(pain|pressure|tightness|heaviness|squeezing)",
                r"angina",
            ],
            "Chest pain or pressure may indicate a cardiac emergency.",
            ER_ACTION,
        ),
        RedFlag::new(
            "severe_breathing",
            &[
                r"(severe|extreme|can'?t)\s*(shortness\s*of\s*breath|breathe|breathing)",
                r"blue\s*(lips|face|fingertips|skin)",
                r"cyanosis",
            ],
            "Severe difficulty breathing or cyanosis requires urgent evaluation.",
            ER_ACTION,
        ),
        RedFlag::new(
            "stroke_signs",
            &[
                r"(one[- ]?sided?|unilateral)\s*(weakness|numbness|paralysis)",
                r"facial\s*droop",
                r"(trouble|difficulty|unable)\s*(speaking|speech|talking)",
                r"sudden\s*severe\s*headache",
                r"worst\s*headache\s*(of|in)\s*(my|their)?\s*life",
            ],
            "These symptoms may indicate a stroke (time-critical emergency).",
            "Call 911 immediately. Note the time symptoms started. Do NOT drive yourself.",
        ),
        RedFlag::new(
            "severe_abdominal",
            &[
                r"(severe|acute)\s*abdominal\s*pain.*(rigid|board[- ]?like|faint)",
                r"rigid\s*abdomen",
            ],
            "Severe abdominal pain with rigidity or fainting may indicate a surgical emergency.",
            ER_ACTION,
        ),
        RedFlag::new(
            "altered_mental_status",
            &[
                r"(confusion|disoriented|altered\s*mental)",
                r"seizure",
                r"neck\s*stiffness.*(fever|headache)",
                r"(fever|headache).*neck\s*stiffness",
            ],
            "Confusion, seizures, or neck stiffness with fever may indicate meningitis or another neurological emergency.",
            ER_ACTION,
        ),
        RedFlag::new(
            "uncontrolled_bleeding",
            &[
                r"(uncontrolled|won'?t\s*stop|profuse|massive)\s*bleeding",
                r"hemorrhag",
            ],
            "Uncontrolled bleeding requires immediate intervention.",
            "Apply direct pressure and call 911 immediately.",
        ),
        RedFlag::new(
            "suicidal_self_harm",
            &[
                r"suicid(al|e|ing)",
                r"(want|plan|going)\s*to\s*(kill|end|hurt)\s*(myself|themselves|my\s*life)",
                r"self[- ]?harm",
            ],
            "Expression of suicidal intent or self-harm.",
            "If you or someone you know is in immediate danger, call 911. National Suicide \
             Prevention Lifeline: 988 (call or text). Crisis Text Line: text HOME to 741741.",
        ),
        RedFlag::new(
            "anaphylaxis",
            &[
                r"(swelling|swell).*(face|throat|tongue|lips)",
                r"(throat|airway)\s*(closing|swelling|tight)",
                r"(severe|anaphyla)\s*allergic\s*reaction",
                r"anaphylaxis",
                r"wheezing.*(hives|rash|swelling)",
            ],
            "Signs of anaphylaxis (severe allergic reaction).",
            "Use epinephrine auto-injector (EpiPen) if available. Call 911 immediately.",
        ),
        RedFlag::new(
            "infant_emergency",
            &[
                r"(infant|newborn|baby).*(fever|not\s*feeding|lethargic|limp|blue)",
                r"(fever|temp).*(infant|newborn|baby)",
            ],
            "Infants with fever, poor feeding, or lethargy need urgent evaluation.",
            "Go to the nearest pediatric emergency department or call 911.",
        ),
    ]
});

/// Scans the symptom text and vitals for red-flag conditions.
pub fn check_red_flags(input: &SymptomInput) -> EmergencyOutput {
    let mut triggered: Vec<(String, String)> = Vec::new();

    for flag in RED_FLAGS.iter() {
        if flag.matches(&input.symptoms_text) {
            triggered.push((flag.reason.to_string(), flag.action.to_string()));
        }
    }

    if let Some(heart_rate) = input.heart_rate_bpm {
        if heart_rate > 150 || heart_rate < 40 {
            triggered.push((
                format!("Heart rate of {heart_rate} bpm is outside safe range."),
                ER_ACTION.to_string(),
            ));
        }
    }
    if let Some(temperature) = input.temperature_f {
        if temperature >= 104.0 {
            triggered.push((
                format!("Temperature of {temperature}°F is dangerously high."),
                ER_ACTION.to_string(),
            ));
        }
    }

    if triggered.is_empty() {
        return EmergencyOutput::default();
    }

    let reasons = dedup_in_order(triggered.iter().map(|(reason, _)| reason.clone()));
    let actions = dedup_in_order(triggered.iter().map(|(_, action)| action.clone()));
    EmergencyOutput {
        is_emergency: true,
        reasons,
        immediate_action: actions.join(" | "),
    }
}

fn dedup_in_order(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}
