//! Educational medical-symptom triage agent.
//!
//! Orchestrates the triage pipeline around the local knowledge-base
//! retriever:
//!
//! 1. rule-based red-flag screening ([`safety`]);
//! 2. top-k retrieval of supporting KB chunks (`triage-ai-retriever`);
//! 3. prompt assembly with the retrieved evidence ([`prompt`]);
//! 4. one LLM call through the [`llm::TriageModel`] seam;
//! 5. parsing and validation of the structured output ([`schemas`]).
//!
//! The rule-based red flags always outrank the model: if a red flag fires,
//! the emergency section of the final output is the rule-based one.
//!
//! This is an educational tool. Its output is informational only and is not
//! medical advice or a substitute for professional evaluation.

pub mod agent;
pub mod config;
pub mod llm;
pub mod prompt;
pub mod safety;
pub mod schemas;

pub use agent::{TriageAgent, TriageReport, parse_model_output};
pub use config::AgentConfig;
pub use llm::{GeminiClient, TriageModel};
pub use safety::check_red_flags;
pub use schemas::{
    AgeRange, Confidence, DifferentialEntry, EmergencyOutput, NextSteps, Severity, SymptomInput,
    TriageOutput,
};
