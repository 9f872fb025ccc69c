use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use triage_ai_agent::{
    AgeRange, AgentConfig, GeminiClient, Severity, SymptomInput, TriageAgent,
};
use triage_ai_embed::BackendChoice;
use triage_ai_retriever::{KbRetriever, RetrieverConfig};

/// Educational medical-symptom triage agent backed by a local knowledge base.
///
/// Informational only; NOT medical advice.
#[derive(Parser, Debug)]
#[command(name = "triage-ai-agent", version, about, long_about = None)]
struct Args {
    /// Symptom description (free text); prompted interactively when omitted
    symptoms: Option<String>,

    #[arg(long, value_enum)]
    age_range: Option<AgeRange>,

    /// Sex at birth (male / female / intersex)
    #[arg(long = "sex")]
    sex_at_birth: Option<String>,

    #[arg(long = "pregnant")]
    pregnancy_possible: bool,

    /// e.g. "3 days", "2 hours", "1 week"
    #[arg(long)]
    duration: Option<String>,

    #[arg(long, value_enum)]
    severity: Option<Severity>,

    /// Temperature in Fahrenheit
    #[arg(long = "temp")]
    temperature_f: Option<f64>,

    /// Heart rate in beats per minute
    #[arg(long = "hr")]
    heart_rate_bpm: Option<u32>,

    #[arg(long = "conditions", num_args = 0..)]
    existing_conditions: Vec<String>,

    #[arg(long = "medications", num_args = 0..)]
    current_medications: Vec<String>,

    #[arg(long, num_args = 0..)]
    allergies: Vec<String>,

    /// Output JSON only
    #[arg(long)]
    json_only: bool,

    /// Knowledge-base directory (overrides MEDICAL_KB_DIR)
    #[arg(long)]
    kb_dir: Option<PathBuf>,

    /// Number of KB chunks to retrieve (overrides RAG_TOP_K)
    #[arg(long)]
    top_k: Option<usize>,

    /// Force the TF-IDF fallback backend (skip the dense model)
    #[arg(long)]
    tfidf: bool,
}

fn read_symptoms_interactively() -> Result<String> {
    println!("Enter your symptoms (free text). Press Enter twice to submit.");
    let stdin = std::io::stdin();
    let mut lines = Vec::new();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read from stdin")?;
        if line.is_empty() {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join(" "))
}

fn symptom_input(args: &Args, symptoms: String) -> SymptomInput {
    SymptomInput {
        symptoms_text: symptoms,
        age_range: args.age_range,
        sex_at_birth: args.sex_at_birth.clone(),
        pregnancy_possible: args.pregnancy_possible.then_some(true),
        duration: args.duration.clone(),
        severity: args.severity,
        temperature_f: args.temperature_f,
        heart_rate_bpm: args.heart_rate_bpm,
        existing_conditions: (!args.existing_conditions.is_empty())
            .then(|| args.existing_conditions.clone()),
        current_medications: (!args.current_medications.is_empty())
            .then(|| args.current_medications.clone()),
        allergies: (!args.allergies.is_empty()).then(|| args.allergies.clone()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut config = AgentConfig::from_env();
    if let Some(kb_dir) = &args.kb_dir {
        config = config.with_kb_dir(kb_dir);
    }
    if let Some(top_k) = args.top_k {
        config = config.with_top_k(top_k);
    }
    let api_key = config
        .api_key
        .clone()
        .context("GEMINI_API_KEY is not set")?;

    let symptoms = match &args.symptoms {
        Some(symptoms) => symptoms.clone(),
        None => read_symptoms_interactively()?,
    };
    let input = symptom_input(&args, symptoms);

    let mut retriever_config = RetrieverConfig::new(config.kb_dir.clone());
    if args.tfidf {
        retriever_config = retriever_config.with_backend(BackendChoice::TfIdf);
    }
    let retriever = KbRetriever::build(retriever_config).await?;
    let model = GeminiClient::new(api_key, config.model_id.clone());
    let agent = TriageAgent::new(retriever, Box::new(model), config.top_k);

    let report = agent.run(&input).await?;

    match report.structured {
        Some(structured) if args.json_only => {
            println!("{}", serde_json::to_string_pretty(&structured)?);
        }
        Some(structured) => {
            let rule = "=".repeat(60);
            println!("\n{rule}");
            println!("  STRUCTURED OUTPUT (JSON)");
            println!("{rule}");
            println!("{}", serde_json::to_string_pretty(&structured)?);
            println!("\n{rule}");
            println!("  HUMAN-READABLE SUMMARY");
            println!("{rule}");
            println!("{}", structured.to_human_readable());
        }
        None => {
            println!("\n[Agent could not produce structured output. Raw summary below.]\n");
            println!("{}", report.summary);
        }
    }

    Ok(())
}
