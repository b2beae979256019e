//! Citeline CLI - run a cited-report pipeline from the command line.

use anyhow::Context;
use citeline_domain::traits::EventSink;
use citeline_domain::RunInputs;
use citeline_pipeline::{PipelineConfig, PipelineEngine, RunRegistry, RunStatus};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Generate a cited technical report for a topic.
#[derive(Parser, Debug)]
#[command(name = "citeline", version, about)]
struct Cli {
    /// Topic or full request to report on
    prompt: String,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the composed report here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Use live providers instead of the deterministic mock set
    #[arg(long)]
    live: bool,

    /// Print the full final state as JSON instead of the report
    #[arg(long)]
    json: bool,
}

/// Forwards pipeline events into the tracing log.
struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, stage: &str, message: &str, payload: Option<serde_json::Value>) {
        match payload {
            Some(payload) if message != "generation delta" => {
                info!(stage, %payload, "{}", message);
            }
            _ => info!(stage, "{}", message),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    if cli.live {
        config.mock_mode = false;
    }

    let collaborators = if config.mock_mode {
        citeline_pipeline::Collaborators::mock()
    } else {
        citeline_pipeline::Collaborators::live(&config)
    }
    .with_events(Arc::new(LogSink));
    let engine = PipelineEngine::new(config, collaborators);

    let registry = RunRegistry::new();
    let run_id = registry.create(cli.prompt.clone());
    info!(%run_id, "run started");

    let result = engine.run(RunInputs::from_prompt(cli.prompt)).await;
    registry
        .finish(run_id, result.clone())
        .context("recording run result")?;

    let rendered = if cli.json {
        serde_json::to_string_pretty(&result).context("serializing final state")?
    } else {
        render_report(&result)
    };
    match &cli.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{}", rendered),
    }

    match result.status {
        RunStatus::Failed => anyhow::bail!("run failed: {}", result.errors.join("; ")),
        status => {
            info!(?status, iterations = result.iterations_used, "run finished");
            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(PipelineConfig::from_env()),
    }
}

fn render_report(result: &citeline_pipeline::FinalState) -> String {
    let mut report = String::from("# Pipeline Output\n\n");
    if let Some(composed) = &result.composed_text {
        report.push_str(composed);
        report.push_str("\n\n");
    }
    if !result.warnings.is_empty() {
        report.push_str("## Warnings\n");
        for warning in &result.warnings {
            report.push_str(&format!("- {}\n", warning));
        }
        report.push('\n');
    }
    if !result.errors.is_empty() {
        report.push_str("## Issues\n");
        for error in &result.errors {
            report.push_str(&format!("- {}\n", error));
        }
    }
    report
}
