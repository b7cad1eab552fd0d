//! LeadForge Batch Runner
//!
//! Enriches a local lead list without the gateway:
//! 1. Reads a CSV file (or uses the sample company)
//! 2. Runs the batch orchestrator against the configured oracle
//! 3. Writes the JSON download artifact
//!
//! Usage: `enrich-batch <file.csv|sample> [output.json]`

use anyhow::Context;
use leadforge_common::{
    config::AppConfig,
    fallback::FallbackGenerator,
    notify::TracingNotifier,
    oracle::create_oracle,
    orchestrator::BatchOrchestrator,
    presenter::{JsonFilePresenter, DOWNLOAD_FILE_NAME},
    quota::{create_session_provider, QuotaGuard},
    RunReport, VERSION,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Session user of local runs
const LOCAL_USER: &str = "local";

/// What to enrich
#[derive(Debug, PartialEq)]
enum Input {
    Sample,
    File(PathBuf),
}

#[derive(Debug, PartialEq)]
struct Args {
    input: Input,
    output: PathBuf,
}

impl Args {
    fn parse(args: &[String]) -> Option<Self> {
        let input = match args.first()?.as_str() {
            "sample" => Input::Sample,
            path => Input::File(PathBuf::from(path)),
        };
        let output = args
            .get(1)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DOWNLOAD_FILE_NAME));
        Some(Self { input, output })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level)),
        )
        .with_target(true)
        .init();

    info!("Starting LeadForge Batch Runner v{}", VERSION);

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let Some(args) = Args::parse(&argv) else {
        eprintln!("Usage: enrich-batch <file.csv|sample> [output.json]");
        std::process::exit(2);
    };

    // Initialize oracle
    let oracle = create_oracle(&config.oracle)?;
    info!(model = %oracle.model_name(), "Oracle initialized");

    // Initialize session store
    let sessions = create_session_provider(&config.quota).await?;
    let session = sessions.session(LOCAL_USER, false).await?;

    let notifier = Arc::new(TracingNotifier);
    let orchestrator = BatchOrchestrator::new(
        oracle,
        QuotaGuard::new(session, notifier.clone()),
        Arc::new(JsonFilePresenter::new(&args.output)),
        notifier,
        FallbackGenerator::new(config.fallback.clone()),
        config.batch.clone(),
    )
    .with_upload_limit(config.server.max_upload_bytes);

    let outcome = run(&orchestrator, &args.input).await;
    match outcome {
        Ok(report) => {
            info!(
                run_id = %report.run_id,
                records = report.results.len(),
                partial = report.partial_count(),
                output = %args.output.display(),
                "Batch complete"
            );
            println!(
                "Enriched {} companies ({} partial) -> {}",
                report.results.len(),
                report.partial_count(),
                args.output.display()
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Run aborted");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(orchestrator: &BatchOrchestrator, input: &Input) -> anyhow::Result<RunReport> {
    match input {
        Input::Sample => Ok(orchestrator.process_sample().await?),
        Input::File(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(orchestrator.process_upload(&file_name, &bytes).await?)
        }
    }
}
