use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use doc_router::build_router;
use doc_router::config::PipelineConfig;
use doc_router::pipeline::PipelineOutcome;

const USAGE: &str = "Usage: doc-router <path-to-file>\n  Supported formats: .eml, .json, .pdf";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the result document.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [path] = args.as_slice() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    let path = PathBuf::from(path);

    let outcome = match run(&path).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Startup failed: {e:#}");
            PipelineOutcome::error(format!("{e:#}"))
        }
    };

    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: failed to render result: {e}");
            return ExitCode::FAILURE;
        }
    }

    if outcome.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run(path: &std::path::Path) -> anyhow::Result<PipelineOutcome> {
    let config = PipelineConfig::from_env().context("Failed to load configuration")?;
    let router = build_router(&config)
        .await
        .context("Failed to initialize pipeline")?;

    eprintln!("📄 Doc Router v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Input: {}\n", path.display());

    Ok(router.classify_and_route(path).await)
}
