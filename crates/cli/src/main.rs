//! Binary entry point for the batch subtitle translator.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use sublate_core::config::{TranslateConfig, DEFAULT_BATCH_SIZE, DEFAULT_LANGUAGE, DEFAULT_MODEL};
use sublate_core::translate::{client::BatchClient, openai::OpenAiBackend, process_file};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Translate SRT subtitle files with a chat model.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Subtitle files to translate. Patterns are expanded by the shell.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Target language for the translation.
    #[arg(short, long, default_value = DEFAULT_LANGUAGE)]
    language: String,

    /// Number of subtitle lines per translation request.
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Chat model used for translation requests.
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Batches translated in parallel. 1 keeps the resumable sequential
    /// mode; higher values disable checkpointing.
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Log retry diagnostics.
    #[arg(short, long)]
    verbose: bool,
}

/// Route library logs through a fmt subscriber, raising our crates to trace
/// when verbose diagnostics are requested.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::default()
            .add_directive("sublate=trace".parse().unwrap())
            .add_directive("sublate_core=trace".parse().unwrap())
            .add_directive("info".parse().unwrap())
    } else {
        EnvFilter::default()
            .add_directive("sublate=info".parse().unwrap())
            .add_directive("sublate_core=info".parse().unwrap())
            .add_directive("warn".parse().unwrap())
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = TranslateConfig {
        target_language: cli.language,
        batch_size: cli.batch_size,
        model: cli.model,
        verbose: cli.verbose,
        workers: cli.workers,
        ..TranslateConfig::default()
    };
    let backend = OpenAiBackend::from_env(&config.model)?;
    let translator = BatchClient::new(backend);

    let mut failures = 0usize;
    for file in &cli.files {
        info!("{}", file.display());
        match process_file(file, &translator, &config).await {
            Ok(out) => info!("translated {} -> {}", file.display(), out.display()),
            Err(err) => {
                error!("failed to translate {}: {err:#}", file.display());
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} file(s) failed", cli.files.len());
    }
    Ok(())
}
