//! CLI entry point for mediafix.
//!
//! Usage:
//!   mediafix --package data/working --staging data/staging --done data/done
//!   mediafix --package data/working --staging data/staging --done data/done --dry-run

use clap::Parser;
use mediafix::{Reconciler, RepairConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "mediafix",
    about = "Repair dangling image relationships in an unpacked OOXML word-processing package"
)]
struct Cli {
    /// Root of the unpacked package (the directory containing word/)
    #[arg(long)]
    package: PathBuf,

    /// Directory of candidate replacement images
    #[arg(long)]
    staging: PathBuf,

    /// Directory receiving successfully imported candidates
    #[arg(long)]
    done: PathBuf,

    /// Relationship id marking "image awaiting repair"
    #[arg(long, default_value = mediafix::DEFAULT_PLACEHOLDER)]
    placeholder: String,

    /// Classify and report only; mutate nothing
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediafix=info".into()),
        )
        .init();

    let config = RepairConfig::new(&cli.package, &cli.staging, &cli.done)
        .with_placeholder(&cli.placeholder);
    let reconciler = Reconciler::new(config);

    let outcome = if cli.dry_run {
        reconciler.classify().map(|report| {
            report.log();
        })
    } else {
        reconciler.run().map(|summary| {
            info!(
                blips = summary.blips,
                graphics = summary.graphics,
                candidates = summary.candidates,
                skipped = summary.skipped,
                repairs = summary.repairs,
                "run complete"
            );
        })
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
