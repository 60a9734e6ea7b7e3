//! thyroid-bench - Main Entry Point
//!
//! Prepares the shared artifacts, then tunes and compares the six classifier
//! families from the command line.

use clap::Parser;
use thyroid_bench::cli::{cmd_benchmark, cmd_prepare, cmd_report, cmd_tune, load_config, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thyroid_bench=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Prepare { data, target, out } => {
            cmd_prepare(&config, &data, target.as_deref(), &out)?;
        }
        Commands::Tune { artifacts, model, out, top } => {
            cmd_tune(&config, &artifacts, model, &out, top)?;
        }
        Commands::Benchmark { artifacts, out } => {
            cmd_benchmark(&config, &artifacts, &out)?;
        }
        Commands::Report { out } => {
            cmd_report(&out)?;
        }
    }

    Ok(())
}
