use clap::Parser;
use sra_dispatch::{
    catalog::MetadataTable,
    config::{dates::local_today, DispatchConfig},
    emitter::Sinks,
    pipeline::{self, RunOutcome},
};
use std::{path::PathBuf, process::ExitCode, time::Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sra-dispatch")]
#[command(version)]
#[command(about = "Balance archive accessions across compute nodes for batch download jobs")]
struct Args {
    /// Path to the YAML (or JSON) config file
    #[arg(default_value = "config/config.yaml")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let start = Instant::now();

    let config = match DispatchConfig::load(&args.config) {
        Ok(config) => config,
        Err(error) => {
            error!(path = ?args.config, "Failed to load config: {error}");

            return ExitCode::FAILURE;
        }
    };

    let query = MetadataTable::new(&config.files.sra_metadata_table);
    let mut sink = Sinks::load(&config);

    let code = match pipeline::run(&config, local_today(), &query, &mut sink) {
        Ok(RunOutcome::Balanced { directives }) => {
            info!(nodes = directives.len(), "Balanced dispatch ready for submission");

            ExitCode::SUCCESS
        }
        Ok(RunOutcome::SingleNode { list, accessions }) => {
            info!(
                list = ?list,
                accessions,
                "Not balanced, process the list locally"
            );

            ExitCode::from(2)
        }
        Err(error) => {
            error!("Dispatch failed: {error}");

            ExitCode::FAILURE
        }
    };

    info!("Total time of program: {:.2?}", start.elapsed());

    code
}
