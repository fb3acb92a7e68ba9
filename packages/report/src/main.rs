#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for the report pipeline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use matflow_report::run;

#[derive(Parser)]
#[command(name = "matflow_report", about = "Regional material-flow report generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute every indicator and write the report JSON
    Run {
        /// Path to the TOML run configuration
        config: PathBuf,

        /// Directory the report is written into
        #[arg(long, default_value = "out")]
        output_dir: PathBuf,
    },
    /// Validate a configuration and its input files without computing
    Check {
        /// Path to the TOML run configuration
        config: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, output_dir } => {
            let path = run::execute(&config, &output_dir)?;
            println!("{}", path.display());
        }
        Commands::Check { config } => {
            let loaded = run::check(&config)?;
            println!(
                "Configuration is valid; {} input files present",
                loaded.input_paths().len()
            );
        }
    }

    Ok(())
}
