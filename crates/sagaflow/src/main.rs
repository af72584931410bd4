mod commands;
mod demo;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sagaflow_operations::config::{DEFAULT_CONFIG_FILE, SagaflowConfig};
use tracing_subscriber::EnvFilter;

use crate::commands::Commands;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "sagaflow")]
#[command(about = "Run, resume and inspect saga orchestrations", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log filter, e.g. `debug` or `sagaflow_saga=trace` (overrides `RUST_LOG`)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match SagaflowConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            print_error(&CliError::from(e));
            return ExitCode::FAILURE;
        }
    };

    init_tracing(cli.log.as_deref(), &config);

    if let Err(e) = cli.command.execute(&config) {
        print_error(&e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn init_tracing(flag: Option<&str>, config: &SagaflowConfig) {
    let filter = match flag {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.log().filter())),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_error(error: &CliError) {
    eprintln!("error: {error}");

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("caused by: {cause}");
        source = std::error::Error::source(cause);
    }
}
