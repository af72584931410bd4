use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Args;
use sagaflow_operations::OperationError;
use sagaflow_operations::config::SagaflowConfig;
use sagaflow_operations::trigger::Trigger;

use super::order_handler;
use crate::error::{CliError, Result};
use crate::output::print_invocation;

#[derive(Args)]
pub(crate) struct RunArgs {
    /// File holding the trigger envelope (default: read stdin)
    #[arg(long)]
    event: Option<PathBuf>,

    /// Run id to use instead of a generated one
    #[arg(long)]
    id: Option<String>,
}

pub(crate) fn run(args: RunArgs, config: &SagaflowConfig) -> Result<()> {
    let text = read_event(args.event.as_deref())?;
    let mut trigger = Trigger::from_json(&text).map_err(OperationError::from)?;
    if let (Some(run_id), Trigger::NewRun { id, .. }) = (args.id, &mut trigger) {
        *id = Some(run_id);
    }

    let invocation = order_handler(config)?.handle(trigger)?;
    print_invocation(&invocation);

    Ok(())
}

fn read_event(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path).map_err(|source| CliError::ReadEvent {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(CliError::ReadStdin)?;
            Ok(text)
        }
    }
}
