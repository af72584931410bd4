mod resume;
mod run;
mod show;

use std::sync::Arc;

use clap::Subcommand;
use sagaflow_operations::config::SagaflowConfig;
use sagaflow_operations::handler::SagaHandler;
use sagaflow_operations::hooks::TracingErrorHook;
use sagaflow_operations::providers::FileSystemStateStore;
use sagaflow_saga::Saga;

use crate::demo::{self, Order};
use crate::error::Result;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start a run of the order saga from a trigger event
    Run(run::RunArgs),
    /// Resume a suspended run
    Resume(resume::ResumeArgs),
    /// Show the stored state of a run
    Show {
        /// Run id
        id: String,
    },
}

impl Commands {
    pub(crate) fn execute(self, config: &SagaflowConfig) -> Result<()> {
        match self {
            Self::Run(args) => run::run(args, config),
            Self::Resume(args) => resume::run(args, config),
            Self::Show { id } => show::run(&id, config),
        }
    }
}

fn state_store(config: &SagaflowConfig) -> FileSystemStateStore {
    FileSystemStateStore::new(config.store().dir())
}

fn order_handler(config: &SagaflowConfig) -> Result<SagaHandler<Order>> {
    let saga = Saga::new(demo::definitions()?)
        .with_store(Arc::new(state_store(config)))
        .with_hook(TracingErrorHook);
    Ok(SagaHandler::new(saga).with_fail_fast(config.saga().fail_fast_on_error()))
}
