use sagaflow_operations::config::SagaflowConfig;
use sagaflow_saga::{StateStore, StoreError};

use super::state_store;
use crate::demo::SAGA_NAME;
use crate::error::{CliError, Result};
use crate::output::print_state;

pub(crate) fn run(id: &str, config: &SagaflowConfig) -> Result<()> {
    let record = match state_store(config).get(SAGA_NAME, id) {
        Ok(record) => record,
        Err(StoreError::NotFound { .. }) => return Err(CliError::RunNotFound(id.to_string())),
        Err(e) => return Err(e.into()),
    };

    print_state(&record);

    Ok(())
}
