use clap::Args;
use sagaflow_operations::config::SagaflowConfig;
use sagaflow_operations::trigger::Trigger;
use sagaflow_saga::{StateStore, StoreError};
use serde_json::{Map, Value};
use tracing::debug;

use super::{order_handler, state_store};
use crate::demo::SAGA_NAME;
use crate::error::{CliError, Result};
use crate::output::print_invocation;

#[derive(Args)]
pub(crate) struct ResumeArgs {
    /// Run id
    id: String,

    /// JSON object whose fields are merged over the stored payload
    #[arg(long)]
    data: Option<String>,
}

pub(crate) fn run(args: ResumeArgs, config: &SagaflowConfig) -> Result<()> {
    let payload = match args.data.as_deref() {
        Some(data) => Some(merged_payload(config, &args.id, data)?),
        None => None,
    };

    let trigger = Trigger::resume(SAGA_NAME, args.id, payload);
    let invocation = order_handler(config)?.handle(trigger)?;
    print_invocation(&invocation);

    Ok(())
}

fn merged_payload(config: &SagaflowConfig, id: &str, data: &str) -> Result<Value> {
    let patch = match serde_json::from_str::<Value>(data).map_err(CliError::ResumeData)? {
        Value::Object(fields) => fields,
        other => return Err(CliError::ResumeDataShape(other.to_string())),
    };

    // An unknown id is reported by the resume itself.
    let mut fields = match state_store(config).get(SAGA_NAME, id) {
        Ok(record) => match record.payload() {
            Value::Object(fields) => fields.clone(),
            _ => Map::new(),
        },
        Err(StoreError::NotFound { .. }) => Map::new(),
        Err(e) => return Err(e.into()),
    };
    debug!(id, keys = patch.len(), "merging resume data over stored payload");
    fields.extend(patch);

    Ok(Value::Object(fields))
}
