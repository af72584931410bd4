use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Operation(#[from] sagaflow_operations::OperationError),

    #[error("failed to load configuration")]
    Config(#[from] sagaflow_operations::ConfigError),

    #[error("invalid saga definitions")]
    Definition(#[from] sagaflow_saga::DefinitionError),

    #[error("failed to read stored state")]
    Store(#[from] sagaflow_saga::StoreError),

    #[error("failed to read trigger event from '{path}'")]
    ReadEvent {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read trigger event from stdin")]
    ReadStdin(#[source] std::io::Error),

    #[error("invalid JSON passed to --data")]
    ResumeData(#[source] serde_json::Error),

    #[error("--data must be a JSON object, got {0}")]
    ResumeDataShape(String),

    #[error("no run '{0}' found")]
    RunNotFound(String),
}

pub type Result<T> = std::result::Result<T, CliError>;
