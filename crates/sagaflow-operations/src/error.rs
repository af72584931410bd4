use std::path::PathBuf;

use sagaflow_saga::{SagaError, Status, StepError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("failed to parse trigger message")]
    Parse(#[from] serde_json::Error),

    #[error("trigger message has an empty event type")]
    EmptyEventType,

    #[error("resume request has an empty {0}")]
    EmptyResumeField(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Saga(#[from] SagaError),

    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("saga '{saga}' is started by '{expected}' events, got '{found}'")]
    UnexpectedEvent {
        saga: String,
        expected: String,
        found: String,
    },

    #[error("trigger targets saga '{found}' but this handler runs '{expected}'")]
    UnknownSaga { expected: String, found: String },

    #[error("run '{id}' of saga '{saga}' ended {status}")]
    SagaFailed {
        saga: String,
        id: String,
        status: Status,
        #[source]
        source: StepError,
    },
}

pub type Result<T> = std::result::Result<T, OperationError>;
