use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::step::Status;

/// Boxed error accepted from user callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of an error recorded on a step or a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorKind {
    /// The callback returned without declaring an outcome.
    NoActionDeclared,
    /// A transition named a step the definitions do not contain.
    TargetStepNotFound,
    /// A persisted step name is not registered any more.
    StepNotFound,
    /// No run exists for the requested id.
    NotFound,
    /// The callback panicked.
    Panic,
    /// An error declared by the callback itself.
    Business,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoActionDeclared => "no action declared",
            Self::TargetStepNotFound => "target step not found",
            Self::StepNotFound => "step not found",
            Self::NotFound => "not found",
            Self::Panic => "panic",
            Self::Business => "business error",
        };
        f.write_str(name)
    }
}

/// Serializable error record kept on steps and on the run itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct StepError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl StepError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Captures a user-declared error verbatim, keeping its first source as the cause.
    #[must_use]
    pub fn business(error: impl Into<BoxError>) -> Self {
        let error = error.into();
        Self {
            kind: ErrorKind::Business,
            message: error.to_string(),
            cause: error.source().map(ToString::to_string),
        }
    }

    pub(crate) fn no_action_declared(step: &str) -> Self {
        Self::new(
            ErrorKind::NoActionDeclared,
            format!("step '{step}' returned without declaring an outcome"),
        )
    }

    pub(crate) fn target_step_not_found(target: &str) -> Self {
        Self::new(
            ErrorKind::TargetStepNotFound,
            format!("step '{target}' is not defined"),
        )
    }

    pub(crate) fn panic(step: &str, payload: String) -> Self {
        Self::new(ErrorKind::Panic, format!("step '{step}' panicked")).with_cause(payload)
    }

    pub(crate) fn callback_panic(callback: &str, payload: String) -> Self {
        Self::new(ErrorKind::Panic, format!("{callback} callback panicked")).with_cause(payload)
    }
}

/// Errors from persisting or loading run state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("no state stored for saga '{saga}' with id '{id}'")]
    NotFound { saga: String, id: String },

    #[error("state store lock poisoned")]
    Poisoned,

    #[error("state store backend failure")]
    Backend(#[source] BoxError),
}

/// Errors raised while building [`StateDefinitions`](crate::StateDefinitions).
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum DefinitionError {
    #[error("saga name must not be empty")]
    EmptyName,

    #[error("saga '{0}' defines no steps")]
    NoSteps(String),

    #[error("saga '{0}' has no start callback")]
    MissingStart(String),

    #[error("step '{step}' is defined more than once in saga '{saga}'")]
    DuplicateStep { saga: String, step: String },

    #[error("step '{step}' has invalid backoff rate {rate}")]
    InvalidBackoff { step: String, rate: f64 },
}

/// Infrastructure errors from starting or resuming a run.
///
/// Business failures are not errors: a run that ends `FAILED` or
/// `COMPENSATED` is returned as an ordinary [`State`](crate::State).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SagaError {
    #[error("start callback of saga '{saga}' rejected the trigger event")]
    Start {
        saga: String,
        #[source]
        source: BoxError,
    },

    #[error("saga '{saga}' has no run with id '{id}'")]
    NotFound { saga: String, id: String },

    #[error("saga '{saga}' already has a run with id '{id}'")]
    AlreadyExists { saga: String, id: String },

    #[error("step '{step}' of saga '{saga}' is not registered")]
    StepNotFound { saga: String, step: String },

    #[error("run '{id}' belongs to saga '{found}', not '{expected}'")]
    SagaMismatch {
        id: String,
        expected: String,
        found: String,
    },

    #[error("run '{id}' of saga '{saga}' already finished with status {status}")]
    AlreadyFinished {
        saga: String,
        id: String,
        status: Status,
    },

    #[error("saga '{0}' has no state store configured")]
    PersistenceDisabled(String),

    #[error("failed to persist run '{id}'")]
    Persist {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to load run '{id}'")]
    Load {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to encode payload of run '{id}'")]
    EncodePayload {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode payload of run '{id}'")]
    DecodePayload {
        id: String,
        #[source]
        source: BoxError,
    },
}
