//! Inbound messages that start or resume a run.
//!
//! Two JSON envelopes are accepted:
//!
//! ```json
//! {"type": "OrderPlaced", "id": "optional-run-id", "payload": {"order": 1}}
//! {"resume": {"saga": "order", "id": "run-id", "payload": {"approved": true}}}
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::error::TriggerError;

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// An event that starts a new run. Without an `id` one is generated.
    NewRun {
        event_type: String,
        id: Option<String>,
        payload: Value,
    },
    /// A request to continue a suspended run, optionally replacing its payload.
    Resume {
        saga: String,
        id: String,
        payload: Option<Value>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope {
    Resume {
        resume: ResumeEnvelope,
    },
    Event {
        #[serde(rename = "type")]
        event_type: String,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        payload: Value,
    },
}

#[derive(Deserialize)]
struct ResumeEnvelope {
    saga: String,
    id: String,
    #[serde(default)]
    payload: Option<Value>,
}

impl Trigger {
    #[must_use]
    pub fn new_run(event_type: impl Into<String>, payload: Value) -> Self {
        Self::NewRun {
            event_type: event_type.into(),
            id: None,
            payload,
        }
    }

    #[must_use]
    pub fn resume(saga: impl Into<String>, id: impl Into<String>, payload: Option<Value>) -> Self {
        Self::Resume {
            saga: saga.into(),
            id: id.into(),
            payload,
        }
    }

    /// # Errors
    ///
    /// Returns [`TriggerError::Parse`] if `text` matches neither envelope, or a
    /// validation error if a required name is empty.
    pub fn from_json(text: &str) -> Result<Self, TriggerError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// # Errors
    ///
    /// See [`from_json`](Self::from_json).
    pub fn from_value(value: Value) -> Result<Self, TriggerError> {
        match serde_json::from_value(value)? {
            Envelope::Event {
                event_type,
                id,
                payload,
            } => {
                if event_type.is_empty() {
                    return Err(TriggerError::EmptyEventType);
                }
                Ok(Self::NewRun {
                    event_type,
                    id,
                    payload,
                })
            }
            Envelope::Resume { resume } => {
                if resume.saga.is_empty() {
                    return Err(TriggerError::EmptyResumeField("saga"));
                }
                if resume.id.is_empty() {
                    return Err(TriggerError::EmptyResumeField("id"));
                }
                Ok(Self::Resume {
                    saga: resume.saga,
                    id: resume.id,
                    payload: resume.payload,
                })
            }
        }
    }
}
