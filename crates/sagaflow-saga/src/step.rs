use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StepError;

/// Status of a single step record or of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Executing forward steps.
    #[default]
    Running,
    /// Unwinding through compensators.
    Compensating,
    /// Paused by a `stop`, waiting to be resumed.
    Suspended,
    Success,
    Failed,
    Compensated,
}

impl Status {
    /// Whether the run has reached an end state and may not be resumed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Compensated)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "RUNNING",
            Self::Compensating => "COMPENSATING",
            Self::Suspended => "SUSPENDED",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Compensated => "COMPENSATED",
        };
        f.write_str(name)
    }
}

/// Outcome declared by a callback, or the run-level action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// No outcome declared yet.
    #[default]
    Start,
    Next,
    End,
    Stop,
    Error,
    PartialError,
    Compensate,
    PartialCompensate,
    Fail,
    Back,
}

/// One recorded invocation of a step's forward or compensating handler.
///
/// Retries of the same handler update this record in place; every other
/// transition appends a new one, so compensating step `b` produces a second
/// record named `b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub status: Status,
    pub action: Action,
    pub retried_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_target: Option<String>,
    #[serde(default)]
    pub partial: bool,
    /// Bound to the compensator rather than the forward handler.
    #[serde(default)]
    pub compensating: bool,
}

impl Step {
    pub(crate) fn forward(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::Running,
            action: Action::Start,
            retried_count: 0,
            error: None,
            forward_target: None,
            partial: false,
            compensating: false,
        }
    }

    pub(crate) fn compensator(name: impl Into<String>) -> Self {
        Self {
            status: Status::Compensating,
            compensating: true,
            ..Self::forward(name)
        }
    }

    pub(crate) fn record(&mut self, status: Status, action: Action, error: Option<StepError>) {
        self.status = status;
        self.action = action;
        self.error = error;
    }
}
