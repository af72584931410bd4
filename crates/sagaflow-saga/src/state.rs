use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StepError;
use crate::step::{Action, Status, Step};

/// Persisted form of a run: the payload kept as opaque JSON.
pub type StateRecord = State<serde_json::Value>;

/// Execution context of one saga run.
///
/// The step log is append-only. `cursor` points at the forward step being
/// executed, and while compensating at the forward step currently being
/// undone; it reaches `-1` once every step has been unwound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State<D> {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) status: Status,
    pub(crate) action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<StepError>,
    pub(crate) input: serde_json::Value,
    #[serde(rename = "current_payload")]
    pub(crate) payload: D,
    pub(crate) steps: Vec<Step>,
    pub(crate) cursor: i64,
    pub(crate) compensating: bool,
    pub(crate) start_time: DateTime<Utc>,
    pub(crate) last_time: DateTime<Utc>,
}

impl<D> State<D> {
    pub(crate) fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
        payload: D,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            status: Status::Running,
            action: Action::Start,
            error: None,
            input,
            payload,
            steps: Vec::new(),
            cursor: -1,
            compensating: false,
            start_time: now,
            last_time: now,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the saga type this run belongs to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    #[must_use]
    pub fn error(&self) -> Option<&StepError> {
        self.error.as_ref()
    }

    /// The trigger event that started the run.
    #[must_use]
    pub fn input(&self) -> &serde_json::Value {
        &self.input
    }

    #[must_use]
    pub fn payload(&self) -> &D {
        &self.payload
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn current_step(&self) -> Option<&Step> {
        self.steps.last()
    }

    #[must_use]
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    #[must_use]
    pub fn is_compensating(&self) -> bool {
        self.compensating
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    #[must_use]
    pub fn last_time(&self) -> DateTime<Utc> {
        self.last_time
    }

    /// Whether the orchestrator loop has nothing left to do for this invocation.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.status.is_terminal() || self.status == Status::Suspended
    }

    /// Converts the payload, keeping the rest of the run untouched.
    ///
    /// # Errors
    ///
    /// Returns whatever error the conversion produces.
    pub fn map_payload<T, E>(self, convert: impl FnOnce(D) -> Result<T, E>) -> Result<State<T>, E> {
        Ok(State {
            id: self.id,
            name: self.name,
            status: self.status,
            action: self.action,
            error: self.error,
            input: self.input,
            payload: convert(self.payload)?,
            steps: self.steps,
            cursor: self.cursor,
            compensating: self.compensating,
            start_time: self.start_time,
            last_time: self.last_time,
        })
    }

    /// One line per step record, for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for step in &self.steps {
            let marker = match step.status {
                Status::Success => "✓",
                Status::Failed => "✗",
                Status::Compensated => "↩",
                Status::Suspended => "⏸",
                Status::Running | Status::Compensating => "…",
            };
            let kind = if step.compensating { "undo " } else { "" };
            let mut line = format!("{marker} {kind}{}", step.name);
            if step.retried_count > 0 {
                line.push_str(&format!(" (retried {}x)", step.retried_count));
            }
            if let Some(error) = &step.error {
                line.push_str(&format!(": {error}"));
            }
            lines.push(line);
        }
        lines.join("\n")
    }

    pub(crate) fn touch(&mut self) {
        self.last_time = Utc::now();
    }

    pub(crate) fn push_step(&mut self, step: Step) {
        self.steps.push(step);
        self.touch();
    }

    pub(crate) fn current_step_mut(&mut self) -> Option<&mut Step> {
        self.steps.last_mut()
    }

    /// Records the outcome of the current step and mirrors its action on the run.
    pub(crate) fn record(&mut self, status: Status, action: Action, error: Option<StepError>) {
        if let Some(step) = self.steps.last_mut() {
            step.record(status, action, error);
        }
        self.action = action;
        self.touch();
    }

    pub(crate) fn finish(&mut self, status: Status, error: Option<StepError>) {
        self.status = status;
        self.action = Action::End;
        if error.is_some() {
            self.error = error;
        }
        self.touch();
    }

    pub(crate) fn suspend(&mut self) {
        self.status = Status::Suspended;
        self.action = Action::Stop;
        self.touch();
    }
}

impl<D: Serialize> State<D> {
    /// Snapshot suitable for a [`StateStore`](crate::StateStore).
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be represented as JSON.
    pub fn to_record(&self) -> Result<StateRecord, serde_json::Error> {
        let payload = serde_json::to_value(&self.payload)?;
        Ok(State {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status,
            action: self.action,
            error: self.error.clone(),
            input: self.input.clone(),
            payload,
            steps: self.steps.clone(),
            cursor: self.cursor,
            compensating: self.compensating,
            start_time: self.start_time,
            last_time: self.last_time,
        })
    }
}
