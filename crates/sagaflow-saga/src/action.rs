use crate::error::{BoxError, StepError};

/// Outcome declared by a forward handler.
pub(crate) enum StepOutcome<D> {
    Next { target: String, payload: D },
    End(D),
    Stop(D),
    Error { error: StepError, partial: bool },
    Compensate {
        error: StepError,
        payload: D,
        partial: bool,
    },
    Fail(StepError),
}

/// Outcome declared by a compensating handler.
pub(crate) enum CompensateOutcome<D> {
    Back(D),
    Stop(D),
    Error(StepError),
    Fail(StepError),
}

/// Capability handed to a forward handler to declare what happened.
///
/// The orchestrator builds a fresh one for every invocation. Only the last
/// declaration counts; a handler that declares nothing fails the run with a
/// `NoActionDeclared` error.
pub struct StepAction<D> {
    outcome: Option<StepOutcome<D>>,
}

impl<D> StepAction<D> {
    pub(crate) fn new() -> Self {
        Self { outcome: None }
    }

    pub(crate) fn into_outcome(self) -> Option<StepOutcome<D>> {
        self.outcome
    }

    /// Succeed and continue with `target`.
    pub fn next(&mut self, target: impl Into<String>, payload: D) {
        self.outcome = Some(StepOutcome::Next {
            target: target.into(),
            payload,
        });
    }

    /// Succeed and finish the saga.
    pub fn end(&mut self, payload: D) {
        self.outcome = Some(StepOutcome::End(payload));
    }

    /// Pause the run. It is persisted and this step runs again on resume.
    pub fn stop(&mut self, payload: D) {
        self.outcome = Some(StepOutcome::Stop(payload));
    }

    /// Recoverable failure: retried, then compensated once retries run out.
    pub fn error(&mut self, error: impl Into<BoxError>) {
        self.outcome = Some(StepOutcome::Error {
            error: StepError::business(error),
            partial: false,
        });
    }

    /// Like [`error`](Self::error), but when retries run out this step's own
    /// compensator runs as well.
    pub fn partial_error(&mut self, error: impl Into<BoxError>) {
        self.outcome = Some(StepOutcome::Error {
            error: StepError::business(error),
            partial: true,
        });
    }

    /// Unrecoverable failure: skip retries and compensate previous steps.
    pub fn compensate(&mut self, error: impl Into<BoxError>, payload: D) {
        self.outcome = Some(StepOutcome::Compensate {
            error: StepError::business(error),
            payload,
            partial: false,
        });
    }

    /// Like [`compensate`](Self::compensate), including this step's own compensator.
    pub fn partial_compensate(&mut self, error: impl Into<BoxError>, payload: D) {
        self.outcome = Some(StepOutcome::Compensate {
            error: StepError::business(error),
            payload,
            partial: true,
        });
    }

    /// Terminal failure without compensation.
    pub fn fail(&mut self, error: impl Into<BoxError>) {
        self.outcome = Some(StepOutcome::Fail(StepError::business(error)));
    }
}

/// Capability handed to a compensating handler.
pub struct CompensateAction<D> {
    outcome: Option<CompensateOutcome<D>>,
}

impl<D> CompensateAction<D> {
    pub(crate) fn new() -> Self {
        Self { outcome: None }
    }

    pub(crate) fn into_outcome(self) -> Option<CompensateOutcome<D>> {
        self.outcome
    }

    /// The undo succeeded; keep unwinding.
    pub fn back(&mut self, payload: D) {
        self.outcome = Some(CompensateOutcome::Back(payload));
    }

    /// Pause the run in the middle of compensation.
    pub fn stop(&mut self, payload: D) {
        self.outcome = Some(CompensateOutcome::Stop(payload));
    }

    /// Recoverable failure; retried with the step's backoff, then fails the run.
    pub fn error(&mut self, error: impl Into<BoxError>) {
        self.outcome = Some(CompensateOutcome::Error(StepError::business(error)));
    }

    /// Terminal failure of the whole saga.
    pub fn fail(&mut self, error: impl Into<BoxError>) {
        self.outcome = Some(CompensateOutcome::Fail(StepError::business(error)));
    }
}
