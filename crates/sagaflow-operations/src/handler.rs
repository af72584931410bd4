use sagaflow_saga::{ErrorKind, Saga, State, Status, StepError};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::Result;
use crate::error::OperationError;
use crate::trigger::Trigger;

/// How an invocation ended from the caller's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation<D> {
    /// The run reached `SUCCESS`.
    Completed(State<D>),
    /// The run stopped and waits for a resume.
    Suspended(State<D>),
    /// The run failed or was compensated, and fail-fast is off.
    Accepted(State<D>),
}

impl<D> Invocation<D> {
    #[must_use]
    pub fn state(&self) -> &State<D> {
        match self {
            Self::Completed(state) | Self::Suspended(state) | Self::Accepted(state) => state,
        }
    }

    #[must_use]
    pub fn into_state(self) -> State<D> {
        match self {
            Self::Completed(state) | Self::Suspended(state) | Self::Accepted(state) => state,
        }
    }
}

/// Serverless-style entry point: one trigger in, one invocation result out.
pub struct SagaHandler<D> {
    saga: Saga<D>,
    fail_fast: bool,
}

impl<D> SagaHandler<D>
where
    D: Clone + Serialize + 'static,
{
    #[must_use]
    pub fn new(saga: Saga<D>) -> Self {
        let fail_fast = saga.definitions().fail_fast_on_error();
        Self { saga, fail_fast }
    }

    /// Replaces the definitions' fail-fast flag when `fail_fast` is set.
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: Option<bool>) -> Self {
        if let Some(fail_fast) = fail_fast {
            self.fail_fast = fail_fast;
        }
        self
    }

    #[must_use]
    pub fn saga(&self) -> &Saga<D> {
        &self.saga
    }

    #[must_use]
    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Starts or resumes a run and classifies how it ended.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::UnexpectedEvent`] or
    /// [`OperationError::UnknownSaga`] if the trigger is not meant for this
    /// saga, [`OperationError::Saga`] for orchestrator failures, and
    /// [`OperationError::SagaFailed`] when fail-fast is on and the run ended
    /// `FAILED` or `COMPENSATED`.
    pub fn handle(&self, trigger: Trigger) -> Result<Invocation<D>> {
        let definitions = self.saga.definitions();
        let state = match trigger {
            Trigger::NewRun {
                event_type,
                id,
                payload,
            } => {
                if event_type != definitions.trigger_event_type() {
                    return Err(OperationError::UnexpectedEvent {
                        saga: definitions.name().to_string(),
                        expected: definitions.trigger_event_type().to_string(),
                        found: event_type,
                    });
                }
                let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
                debug!(saga = definitions.name(), id = %id, "handling new run");
                self.saga.start(id, payload)?
            }
            Trigger::Resume { saga, id, payload } => {
                if saga != definitions.name() {
                    return Err(OperationError::UnknownSaga {
                        expected: definitions.name().to_string(),
                        found: saga,
                    });
                }
                debug!(saga = %saga, id = %id, "handling resume");
                self.saga.resume_with(&id, payload)?
            }
        };
        self.conclude(state)
    }

    fn conclude(&self, state: State<D>) -> Result<Invocation<D>> {
        match state.status() {
            Status::Success => Ok(Invocation::Completed(state)),
            Status::Suspended => Ok(Invocation::Suspended(state)),
            Status::Failed | Status::Compensated if self.fail_fast => {
                info!(
                    saga = state.name(),
                    id = state.id(),
                    status = %state.status(),
                    "reporting failed run to caller"
                );
                let source = state.error().cloned().unwrap_or_else(|| {
                    StepError::new(ErrorKind::Business, "run did not complete")
                });
                Err(OperationError::SagaFailed {
                    saga: state.name().to_string(),
                    id: state.id().to_string(),
                    status: state.status(),
                    source,
                })
            }
            Status::Failed | Status::Compensated | Status::Running | Status::Compensating => {
                Ok(Invocation::Accepted(state))
            }
        }
    }
}
