use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::action::{CompensateAction, CompensateOutcome, StepAction, StepOutcome};
use crate::definition::{StateDefinition, StateDefinitions};
use crate::error::{SagaError, StepError, StoreError};
use crate::hook::{ErrorHook, notify};
use crate::panic::guard;
use crate::sleep::{Sleeper, ThreadSleeper};
use crate::state::State;
use crate::step::{Action, Status, Step};
use crate::store::StateStore;

/// Orchestrator for one saga type.
///
/// Runs are single-threaded: one call to [`start`](Self::start) or
/// [`resume`](Self::resume) owns its [`State`] until the run settles, either
/// in a terminal status or suspended. Many runs may execute concurrently on
/// the same `Saga`, sharing only the immutable definitions.
///
/// With a [`StateStore`] attached every settled run is saved and suspended
/// runs can be resumed by id. Without one, a suspended state is handed back
/// to the caller, who may continue it with [`resume_state`](Self::resume_state).
pub struct Saga<D> {
    definitions: Arc<StateDefinitions<D>>,
    store: Option<Arc<dyn StateStore>>,
    hooks: Vec<Arc<dyn ErrorHook<D>>>,
    sleeper: Arc<dyn Sleeper>,
}

impl<D> Saga<D>
where
    D: Clone + Serialize + 'static,
{
    #[must_use]
    pub fn new(definitions: Arc<StateDefinitions<D>>) -> Self {
        Self {
            definitions,
            store: None,
            hooks: Vec::new(),
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_hook(mut self, hook: impl ErrorHook<D> + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn definitions(&self) -> &StateDefinitions<D> {
        &self.definitions
    }

    /// Whether settled runs are written to a store.
    #[must_use]
    pub fn persists(&self) -> bool {
        self.store.is_some()
    }

    /// Starts a new run from a trigger event.
    ///
    /// # Errors
    ///
    /// Returns an error if the store already holds a run with this id, the
    /// start callback rejects the event or panics, or the settled run cannot
    /// be persisted. Business failures are reported through the
    /// returned state's status instead.
    pub fn start(
        &self,
        id: impl Into<String>,
        event: serde_json::Value,
    ) -> Result<State<D>, SagaError> {
        let id = id.into();
        let saga = self.definitions.name();
        self.ensure_new(&id)?;

        let start = guard(|| self.definitions.start(&event))
            .unwrap_or_else(|message| Err(StepError::callback_panic("start", message).into()))
            .map_err(|source| {
                error!(saga, id = %id, error = %source, "start callback rejected trigger event");
                SagaError::Start {
                    saga: saga.to_string(),
                    source,
                }
            })?;

        info!(saga, id = %id, first_step = %start.first_step, "starting saga");
        let mut state = State::new(id, saga, event, start.payload);
        state.push_step(Step::forward(start.first_step));
        state.cursor = 0;
        self.drive(state)
    }

    /// Resumes a persisted run at the step it stopped at.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::NotFound`] for an unknown id, and other variants
    /// when the store fails, the payload cannot be decoded, or the run cannot
    /// be resumed (see [`resume_state`](Self::resume_state)).
    pub fn resume(&self, id: &str) -> Result<State<D>, SagaError> {
        self.resume_with(id, None)
    }

    /// Resumes a persisted run, replacing its payload when one is given.
    ///
    /// # Errors
    ///
    /// See [`resume`](Self::resume).
    pub fn resume_with(
        &self,
        id: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<State<D>, SagaError> {
        let saga = self.definitions.name();
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| SagaError::PersistenceDisabled(saga.to_string()))?;

        let mut record = store.get(saga, id).map_err(|source| match source {
            StoreError::NotFound { saga, id } => SagaError::NotFound { saga, id },
            source => SagaError::Load {
                id: id.to_string(),
                source,
            },
        })?;
        if let Some(payload) = payload {
            record.payload = payload;
        }

        let state = record
            .map_payload(|payload| {
                guard(|| self.definitions.resume_data(payload)).unwrap_or_else(|message| {
                    Err(StepError::callback_panic("resume data", message).into())
                })
            })
            .map_err(|source| SagaError::DecodePayload {
                id: id.to_string(),
                source,
            })?;
        self.resume_state(state)
    }

    /// Re-enters the loop for an in-memory suspended state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state belongs to another saga, has already
    /// finished, or its current step is no longer registered.
    pub fn resume_state(&self, mut state: State<D>) -> Result<State<D>, SagaError> {
        let saga = self.definitions.name();
        if state.name != saga {
            return Err(SagaError::SagaMismatch {
                id: state.id,
                expected: saga.to_string(),
                found: state.name,
            });
        }
        if state.status.is_terminal() {
            return Err(SagaError::AlreadyFinished {
                saga: state.name,
                id: state.id,
                status: state.status,
            });
        }
        let Some(step) = state.current_step() else {
            return Err(SagaError::StepNotFound {
                saga: saga.to_string(),
                step: String::from("<none>"),
            });
        };
        if self.definitions.get(&step.name).is_none() {
            return Err(SagaError::StepNotFound {
                saga: saga.to_string(),
                step: step.name.clone(),
            });
        }

        state.status = if state.compensating {
            Status::Compensating
        } else {
            Status::Running
        };
        info!(
            saga,
            id = %state.id,
            cursor = state.cursor,
            compensating = state.compensating,
            "resuming saga"
        );
        self.drive(state)
    }

    /// Rejects an id the store already holds a run for.
    fn ensure_new(&self, id: &str) -> Result<(), SagaError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let saga = self.definitions.name();
        match store.get(saga, id) {
            Ok(_) => {
                warn!(saga, id, "refusing to overwrite an existing run");
                Err(SagaError::AlreadyExists {
                    saga: saga.to_string(),
                    id: id.to_string(),
                })
            }
            Err(StoreError::NotFound { .. }) => Ok(()),
            Err(source) => Err(SagaError::Load {
                id: id.to_string(),
                source,
            }),
        }
    }

    fn drive(&self, mut state: State<D>) -> Result<State<D>, SagaError> {
        while !state.is_settled() {
            if state.compensating {
                self.compensate_current(&mut state);
            } else {
                self.execute_current(&mut state);
            }
        }

        info!(
            saga = %state.name,
            id = %state.id,
            status = %state.status,
            steps = state.steps.len(),
            "saga run settled"
        );
        self.persist(&state)?;
        Ok(state)
    }

    fn persist(&self, state: &State<D>) -> Result<(), SagaError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let record = state.to_record().map_err(|source| SagaError::EncodePayload {
            id: state.id.clone(),
            source,
        })?;
        store.save(&record).map_err(|source| SagaError::Persist {
            id: state.id.clone(),
            source,
        })
    }

    fn execute_current(&self, state: &mut State<D>) {
        let Some((name, retry)) = state
            .current_step()
            .map(|step| (step.name.clone(), step.retried_count))
        else {
            self.fail(state, StepError::target_step_not_found("<none>"));
            return;
        };
        let Some(definition) = self.definitions.get(&name) else {
            self.fail(state, StepError::target_step_not_found(&name));
            return;
        };

        debug!(saga = %state.name, id = %state.id, step = %name, retry, "invoking step");
        let mut action = StepAction::new();
        let payload = state.payload.clone();
        let handler = definition.step_handler();
        let outcome = match guard(|| handler(payload, &mut action)) {
            Ok(()) => action
                .into_outcome()
                .unwrap_or_else(|| StepOutcome::Fail(StepError::no_action_declared(&name))),
            Err(message) => StepOutcome::Fail(StepError::panic(&name, message)),
        };

        match outcome {
            StepOutcome::Next { target, payload } => {
                if self.definitions.get(&target).is_none() {
                    self.fail(state, StepError::target_step_not_found(&target));
                    return;
                }
                state.record(Status::Success, Action::Next, None);
                if let Some(step) = state.current_step_mut() {
                    step.forward_target = Some(target.clone());
                }
                state.payload = payload;
                debug!(saga = %state.name, id = %state.id, from = %name, to = %target, "advancing");
                state.push_step(Step::forward(target));
                state.cursor += 1;
            }
            StepOutcome::End(payload) => {
                state.record(Status::Success, Action::End, None);
                state.payload = payload;
                state.finish(Status::Success, None);
            }
            StepOutcome::Stop(payload) => {
                state.record(Status::Suspended, Action::Stop, None);
                state.payload = payload;
                state.suspend();
                info!(saga = %state.name, id = %state.id, step = %name, "saga suspended");
            }
            StepOutcome::Error { error, partial } => {
                let action = if partial {
                    Action::PartialError
                } else {
                    Action::Error
                };
                self.record_error(state, action, &error, partial);
                if self.schedule_retry(state, definition) {
                    return;
                }

                let escalated = if partial {
                    Action::PartialCompensate
                } else {
                    Action::Compensate
                };
                warn!(
                    saga = %state.name,
                    id = %state.id,
                    step = %name,
                    retries = definition.max_retry(),
                    "retries exhausted, escalating to compensation"
                );
                if let Some(step) = state.current_step_mut() {
                    step.action = escalated;
                }
                state.action = escalated;
                state.error = Some(error.clone());
                self.begin_compensation(state, partial);
                notify(&self.hooks, state, &error);
            }
            StepOutcome::Compensate {
                error,
                payload,
                partial,
            } => {
                let action = if partial {
                    Action::PartialCompensate
                } else {
                    Action::Compensate
                };
                state.payload = payload;
                self.record_error(state, action, &error, partial);
                state.error = Some(error);
                self.begin_compensation(state, partial);
            }
            StepOutcome::Fail(error) => self.fail(state, error),
        }
    }

    fn compensate_current(&self, state: &mut State<D>) {
        let Some((name, retry)) = state
            .current_step()
            .map(|step| (step.name.clone(), step.retried_count))
        else {
            self.fail(state, StepError::target_step_not_found("<none>"));
            return;
        };
        let Some(definition) = self.definitions.get(&name) else {
            self.fail(state, StepError::target_step_not_found(&name));
            return;
        };

        debug!(saga = %state.name, id = %state.id, step = %name, retry, "invoking compensator");
        let mut action = CompensateAction::new();
        let payload = state.payload.clone();
        let handler = definition.compensate_handler();
        let outcome = match guard(|| handler(payload, &mut action)) {
            Ok(()) => action
                .into_outcome()
                .unwrap_or_else(|| CompensateOutcome::Fail(StepError::no_action_declared(&name))),
            Err(message) => CompensateOutcome::Fail(StepError::panic(&name, message)),
        };

        match outcome {
            CompensateOutcome::Back(payload) => {
                state.record(Status::Compensated, Action::Back, None);
                state.payload = payload;
                self.unwind(state, false);
            }
            CompensateOutcome::Stop(payload) => {
                state.record(Status::Suspended, Action::Stop, None);
                state.payload = payload;
                state.suspend();
                info!(saga = %state.name, id = %state.id, step = %name, "saga suspended during compensation");
            }
            CompensateOutcome::Error(error) => {
                self.record_error(state, Action::Error, &error, false);
                if self.schedule_retry(state, definition) {
                    return;
                }
                error!(
                    saga = %state.name,
                    id = %state.id,
                    step = %name,
                    "compensation retries exhausted"
                );
                state.record(Status::Failed, Action::Fail, Some(error.clone()));
                state.finish(Status::Failed, Some(error));
            }
            CompensateOutcome::Fail(error) => self.fail(state, error),
        }
    }

    /// Flips the run into compensation and unwinds the first position.
    fn begin_compensation(&self, state: &mut State<D>, partial: bool) {
        state.compensating = true;
        state.status = Status::Compensating;
        info!(
            saga = %state.name,
            id = %state.id,
            cursor = state.cursor,
            partial,
            "compensation started"
        );
        self.unwind(state, partial);
    }

    /// Moves the cursor back and binds the compensator found there.
    ///
    /// With `include_current` the cursor stays put, so the compensator of the
    /// step that failed runs as well.
    fn unwind(&self, state: &mut State<D>, include_current: bool) {
        if !include_current {
            state.cursor -= 1;
        }
        let target = usize::try_from(state.cursor)
            .ok()
            .and_then(|index| state.steps.get(index))
            .map(|step| step.name.clone());

        let Some(name) = target else {
            state.cursor = -1;
            info!(saga = %state.name, id = %state.id, "saga compensated");
            state.finish(Status::Compensated, None);
            return;
        };
        if self.definitions.get(&name).is_none() {
            self.fail(state, StepError::target_step_not_found(&name));
            return;
        }

        debug!(saga = %state.name, id = %state.id, step = %name, cursor = state.cursor, "unwinding");
        state.push_step(Step::compensator(name));
    }

    fn schedule_retry(&self, state: &mut State<D>, definition: &StateDefinition<D>) -> bool {
        let Some(step) = state.current_step_mut() else {
            return false;
        };
        if step.retried_count >= definition.max_retry() {
            return false;
        }
        step.retried_count += 1;
        let attempt = step.retried_count;
        let delay = definition.retry_delay(attempt);

        info!(
            saga = %state.name,
            id = %state.id,
            step = %definition.name(),
            attempt,
            ?delay,
            "retrying step"
        );
        self.sleeper.sleep(delay);
        true
    }

    fn record_error(&self, state: &mut State<D>, action: Action, error: &StepError, partial: bool) {
        state.record(Status::Failed, action, Some(error.clone()));
        if let Some(step) = state.current_step_mut() {
            step.partial = partial;
        }
        warn!(saga = %state.name, id = %state.id, %error, ?action, "step reported error");
        notify(&self.hooks, state, error);
    }

    fn fail(&self, state: &mut State<D>, error: StepError) {
        state.record(Status::Failed, Action::Fail, Some(error.clone()));
        error!(saga = %state.name, id = %state.id, %error, "saga failed");
        notify(&self.hooks, state, &error);
        state.finish(Status::Failed, Some(error));
    }
}
