use std::sync::Arc;

use tracing::warn;

use crate::error::StepError;
use crate::panic::guard;
use crate::state::State;

/// Observer for errors recorded by the orchestrator.
///
/// Called once for every error a step declares (including synthesized
/// `NoActionDeclared`, `TargetStepNotFound` and `Panic` failures) and once
/// more when exhausted retries escalate into compensation. Hooks cannot
/// influence the run; a panicking hook is logged and ignored.
pub trait ErrorHook<D>: Send + Sync {
    fn on_error(&self, state: &State<D>, error: &StepError);
}

impl<D, F> ErrorHook<D> for F
where
    F: Fn(&State<D>, &StepError) + Send + Sync,
{
    fn on_error(&self, state: &State<D>, error: &StepError) {
        self(state, error);
    }
}

pub(crate) fn notify<D>(hooks: &[Arc<dyn ErrorHook<D>>], state: &State<D>, error: &StepError) {
    for hook in hooks {
        if let Err(message) = guard(|| hook.on_error(state, error)) {
            warn!(saga = %state.name(), id = %state.id(), %message, "error hook panicked");
        }
    }
}
