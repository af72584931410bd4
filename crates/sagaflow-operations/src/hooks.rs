use sagaflow_saga::{ErrorHook, ErrorKind, State, StepError};
use tracing::{error, warn};

/// Logs every error the orchestrator reports.
///
/// Panics and failures from the orchestrator itself are logged at `error`,
/// business errors declared by handlers at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorHook;

impl<D> ErrorHook<D> for TracingErrorHook {
    fn on_error(&self, state: &State<D>, err: &StepError) {
        let step = state.current_step().map_or("", |step| step.name.as_str());
        let retried = state.current_step().map_or(0, |step| step.retried_count);
        let cause = err.cause.as_deref().unwrap_or("");
        if err.kind == ErrorKind::Business {
            warn!(
                saga = state.name(),
                id = state.id(),
                step,
                retried,
                compensating = state.is_compensating(),
                kind = %err.kind,
                cause,
                "{}",
                err.message
            );
        } else {
            error!(
                saga = state.name(),
                id = state.id(),
                step,
                retried,
                compensating = state.is_compensating(),
                kind = %err.kind,
                cause,
                "{}",
                err.message
            );
        }
    }
}
