use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::action::{CompensateAction, StepAction};
use crate::error::{BoxError, DefinitionError};

/// Forward handler of a step.
pub type StepHandler<D> = Arc<dyn Fn(D, &mut StepAction<D>) + Send + Sync>;

/// Compensating handler of a step.
pub type CompensateHandler<D> = Arc<dyn Fn(D, &mut CompensateAction<D>) + Send + Sync>;

/// Turns a trigger event into the first step and its payload.
pub type StartHandler<D> =
    Arc<dyn Fn(&serde_json::Value) -> Result<Start<D>, BoxError> + Send + Sync>;

/// Rebuilds the typed payload of a persisted run.
pub type ResumeDataHandler<D> =
    Arc<dyn Fn(serde_json::Value) -> Result<D, BoxError> + Send + Sync>;

/// Where a new run begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Start<D> {
    pub first_step: String,
    pub payload: D,
}

impl<D> Start<D> {
    #[must_use]
    pub fn new(first_step: impl Into<String>, payload: D) -> Self {
        Self {
            first_step: first_step.into(),
            payload,
        }
    }
}

/// Delay before the `attempt`-th retry (1-based) of a step.
///
/// The first retry waits `interval`; every later one waits
/// `interval * (attempt - 1) * backoff_rate`, saturating at [`Duration::MAX`].
#[must_use]
pub fn retry_delay(interval: Duration, backoff_rate: f64, attempt: u32) -> Duration {
    if attempt <= 1 {
        return interval;
    }
    let secs = interval.as_secs_f64() * f64::from(attempt - 1) * backoff_rate;
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// A named step: its handlers and retry policy.
pub struct StateDefinition<D> {
    name: String,
    step: StepHandler<D>,
    compensate: CompensateHandler<D>,
    max_retry: u32,
    interval: Duration,
    backoff_rate: f64,
}

impl<D: 'static> StateDefinition<D> {
    /// A step without retries whose compensator simply steps back.
    ///
    /// The default compensator suits read-only steps.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, step: F) -> Self
    where
        F: Fn(D, &mut StepAction<D>) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            step: Arc::new(step),
            compensate: Arc::new(|payload: D, action: &mut CompensateAction<D>| {
                action.back(payload);
            }),
            max_retry: 0,
            interval: Duration::ZERO,
            backoff_rate: 1.0,
        }
    }

    #[must_use]
    pub fn compensate_with<F>(mut self, compensate: F) -> Self
    where
        F: Fn(D, &mut CompensateAction<D>) + Send + Sync + 'static,
    {
        self.compensate = Arc::new(compensate);
        self
    }

    #[must_use]
    pub fn retry(mut self, max_retry: u32, interval: Duration, backoff_rate: f64) -> Self {
        self.max_retry = max_retry;
        self.interval = interval;
        self.backoff_rate = backoff_rate;
        self
    }
}

impl<D> StateDefinition<D> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn backoff_rate(&self) -> f64 {
        self.backoff_rate
    }

    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        retry_delay(self.interval, self.backoff_rate, attempt)
    }

    pub(crate) fn step_handler(&self) -> &StepHandler<D> {
        &self.step
    }

    pub(crate) fn compensate_handler(&self) -> &CompensateHandler<D> {
        &self.compensate
    }
}

/// Immutable registry describing one saga type.
///
/// Built once and shared (behind an `Arc`) by every run of that saga.
pub struct StateDefinitions<D> {
    name: String,
    trigger_event_type: String,
    definitions: IndexMap<String, StateDefinition<D>>,
    fail_fast_on_error: bool,
    start: StartHandler<D>,
    resume_data: ResumeDataHandler<D>,
}

impl<D> StateDefinitions<D> {
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        trigger_event_type: impl Into<String>,
    ) -> StateDefinitionsBuilder<D> {
        StateDefinitionsBuilder {
            name: name.into(),
            trigger_event_type: trigger_event_type.into(),
            definitions: Vec::new(),
            fail_fast_on_error: false,
            start: None,
            resume_data: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn trigger_event_type(&self) -> &str {
        &self.trigger_event_type
    }

    #[must_use]
    pub fn fail_fast_on_error(&self) -> bool {
        self.fail_fast_on_error
    }

    #[must_use]
    pub fn get(&self, step: &str) -> Option<&StateDefinition<D>> {
        self.definitions.get(step)
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &StateDefinition<D>> {
        self.definitions.values()
    }

    pub(crate) fn start(&self, event: &serde_json::Value) -> Result<Start<D>, BoxError> {
        (self.start)(event)
    }

    pub(crate) fn resume_data(&self, payload: serde_json::Value) -> Result<D, BoxError> {
        (self.resume_data)(payload)
    }
}

pub struct StateDefinitionsBuilder<D> {
    name: String,
    trigger_event_type: String,
    definitions: Vec<StateDefinition<D>>,
    fail_fast_on_error: bool,
    start: Option<StartHandler<D>>,
    resume_data: Option<ResumeDataHandler<D>>,
}

impl<D: 'static> StateDefinitionsBuilder<D> {
    #[must_use]
    pub fn start<F>(mut self, start: F) -> Self
    where
        F: Fn(&serde_json::Value) -> Result<Start<D>, BoxError> + Send + Sync + 'static,
    {
        self.start = Some(Arc::new(start));
        self
    }

    /// Overrides how a persisted payload is turned back into `D`.
    ///
    /// Defaults to `serde_json::from_value`.
    #[must_use]
    pub fn resume_data<F>(mut self, resume_data: F) -> Self
    where
        F: Fn(serde_json::Value) -> Result<D, BoxError> + Send + Sync + 'static,
    {
        self.resume_data = Some(Arc::new(resume_data));
        self
    }

    #[must_use]
    pub fn step(mut self, definition: StateDefinition<D>) -> Self {
        self.definitions.push(definition);
        self
    }

    #[must_use]
    pub fn fail_fast_on_error(mut self, fail_fast: bool) -> Self {
        self.fail_fast_on_error = fail_fast;
        self
    }

    /// Validates and freezes the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, no steps or start callback were
    /// given, a step name repeats, or a backoff rate is negative or not finite.
    pub fn build(self) -> Result<StateDefinitions<D>, DefinitionError>
    where
        D: DeserializeOwned + 'static,
    {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        if self.definitions.is_empty() {
            return Err(DefinitionError::NoSteps(self.name));
        }
        let Some(start) = self.start else {
            return Err(DefinitionError::MissingStart(self.name));
        };

        let mut definitions = IndexMap::with_capacity(self.definitions.len());
        for definition in self.definitions {
            if !definition.backoff_rate.is_finite() || definition.backoff_rate < 0.0 {
                return Err(DefinitionError::InvalidBackoff {
                    step: definition.name,
                    rate: definition.backoff_rate,
                });
            }
            if definitions.contains_key(&definition.name) {
                return Err(DefinitionError::DuplicateStep {
                    saga: self.name,
                    step: definition.name,
                });
            }
            definitions.insert(definition.name.clone(), definition);
        }

        let resume_data: ResumeDataHandler<D> = match self.resume_data {
            Some(resume_data) => resume_data,
            None => Arc::new(|payload: serde_json::Value| -> Result<D, BoxError> {
                serde_json::from_value(payload).map_err(Into::into)
            }),
        };

        Ok(StateDefinitions {
            name: self.name,
            trigger_event_type: self.trigger_event_type,
            definitions,
            fail_fast_on_error: self.fail_fast_on_error,
            start,
            resume_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance(payload: u32, action: &mut StepAction<u32>) {
        action.end(payload + 1);
    }

    fn builder() -> StateDefinitionsBuilder<u32> {
        StateDefinitions::builder("order", "OrderPlaced").start(|_| Ok(Start::new("reserve", 0)))
    }

    #[test]
    fn retry_delay_is_linear_in_the_attempt() {
        let interval = Duration::from_secs(10);

        let delays: Vec<_> = (1..=3).map(|n| retry_delay(interval, 2.0, n)).collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_secs(10),
                Duration::from_secs(20),
                Duration::from_secs(40)
            ]
        );
    }

    #[test]
    fn retry_delay_saturates_instead_of_overflowing() {
        let interval = Duration::from_secs(1);

        assert_eq!(retry_delay(interval, 1e20, 2), Duration::MAX);
        assert_eq!(retry_delay(Duration::MAX, 2.0, 3), Duration::MAX);
    }

    #[test]
    fn retry_delay_with_unit_backoff_grows_by_interval() {
        let interval = Duration::from_secs(3);

        assert_eq!(retry_delay(interval, 1.0, 2), Duration::from_secs(3));
        assert_eq!(retry_delay(interval, 1.0, 4), Duration::from_secs(9));
    }

    #[test]
    fn build_keeps_registration_order() -> anyhow::Result<()> {
        let definitions = builder()
            .step(StateDefinition::new("reserve", advance))
            .step(StateDefinition::new("charge", advance))
            .step(StateDefinition::new("ship", advance))
            .build()?;

        let names: Vec<_> = definitions.iter().map(StateDefinition::name).collect();

        assert_eq!(names, vec!["reserve", "charge", "ship"]);
        assert!(definitions.get("charge").is_some());
        assert!(definitions.get("refund").is_none());
        Ok(())
    }

    #[test]
    fn build_rejects_duplicate_step_names() {
        let result = builder()
            .step(StateDefinition::new("reserve", advance))
            .step(StateDefinition::new("reserve", advance))
            .build();

        assert!(matches!(
            result,
            Err(DefinitionError::DuplicateStep { ref step, .. }) if step == "reserve"
        ));
    }

    #[test]
    fn build_rejects_empty_registry() {
        let result = builder().build();

        assert!(matches!(result, Err(DefinitionError::NoSteps(_))));
    }

    #[test]
    fn build_requires_start_callback() {
        let result = StateDefinitions::<u32>::builder("order", "OrderPlaced")
            .step(StateDefinition::new("reserve", advance))
            .build();

        assert!(matches!(result, Err(DefinitionError::MissingStart(_))));
    }

    #[test]
    fn build_rejects_negative_backoff() {
        let result = builder()
            .step(StateDefinition::new("reserve", advance).retry(2, Duration::from_secs(1), -1.0))
            .build();

        assert!(matches!(result, Err(DefinitionError::InvalidBackoff { .. })));
    }

    #[test]
    fn default_resume_data_deserializes_json() -> anyhow::Result<()> {
        let definitions = builder()
            .step(StateDefinition::new("reserve", advance))
            .build()?;

        let payload = definitions
            .resume_data(serde_json::json!(41))
            .map_err(|e| anyhow::anyhow!(e))?;

        assert_eq!(payload, 41);
        Ok(())
    }
}
