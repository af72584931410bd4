//! Saga orchestration engine.
//!
//! A saga drives a multi-step business transaction one step at a time. Every
//! step has a forward handler and a compensating handler; failures are retried
//! with a linear backoff and, once retries run out, previously completed steps
//! are compensated in reverse order. A run may suspend itself, be persisted
//! through a [`StateStore`], and later be resumed at the exact step it stopped
//! at, including in the middle of compensation.

mod action;
mod definition;
mod error;
mod hook;
mod panic;
mod saga;
mod sleep;
mod state;
mod step;
mod store;

pub use action::{CompensateAction, StepAction};
pub use definition::{
    CompensateHandler, ResumeDataHandler, Start, StartHandler, StateDefinition, StateDefinitions,
    StateDefinitionsBuilder, StepHandler, retry_delay,
};
pub use error::{BoxError, DefinitionError, ErrorKind, SagaError, StepError, StoreError};
pub use hook::ErrorHook;
pub use saga::Saga;
pub use sleep::{Sleeper, ThreadSleeper};
pub use state::{State, StateRecord};
pub use step::{Action, Status, Step};
pub use store::{MemoryStateStore, StateStore};
