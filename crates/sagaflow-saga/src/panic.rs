use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{BoxError, StepError};

/// Runs a user callback, turning a panic into its message.
pub(crate) fn guard<R>(callback: impl FnOnce() -> R) -> Result<R, String> {
    panic::catch_unwind(AssertUnwindSafe(callback)).map_err(|payload| panic_message(&*payload))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    if let Some(error) = payload.downcast_ref::<BoxError>() {
        return error.to_string();
    }
    if let Some(error) = payload.downcast_ref::<StepError>() {
        return error.to_string();
    }
    if let Some(error) = payload.downcast_ref::<std::io::Error>() {
        return error.to_string();
    }
    String::from("panic with a non-string payload")
}
