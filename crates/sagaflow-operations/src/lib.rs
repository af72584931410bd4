//! Collaborators around the saga engine: inbound trigger parsing, invocation
//! handling with fail-fast reporting, persistence providers and configuration.

pub mod config;
mod error;
pub mod handler;
pub mod hooks;
pub mod providers;
pub mod trigger;

pub use error::{ConfigError, OperationError, Result, TriggerError};
