use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "sagaflow.toml";
pub const DEFAULT_STORE_DIR: &str = ".sagaflow/states";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SagaConfig {
    fail_fast_on_error: Option<bool>,
}

impl SagaConfig {
    /// Overrides the definitions' own fail-fast flag when set.
    #[must_use]
    pub fn fail_fast_on_error(&self) -> Option<bool> {
        self.fail_fast_on_error
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: String::from(DEFAULT_LOG_FILTER),
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SagaflowConfig {
    store: StoreConfig,
    saga: SagaConfig,
    log: LogConfig,
}

impl SagaflowConfig {
    /// Loads configuration from `path`, falling back to defaults when the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file exists but cannot be read, or
    /// [`ConfigError::Parse`] if it is not valid configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    #[must_use]
    pub fn saga(&self) -> &SagaConfig {
        &self.saga
    }

    #[must_use]
    pub fn log(&self) -> &LogConfig {
        &self.log
    }
}
