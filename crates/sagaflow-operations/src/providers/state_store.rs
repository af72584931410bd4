use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sagaflow_saga::{StateRecord, StateStore, StoreError};
use thiserror::Error;
use tracing::debug;

const RECORD_EXTENSION: &str = "json";

/// Failures of the file-backed store, surfaced through [`StoreError::Backend`].
#[derive(Debug, Error)]
pub enum StateFileError {
    #[error("'{0}' cannot be used as a file name")]
    InvalidName(String),

    #[error("failed to read state file '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write state file '{path}'")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse state file '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize state for '{path}'")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<StateFileError> for StoreError {
    fn from(err: StateFileError) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

/// Stores each run as `<root>/<saga>/<id>.json`.
///
/// Writes go to a sibling temp file that is renamed over the record, so a
/// reader never observes a half-written state.
#[derive(Debug, Clone)]
pub struct FileSystemStateStore {
    root: PathBuf,
}

impl FileSystemStateStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record for a run.
    ///
    /// # Errors
    ///
    /// Returns [`StateFileError::InvalidName`] if the saga name or id would
    /// escape the store directory.
    pub fn record_path(&self, saga: &str, id: &str) -> Result<PathBuf, StateFileError> {
        check_component(saga)?;
        check_component(id)?;
        Ok(self
            .root
            .join(saga)
            .join(format!("{id}.{RECORD_EXTENSION}")))
    }
}

impl StateStore for FileSystemStateStore {
    fn save(&self, record: &StateRecord) -> Result<(), StoreError> {
        let path = self.record_path(record.name(), record.id())?;
        save_json_file(&path, record)?;
        debug!(path = %path.display(), status = %record.status(), "saved saga state");
        Ok(())
    }

    fn get(&self, saga: &str, id: &str) -> Result<StateRecord, StoreError> {
        let path = self.record_path(saga, id)?;
        load_json_file(&path)?.ok_or_else(|| StoreError::NotFound {
            saga: saga.to_string(),
            id: id.to_string(),
        })
    }
}

fn check_component(name: &str) -> Result<(), StateFileError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StateFileError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn load_json_file(path: &Path) -> Result<Option<StateRecord>, StateFileError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StateFileError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let record = serde_json::from_str(&content).map_err(|source| StateFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(record))
}

fn save_json_file(path: &Path, record: &StateRecord) -> Result<(), StateFileError> {
    let write_err = |source| StateFileError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let content =
        serde_json::to_string_pretty(record).map_err(|source| StateFileError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;

    let temp = path.with_extension(format!("{RECORD_EXTENSION}.tmp"));
    fs::write(&temp, content).map_err(write_err)?;
    fs::rename(&temp, path).map_err(write_err)?;

    Ok(())
}
