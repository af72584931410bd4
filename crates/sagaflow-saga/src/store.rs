use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::state::StateRecord;

/// Persistence for suspended and finished runs.
///
/// Implementations must be strongly consistent per id: a `get` issued after a
/// `save` returns what was saved.
pub trait StateStore: Send + Sync {
    /// Stores the record, replacing any previous one with the same saga and id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save(&self, record: &StateRecord) -> Result<(), StoreError>;

    /// Loads the latest record for a run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no record exists, or another
    /// variant if the backend fails.
    fn get(&self, saga: &str, id: &str) -> Result<StateRecord, StoreError>;
}

/// Process-local store, for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: RwLock<HashMap<(String, String), StateRecord>>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().map_err(|_| StoreError::Poisoned)?.len())
    }

    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl StateStore for MemoryStateStore {
    fn save(&self, record: &StateRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.insert(
            (record.name().to_string(), record.id().to_string()),
            record.clone(),
        );
        Ok(())
    }

    fn get(&self, saga: &str, id: &str) -> Result<StateRecord, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        records
            .get(&(saga.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                saga: saga.to_string(),
                id: id.to_string(),
            })
    }
}
