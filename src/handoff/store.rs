use crate::handoff::error::HandoffError;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// Identifier of one scheduled execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `scheduled__YYYY-MM-DD`, keyed by the day the run was triggered.
    pub fn scheduled(run_date: NaiveDate) -> Self {
        Self(format!("scheduled__{}", run_date.format("%Y-%m-%d")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key/value store scoped to a single run. One step publishes, the next one reads.
pub trait HandoffStore: Send + Sync {
    fn put(&self, run_id: &RunId, key: &str, value: Value) -> Result<(), HandoffError>;

    fn get(&self, run_id: &RunId, key: &str) -> Result<Option<Value>, HandoffError>;

    /// Drops every value published for `run_id`.
    fn discard(&self, run_id: &RunId) -> Result<(), HandoffError>;

    /// Serializes `value` to JSON and stores it.
    fn publish<T: Serialize>(&self, run_id: &RunId, key: &str, value: &T) -> Result<(), HandoffError>
    where
        Self: Sized,
    {
        let value = serde_json::to_value(value).map_err(|source| HandoffError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.put(run_id, key, value)
    }

    /// Reads and deserializes the value under `key`; a missing key is an error.
    fn retrieve<T: DeserializeOwned>(&self, run_id: &RunId, key: &str) -> Result<T, HandoffError>
    where
        Self: Sized,
    {
        let value = self.get(run_id, key)?.ok_or_else(|| HandoffError::Missing {
            run_id: run_id.to_string(),
            key: key.to_string(),
        })?;
        serde_json::from_value(value).map_err(|source| HandoffError::Decode {
            key: key.to_string(),
            source,
        })
    }
}

/// Process-local [`HandoffStore`].
#[derive(Debug, Default)]
pub struct InMemoryHandoff {
    entries: Mutex<HashMap<(RunId, String), Value>>,
}

impl InMemoryHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of values held across all runs.
    pub fn len(&self) -> Result<usize, HandoffError> {
        let entries = self.entries.lock().map_err(|_| HandoffError::Poisoned)?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, HandoffError> {
        Ok(self.len()? == 0)
    }
}

impl HandoffStore for InMemoryHandoff {
    fn put(&self, run_id: &RunId, key: &str, value: Value) -> Result<(), HandoffError> {
        let mut entries = self.entries.lock().map_err(|_| HandoffError::Poisoned)?;
        entries.insert((run_id.clone(), key.to_string()), value);
        Ok(())
    }

    fn get(&self, run_id: &RunId, key: &str) -> Result<Option<Value>, HandoffError> {
        let entries = self.entries.lock().map_err(|_| HandoffError::Poisoned)?;
        Ok(entries.get(&(run_id.clone(), key.to_string())).cloned())
    }

    fn discard(&self, run_id: &RunId) -> Result<(), HandoffError> {
        let mut entries = self.entries.lock().map_err(|_| HandoffError::Poisoned)?;
        entries.retain(|(id, _), _| id != run_id);
        Ok(())
    }
}
