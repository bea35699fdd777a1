#[cfg(test)]
use std::collections::HashMap;
use std::{fs, io::Write, path::PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::{error::AppError, models::trip::Record};

pub const DEFAULT_STORAGE_KEY: &str = "itinerary.v1";

/// Durable per-device string store.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError>;
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_structure(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.path_for(key);
        if !path.try_exists()? {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.ensure_structure()?;
        // Readers see either the old file or the new one, never a torn write.
        let mut staged = NamedTempFile::new_in(&self.root)?;
        staged.write_all(value.as_bytes())?;
        staged.as_file().sync_all()?;
        staged
            .persist(self.path_for(key))
            .map_err(|err| AppError::Io(err.error))?;
        Ok(())
    }
}

/// Volatile test double, optionally limited to `quota` bytes per value.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(quota),
        }
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        if let Some(quota) = self.quota {
            if value.len() > quota {
                return Err(AppError::Other(anyhow::anyhow!(
                    "storage quota exceeded: {} > {quota} bytes",
                    value.len()
                )));
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads and writes the whole trip list under one versioned key.
pub struct Persistence {
    store: Box<dyn KeyValueStore>,
    key: String,
}

impl Persistence {
    pub fn new(store: impl KeyValueStore + 'static, key: impl Into<String>) -> Self {
        Self {
            store: Box::new(store),
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Writes the full list. Failures are logged and swallowed; the caller's
    /// in-memory list stays authoritative for the session.
    pub fn save(&mut self, trips: &[Record]) -> bool {
        let outcome = serde_json::to_string(trips)
            .map_err(AppError::from)
            .and_then(|raw| self.store.set(&self.key, &raw));
        match outcome {
            Ok(()) => true,
            Err(err) => {
                warn!(key = %self.key, "could not persist itinerary: {err}");
                false
            }
        }
    }

    /// Loads the stored list, falling back to an empty one when the key is
    /// missing or the payload is unreadable.
    pub fn load(&self) -> Vec<Record> {
        match self.try_load() {
            Ok(Some(trips)) => trips,
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(key = %self.key, "ignoring stored itinerary: {err}");
                Vec::new()
            }
        }
    }

    /// `Ok(None)` when nothing is stored, `Err` when the payload is corrupt.
    /// Elements are adopted as stored, without per-element validation.
    pub fn try_load(&self) -> Result<Option<Vec<Record>>, AppError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        let items = match serde_json::from_str::<Value>(&raw)? {
            Value::Array(items) => items,
            other => {
                return Err(AppError::Other(anyhow::anyhow!(
                    "expected a list of trips, found {}",
                    kind_of(&other)
                )))
            }
        };
        let trips: Vec<Record> = items.into_iter().map(Record::from_value).collect();
        let raw_count = trips.iter().filter(|record| record.is_raw()).count();
        if raw_count > 0 {
            debug!(raw_count, "keeping unrecognised stored trips as-is");
        }
        Ok(Some(trips))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
