//! Read-only access to extension preference stores.
//!
//! Stores belong to the extensions that write them. This crate only ever
//! takes snapshots, and every snapshot is an independent copy that callers are
//! free to trim or redact.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::error::PrefsError;

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn snapshot(&self) -> Result<Value, PrefsError>;
}

/// Preferences persisted by the extension as `<plugins dir>/<name>.json`.
pub struct JsonPreferenceStore {
    path: PathBuf,
}

impl JsonPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PreferenceStore for JsonPreferenceStore {
    async fn snapshot(&self) -> Result<Value, PrefsError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            // installed but never saved: same as an empty store
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no preference file at {:?}", self.path);
                return Ok(Value::Object(Map::new()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_str(&raw)?)
    }
}

/// A live, in-process store shared with the owning extension.
#[derive(Clone, Default)]
pub struct MemoryPreferenceStore {
    live: Arc<RwLock<Value>>,
}

impl MemoryPreferenceStore {
    pub fn new(initial: Value) -> Self {
        Self {
            live: Arc::new(RwLock::new(initial)),
        }
    }

    /// Handle for the owning extension to write through.
    pub fn live(&self) -> Arc<RwLock<Value>> {
        self.live.clone()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn snapshot(&self) -> Result<Value, PrefsError> {
        let guard = self.live.read().map_err(|_| PrefsError::LockPoisoned)?;
        Ok(guard.clone())
    }
}
