//! Job status lookup.
//!
//! Jobs are run by the host, not by this crate. The host records each job's
//! status mapping into a [`JobRegistry`] as the job progresses; this crate only
//! reads them back. A server started on its own begins with an empty registry,
//! so every id answers 404 until the host records something.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Host job tracker. Status mappings are opaque to this crate and are handed
/// back to clients unchanged.
pub trait JobTracker: Send + Sync {
    fn job_status(&self, job_id: i64) -> Option<Value>;
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<i64, Value>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, job_id: i64, status: Value) {
        match self.jobs.write() {
            Ok(mut jobs) => {
                jobs.insert(job_id, status);
            }
            Err(_) => tracing::error!("job registry lock poisoned, dropping status for job {}", job_id),
        }
    }

    pub fn forget(&self, job_id: i64) -> Option<Value> {
        self.jobs.write().ok()?.remove(&job_id)
    }
}

impl JobTracker for JobRegistry {
    fn job_status(&self, job_id: i64) -> Option<Value> {
        self.jobs.read().ok()?.get(&job_id).cloned()
    }
}
