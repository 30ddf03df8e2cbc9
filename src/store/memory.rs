//! In-memory implementation of [`ResultStore`].
//!
//! Used by tests and local runs that should not touch a real table.

use std::sync::Arc;

use crate::utils::BoxFuture;

use super::{JobRecord, ResultStore};

/// Thread-safe in-memory result store keyed by job id.
#[derive(Clone)]
pub struct InMemoryResultStore {
    records: Arc<papaya::HashMap<String, JobRecord>>,
}

impl InMemoryResultStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            records: Arc::new(papaya::HashMap::new()),
        }
    }

    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.records.pin().get(job_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultStore for InMemoryResultStore {
    fn put<'a>(&'a self, record: &'a JobRecord) -> BoxFuture<'a, eyre::Result<()>> {
        Box::pin(async move {
            self.records
                .pin()
                .insert(record.job_id.clone(), record.clone());
            Ok(())
        })
    }
}
