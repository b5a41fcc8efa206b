// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared job table
//!
//! One mutex guards both the materialized rows and the log, so a write is
//! checked, logged, and applied as a single step. That mutex is the atomic
//! update primitive every compare-and-swap relies on.

use crate::state::{JobOperation, MaterializedJobs};
use crate::wal::{Wal, WalError};
use chrono::{DateTime, Utc};
use rj_core::{Job, JobId, JobQuery, JobStore, StoreError};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

struct Inner {
    state: MaterializedJobs,
    wal: Option<Wal>,
}

/// Job table with optimistic row versioning and optional WAL durability
pub struct JobTable {
    inner: Mutex<Inner>,
}

impl JobTable {
    /// A table that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: MaterializedJobs::default(),
                wal: None,
            }),
        }
    }

    /// Replay the WAL at `path` and keep appending to it
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let mut state = MaterializedJobs::default();
        for op in Wal::replay(path)? {
            state.apply(&op);
        }
        let wal = Wal::open(path)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                state,
                wal: Some(wal),
            }),
        })
    }

    /// Number of jobs currently stored
    pub fn len(&self) -> usize {
        self.lock().state.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for JobTable {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Inner {
    /// Log then apply; a failed append leaves the rows untouched
    fn commit(&mut self, op: JobOperation) -> Result<(), StoreError> {
        if let Some(wal) = self.wal.as_mut() {
            wal.append(&op)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        self.state.apply(&op);
        Ok(())
    }

    fn current(&self, id: &JobId, expected_version: u64) -> Result<&Job, StoreError> {
        let current = self
            .state
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if current.version != expected_version {
            return Err(StoreError::Conflict {
                job: id.clone(),
                expected: expected_version,
                actual: current.version,
            });
        }
        Ok(current)
    }
}

impl JobStore for JobTable {
    fn insert(&self, mut job: Job) -> Result<Job, StoreError> {
        let mut inner = self.lock();
        if inner.state.get(&job.id).is_some() {
            return Err(StoreError::Duplicate(job.id));
        }
        job.created_seq = inner.state.next_seq();
        job.version = 1;
        inner.commit(JobOperation::Insert { job: job.clone() })?;
        Ok(job)
    }

    fn get(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.lock().state.get(id).cloned())
    }

    fn acquirable(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Job>, StoreError> {
        Ok(self.lock().state.acquirable(now, limit))
    }

    fn compare_and_swap(&self, mut job: Job, expected_version: u64) -> Result<Job, StoreError> {
        let mut inner = self.lock();
        let current = inner.current(&job.id, expected_version)?;
        // Identity and creation order are fixed at insert
        job.created_seq = current.created_seq;
        job.created_at = current.created_at;
        job.owner = current.owner.clone();
        job.version = expected_version + 1;
        inner.commit(JobOperation::Update { job: job.clone() })?;
        Ok(job)
    }

    fn remove_if(&self, id: &JobId, expected_version: u64) -> Result<Job, StoreError> {
        let mut inner = self.lock();
        let removed = inner.current(id, expected_version)?.clone();
        inner.commit(JobOperation::Remove { id: id.clone() })?;
        Ok(removed)
    }

    fn remove(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        let mut inner = self.lock();
        let Some(removed) = inner.state.get(id).cloned() else {
            return Ok(None);
        };
        inner.commit(JobOperation::Remove { id: id.clone() })?;
        Ok(Some(removed))
    }

    fn query(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError> {
        Ok(self.lock().state.query(query))
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
