// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized job table built from WAL replay

use chrono::{DateTime, Utc};
use rj_core::{Job, JobId, JobQuery};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single change to the job table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JobOperation {
    Insert { job: Job },
    /// Full row image after a compare-and-swap
    Update { job: Job },
    Remove { id: JobId },
}

/// Current jobs, keyed by id
#[derive(Debug, Default)]
pub struct MaterializedJobs {
    pub jobs: HashMap<JobId, Job>,
    next_seq: u64,
}

impl MaterializedJobs {
    /// Sequence number the next inserted job receives
    pub fn next_seq(&self) -> u64 {
        self.next_seq + 1
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// Apply an operation to update the state
    pub fn apply(&mut self, op: &JobOperation) {
        match op {
            JobOperation::Insert { job } | JobOperation::Update { job } => {
                self.next_seq = self.next_seq.max(job.created_seq);
                self.jobs.insert(job.id.clone(), job.clone());
            }
            JobOperation::Remove { id } => {
                self.jobs.remove(id);
            }
        }
    }

    /// Jobs eligible for acquisition, earliest due date first, then creation order
    pub fn acquirable(&self, now: DateTime<Utc>, limit: usize) -> Vec<Job> {
        let mut due: Vec<&Job> = self
            .jobs
            .values()
            .filter(|job| job.is_acquirable(now))
            .collect();
        due.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then(a.created_seq.cmp(&b.created_seq))
        });
        due.into_iter().take(limit).cloned().collect()
    }

    /// Jobs matching `query`, in creation order
    pub fn query(&self, query: &JobQuery) -> Vec<Job> {
        let mut matching: Vec<&Job> = self.jobs.values().filter(|job| query.matches(job)).collect();
        matching.sort_by_key(|job| job.created_seq);
        matching.into_iter().cloned().collect()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
