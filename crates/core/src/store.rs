// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared job table contract
//!
//! Every write is a compare-and-swap on the row version. Two workers racing
//! for the same job both read version `n`; the first write bumps it to
//! `n + 1` and the second gets [`StoreError::Conflict`].

use crate::job::{Job, JobId, JobState};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from job table operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    Duplicate(JobId),
    #[error("job {job} changed concurrently (expected version {expected}, found {actual})")]
    Conflict {
        job: JobId,
        expected: u64,
        actual: u64,
    },
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Filter for reading jobs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQuery {
    pub process_instance_id: Option<String>,
    pub state: Option<JobState>,
    pub with_exception: bool,
    /// Compare states as seen at this instant, so a lapsed lease reads as pending
    pub as_of: Option<DateTime<Utc>>,
}

impl JobQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_instance(mut self, id: impl Into<String>) -> Self {
        self.process_instance_id = Some(id.into());
        self
    }

    pub fn in_state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_exception(mut self) -> Self {
        self.with_exception = true;
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.as_of = Some(now);
        self
    }

    pub fn matches(&self, job: &Job) -> bool {
        let state = match self.as_of {
            Some(now) => job.effective_state(now),
            None => job.state,
        };
        self.process_instance_id
            .as_deref()
            .map_or(true, |id| job.owner.process_instance_id == id)
            && self.state.map_or(true, |wanted| state == wanted)
            && (!self.with_exception || job.exception.is_some())
    }
}

/// Storage for jobs shared by all workers
pub trait JobStore: Send + Sync + 'static {
    /// Insert a new job, assigning its creation sequence and first version
    fn insert(&self, job: Job) -> Result<Job, StoreError>;

    fn get(&self, id: &JobId) -> Result<Option<Job>, StoreError>;

    /// Jobs eligible for acquisition at `now`, earliest due date first,
    /// then creation order
    fn acquirable(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Job>, StoreError>;

    /// Replace a job if its stored version still equals `expected_version`
    fn compare_and_swap(&self, job: Job, expected_version: u64) -> Result<Job, StoreError>;

    /// Delete a job if its stored version still equals `expected_version`
    fn remove_if(&self, id: &JobId, expected_version: u64) -> Result<Job, StoreError>;

    /// Delete a job unconditionally
    fn remove(&self, id: &JobId) -> Result<Option<Job>, StoreError>;

    /// Jobs matching `query`, in creation order
    fn query(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{BehaviorError, FailureCause};
    use crate::job::{JobOwner, WorkerId};
    use crate::policy::RetryPolicy;
    use std::time::Duration;

    fn job(pi: &str) -> Job {
        Job::new(
            JobId::new(format!("job-{}", pi)),
            JobOwner::new("process", pi, "task"),
            RetryPolicy::fixed(3),
            Utc::now(),
        )
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(JobQuery::new().matches(&job("pi-1")));
    }

    #[test]
    fn query_filters_by_process_instance() {
        let query = JobQuery::new().process_instance("pi-1");
        assert!(query.matches(&job("pi-1")));
        assert!(!query.matches(&job("pi-2")));
    }

    #[test]
    fn query_filters_by_state_and_exception() {
        let mut failed = job("pi-1");
        failed.state = JobState::FailedFatal;
        failed.exception = Some(FailureCause::new(&BehaviorError::failed("boom")));

        let query = JobQuery::new().in_state(JobState::FailedFatal).with_exception();
        assert!(query.matches(&failed));
        assert!(!query.matches(&job("pi-1")));
    }

    #[test]
    fn query_at_instant_sees_lapsed_lease_as_pending() {
        let now = Utc::now();
        let mut locked = job("pi-1");
        locked
            .acquire(&WorkerId::new("worker-1"), Duration::from_secs(60), now)
            .unwrap();
        let later = now + chrono::Duration::seconds(61);

        let pending = JobQuery::new().in_state(JobState::Pending);
        assert!(!pending.matches(&locked));
        assert!(!pending.clone().at(now).matches(&locked));
        assert!(pending.at(later).matches(&locked));
        assert!(!JobQuery::new()
            .in_state(JobState::Locked)
            .at(later)
            .matches(&locked));
    }
}
