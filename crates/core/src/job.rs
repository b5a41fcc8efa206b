// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job entity: one pending or failed unit of asynchronous work
//!
//! A job carries its resolved retry schedule and a leased lock. Mutators are
//! meant to be called by the lock holder on a private copy; persisting the
//! result is a compare-and-swap on `version` (see [`crate::store::JobStore`]).

use crate::clock::offset;
use crate::failure::FailureCause;
use crate::policy::RetryPolicy;
use crate::schedule::Schedule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Unique identifier for a job
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a worker holding job leases
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The activity instance a job belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOwner {
    pub process_instance_id: String,
    pub activity_instance_id: String,
    pub activity_id: String,
    pub process_definition_key: String,
    /// Calling process instance, for jobs inside a called process
    #[serde(default)]
    pub super_process_instance_id: Option<String>,
}

impl JobOwner {
    pub fn new(
        process_definition_key: impl Into<String>,
        process_instance_id: impl Into<String>,
        activity_id: impl Into<String>,
    ) -> Self {
        let process_instance_id = process_instance_id.into();
        let activity_id = activity_id.into();
        Self {
            activity_instance_id: format!("{}:{}", activity_id, process_instance_id),
            process_instance_id,
            activity_id,
            process_definition_key: process_definition_key.into(),
            super_process_instance_id: None,
        }
    }

    pub fn called_from(mut self, super_process_instance_id: impl Into<String>) -> Self {
        self.super_process_instance_id = Some(super_process_instance_id.into());
        self
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for its due date
    Pending,
    /// Leased to a worker
    ///
    /// The stored state stays `Locked` after the lease runs out, until another
    /// worker reclaims the job or the holder commits. Use
    /// [`Job::effective_state`] to see such a job as pending.
    Locked,
    /// Held back by an operator; never acquired
    Suspended,
    /// Out of retries; waits for manual intervention
    FailedFatal,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Locked => write!(f, "locked"),
            JobState::Suspended => write!(f, "suspended"),
            JobState::FailedFatal => write!(f, "failed_fatal"),
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "locked" => Ok(JobState::Locked),
            "suspended" => Ok(JobState::Suspended),
            "failed_fatal" | "failed" => Ok(JobState::FailedFatal),
            _ => Err(format!("unknown job state: {}", s)),
        }
    }
}

/// Errors from invalid job mutations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job {job} cannot {action} while {state}")]
    InvalidTransition {
        job: JobId,
        state: JobState,
        action: &'static str,
    },
    #[error("job {job} is locked by {holder}")]
    Locked { job: JobId, holder: WorkerId },
    #[error("job {job} is not held by {worker}")]
    NotHeld { job: JobId, worker: WorkerId },
    #[error("job {job} cannot raise retries from {current} to {requested}")]
    RetryRefill {
        job: JobId,
        current: u32,
        requested: u32,
    },
}

/// Outcome of one failed attempt: the retry count and due date to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryStep {
    pub retries_after: u32,
    pub next_due: DateTime<Utc>,
}

/// A persisted unit of deferred, retryable work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub owner: JobOwner,
    pub state: JobState,
    pub retries_remaining: u32,
    pub schedule: Option<Schedule>,
    pub due_date: DateTime<Utc>,
    pub lock_owner: Option<WorkerId>,
    pub lock_expiration: Option<DateTime<Utc>>,
    pub exception: Option<FailureCause>,
    /// Row version, bumped by the store on every successful write
    pub version: u64,
    /// Creation order, assigned by the store on insert
    pub created_seq: u64,
    pub created_at: DateTime<Utc>,
    pub attempts: u32,
}

impl Job {
    /// Create a pending job, due immediately
    pub fn new(id: JobId, owner: JobOwner, policy: RetryPolicy, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            state: JobState::Pending,
            retries_remaining: policy.initial_retries,
            schedule: policy.schedule,
            due_date: now,
            lock_owner: None,
            lock_expiration: None,
            exception: None,
            version: 0,
            created_seq: 0,
            created_at: now,
            attempts: 0,
        }
    }

    /// Delay the first execution until `due_date`
    pub fn due_at(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.state == JobState::FailedFatal
    }

    /// True when a lease is held and has not yet run out
    pub fn has_live_lock(&self, now: DateTime<Utc>) -> bool {
        match (&self.lock_owner, self.lock_expiration) {
            (Some(_), Some(expiration)) => now < expiration,
            _ => false,
        }
    }

    pub fn is_held_by(&self, worker: &WorkerId) -> bool {
        self.lock_owner.as_ref() == Some(worker)
    }

    /// State as seen at `now`: a lock whose lease ran out counts as pending
    pub fn effective_state(&self, now: DateTime<Utc>) -> JobState {
        match self.state {
            JobState::Locked if !self.has_live_lock(now) => JobState::Pending,
            state => state,
        }
    }

    /// Whether the acquisition scan may hand this job to a worker
    pub fn is_acquirable(&self, now: DateTime<Utc>) -> bool {
        let state_ok = match self.state {
            JobState::Pending => true,
            JobState::Locked => !self.has_live_lock(now),
            JobState::Suspended | JobState::FailedFatal => false,
        };
        state_ok && self.retries_remaining > 0 && self.due_date <= now
    }

    /// Take the lease for `worker`
    ///
    /// Due date and retry count are not checked here; the acquisition scan
    /// filters on them and manual execution deliberately ignores them.
    /// Returns the previous holder when an expired lease was taken over.
    pub fn acquire(
        &mut self,
        worker: &WorkerId,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<WorkerId>, JobError> {
        if self.state == JobState::Suspended {
            return Err(self.invalid("acquire"));
        }
        if self.has_live_lock(now) {
            if let Some(holder) = &self.lock_owner {
                return Err(JobError::Locked {
                    job: self.id.clone(),
                    holder: holder.clone(),
                });
            }
        }

        let previous = self.lock_owner.take();
        self.lock_owner = Some(worker.clone());
        self.lock_expiration = Some(offset(now, lease));
        // A frozen job stays frozen while it is executed by hand
        if self.state != JobState::FailedFatal {
            self.state = JobState::Locked;
        }
        Ok(previous)
    }

    /// Compute the retry count and due date after one more failure
    pub fn retry_step(&self, now: DateTime<Utc>) -> RetryStep {
        let next_due = match &self.schedule {
            Some(schedule) => offset(now, schedule.cycle),
            None => now,
        };
        RetryStep {
            retries_after: self.retries_remaining.saturating_sub(1),
            next_due,
        }
    }

    /// Record a failed attempt and release the lease
    ///
    /// The job returns to pending while retries remain and freezes in
    /// `FailedFatal` once they reach zero.
    pub fn apply_failure(
        &mut self,
        worker: &WorkerId,
        cause: FailureCause,
        next_due: DateTime<Utc>,
        retries_after: u32,
    ) -> Result<JobState, JobError> {
        self.ensure_held_by(worker)?;
        if retries_after > self.retries_remaining {
            return Err(JobError::RetryRefill {
                job: self.id.clone(),
                current: self.retries_remaining,
                requested: retries_after,
            });
        }

        self.retries_remaining = retries_after;
        self.due_date = self.due_date.max(next_due);
        self.exception = Some(cause);
        self.attempts += 1;
        self.clear_lock();
        if retries_after == 0 || self.state == JobState::FailedFatal {
            self.state = JobState::FailedFatal;
        } else {
            self.state = JobState::Pending;
        }
        Ok(self.state)
    }

    /// Record a successful attempt; the caller removes the job afterwards
    pub fn mark_succeeded(&mut self, worker: &WorkerId) -> Result<(), JobError> {
        self.ensure_held_by(worker)?;
        self.attempts += 1;
        self.clear_lock();
        Ok(())
    }

    /// Give the lease back without recording an attempt
    pub fn release(&mut self, worker: &WorkerId) -> Result<(), JobError> {
        self.ensure_held_by(worker)?;
        self.clear_lock();
        if self.state == JobState::Locked {
            self.state = JobState::Pending;
        }
        Ok(())
    }

    /// Hold a pending job back from acquisition
    pub fn suspend(&mut self) -> Result<(), JobError> {
        match self.state {
            JobState::Pending => {
                self.state = JobState::Suspended;
                Ok(())
            }
            _ => Err(self.invalid("suspend")),
        }
    }

    /// Return a suspended job to the pending pool
    pub fn activate(&mut self) -> Result<(), JobError> {
        match self.state {
            JobState::Suspended => {
                self.state = JobState::Pending;
                Ok(())
            }
            _ => Err(self.invalid("activate")),
        }
    }

    fn ensure_held_by(&self, worker: &WorkerId) -> Result<(), JobError> {
        if self.is_held_by(worker) {
            Ok(())
        } else {
            Err(JobError::NotHeld {
                job: self.id.clone(),
                worker: worker.clone(),
            })
        }
    }

    fn clear_lock(&mut self) {
        self.lock_owner = None;
        self.lock_expiration = None;
    }

    fn invalid(&self, action: &'static str) -> JobError {
        JobError::InvalidTransition {
            job: self.id.clone(),
            state: self.state,
            action,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
