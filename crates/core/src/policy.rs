// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry policy resolution
//!
//! Every job-bearing activity resolves its own policy when a job is created:
//!
//! 1. the activity's own retry cycle, if it has one;
//! 2. otherwise the engine-wide default cycle, if configured;
//! 3. otherwise a flat retry count with no backoff.
//!
//! Activities nested in embedded sub-processes or reached through a call
//! activity follow the same rules against the same engine default.

use crate::schedule::{self, Schedule, ScheduleError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Retry count used when neither the activity nor the engine supplies a cycle
pub const DEFAULT_RETRIES: u32 = 3;

/// The resolved retry behavior for one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub initial_retries: u32,
    pub schedule: Option<Schedule>,
}

impl RetryPolicy {
    /// Flat countdown with immediate re-eligibility
    pub fn fixed(retries: u32) -> Self {
        Self {
            initial_retries: retries,
            schedule: None,
        }
    }

    pub fn from_schedule(schedule: Schedule) -> Self {
        Self {
            initial_retries: schedule.repeat_count,
            schedule: Some(schedule),
        }
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schedule {
            Some(schedule) => write!(f, "{} retries every {}", self.initial_retries, schedule),
            None => write!(f, "{} retries, no backoff", self.initial_retries),
        }
    }
}

/// Resolve the retry policy for one activity
pub fn resolve(
    activity_override: Option<&str>,
    engine_default: Option<&Schedule>,
    default_retries: u32,
) -> Result<RetryPolicy, ScheduleError> {
    if let Some(expression) = activity_override {
        return Ok(RetryPolicy::from_schedule(schedule::parse(expression)?));
    }
    if let Some(schedule) = engine_default {
        return Ok(RetryPolicy::from_schedule(*schedule));
    }
    Ok(RetryPolicy::fixed(default_retries))
}

/// Where an activity sits relative to the process that was started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityScope {
    /// Directly inside the process definition
    Process,
    /// Inside an embedded sub-process
    SubProcess { parent: String },
    /// Inside a process started by a call activity
    CalledProcess { caller: String },
}

/// A job-bearing activity as seen by the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRef {
    pub activity_id: String,
    pub scope: ActivityScope,
    /// The activity's own `R<n>/<duration>` annotation
    #[serde(default)]
    pub retry_time_cycle: Option<String>,
}

impl ActivityRef {
    pub fn new(activity_id: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            scope: ActivityScope::Process,
            retry_time_cycle: None,
        }
    }

    pub fn in_sub_process(mut self, parent: impl Into<String>) -> Self {
        self.scope = ActivityScope::SubProcess {
            parent: parent.into(),
        };
        self
    }

    pub fn in_called_process(mut self, caller: impl Into<String>) -> Self {
        self.scope = ActivityScope::CalledProcess {
            caller: caller.into(),
        };
        self
    }

    pub fn with_retry_time_cycle(mut self, cycle: impl Into<String>) -> Self {
        self.retry_time_cycle = Some(cycle.into());
        self
    }
}

/// Engine-wide retry settings, loaded once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDefaults {
    pub engine_schedule: Option<Schedule>,
    pub default_retries: u32,
}

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            engine_schedule: None,
            default_retries: DEFAULT_RETRIES,
        }
    }
}

/// Resolves policies for activities against fixed engine defaults
///
/// Parsed activity cycles are memoized; clones share the cache.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicyResolver {
    defaults: RetryDefaults,
    parsed: Arc<Mutex<HashMap<String, Schedule>>>,
}

impl RetryPolicyResolver {
    pub fn new(defaults: RetryDefaults) -> Self {
        Self {
            defaults,
            parsed: Arc::default(),
        }
    }

    pub fn defaults(&self) -> &RetryDefaults {
        &self.defaults
    }

    /// Resolve the policy for a job created at `activity`
    pub fn resolve_activity(&self, activity: &ActivityRef) -> Result<RetryPolicy, ScheduleError> {
        let policy = match activity.retry_time_cycle.as_deref() {
            Some(expression) => RetryPolicy::from_schedule(self.parse_cached(expression)?),
            None => resolve(
                None,
                self.defaults.engine_schedule.as_ref(),
                self.defaults.default_retries,
            )?,
        };
        tracing::debug!(
            activity = %activity.activity_id,
            scope = ?activity.scope,
            %policy,
            "resolved retry policy"
        );
        Ok(policy)
    }

    fn parse_cached(&self, expression: &str) -> Result<Schedule, ScheduleError> {
        let mut parsed = self.parsed.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(schedule) = parsed.get(expression) {
            return Ok(*schedule);
        }
        let schedule = schedule::parse(expression)?;
        parsed.insert(expression.to_string(), schedule);
        Ok(schedule)
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
