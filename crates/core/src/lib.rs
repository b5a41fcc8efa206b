// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rj-core: retry semantics for asynchronous workflow jobs
//!
//! This crate provides:
//! - Retry cycle parsing (`R5/PT5M`) and per-activity policy resolution
//! - The job entity with leased locking and retry countdown
//! - Failure classification for behavior errors
//! - The shared job table contract and engine configuration

pub mod clock;
pub mod config;
pub mod failure;
pub mod id;
pub mod job;
pub mod policy;
pub mod schedule;
pub mod store;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, EngineConfig, ExecutorConfig, RetryConfig};
pub use failure::{classify, BehaviorError, ExecutionAttempt, FailureCause, FailureClass};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use job::{Job, JobError, JobId, JobOwner, JobState, RetryStep, WorkerId};
pub use policy::{
    resolve, ActivityRef, ActivityScope, RetryDefaults, RetryPolicy, RetryPolicyResolver,
    DEFAULT_RETRIES,
};
pub use schedule::{Schedule, ScheduleError};
pub use store::{JobQuery, JobStore, StoreError};
