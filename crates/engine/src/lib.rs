// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rj execution engine: job acquisition, execution, and management

mod behavior;
mod error;
mod executor;
pub mod fake;
mod incident;
mod service;

pub use behavior::{ActivityBehavior, BehaviorRegistry};
pub use error::{ExecutorError, ServiceError};
pub use executor::{AcquiredJob, ExecutionOutcome, ExecutorDeps, JobExecutor, WorkerPool};
pub use fake::{FakeBehavior, FakeOutcome};
pub use incident::{Incident, IncidentHandler, LogIncidentHandler, RecordingIncidentHandler};
pub use service::{JobService, MANUAL_WORKER};
