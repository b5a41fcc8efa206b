// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted behavior for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::behavior::ActivityBehavior;
use async_trait::async_trait;
use rj_core::{BehaviorError, Job, JobId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted execution result
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Succeed,
    Fail(BehaviorError),
    Panic(String),
    /// Sleep before succeeding, used to overrun a lease
    Hang(Duration),
}

#[derive(Default)]
struct FakeState {
    script: VecDeque<FakeOutcome>,
    fallback: Option<BehaviorError>,
    calls: Vec<JobId>,
}

/// Fake behavior that plays back scripted outcomes
///
/// Once the script runs out, every execution succeeds, or fails with the
/// error given to [`FakeBehavior::failing`].
#[derive(Clone, Default)]
pub struct FakeBehavior {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// A behavior that always fails with `error`
    pub fn failing(error: BehaviorError) -> Self {
        let fake = Self::new();
        fake.lock().fallback = Some(error);
        fake
    }

    /// Queue an outcome for the next unscripted execution
    pub fn push(&self, outcome: FakeOutcome) -> &Self {
        self.lock().script.push_back(outcome);
        self
    }

    /// Jobs executed so far, in call order
    pub fn calls(&self) -> Vec<JobId> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ActivityBehavior for FakeBehavior {
    async fn execute(&self, job: Job) -> Result<(), BehaviorError> {
        let outcome = {
            let mut state = self.lock();
            state.calls.push(job.id.clone());
            match state.script.pop_front() {
                Some(outcome) => outcome,
                None => match &state.fallback {
                    Some(error) => FakeOutcome::Fail(error.clone()),
                    None => FakeOutcome::Succeed,
                },
            }
        };

        match outcome {
            FakeOutcome::Succeed => Ok(()),
            FakeOutcome::Fail(error) => Err(error),
            FakeOutcome::Panic(message) => std::panic::panic_any(message),
            FakeOutcome::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        }
    }
}
