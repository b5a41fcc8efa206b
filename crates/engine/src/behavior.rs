// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity behaviors invoked by the executor

use async_trait::async_trait;
use rj_core::{BehaviorError, Job};
use std::collections::HashMap;
use std::sync::Arc;

/// The work behind a job, supplied by the activity implementation
#[async_trait]
pub trait ActivityBehavior: Send + Sync + 'static {
    /// Run the activity for `job`
    ///
    /// `job` is a private copy; changes to it are not persisted.
    async fn execute(&self, job: Job) -> Result<(), BehaviorError>;
}

/// Behaviors keyed by the activity id they implement
#[derive(Clone, Default)]
pub struct BehaviorRegistry {
    behaviors: HashMap<String, Arc<dyn ActivityBehavior>>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, activity_id: impl Into<String>, behavior: impl ActivityBehavior) {
        self.behaviors.insert(activity_id.into(), Arc::new(behavior));
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, activity_id: impl Into<String>, behavior: impl ActivityBehavior) -> Self {
        self.register(activity_id, behavior);
        self
    }

    /// Look up the behavior for an activity
    ///
    /// A missing behavior is a `NotFound` failure, which the classifier
    /// treats as fatal.
    pub fn get(&self, activity_id: &str) -> Result<Arc<dyn ActivityBehavior>, BehaviorError> {
        self.behaviors
            .get(activity_id)
            .cloned()
            .ok_or_else(|| BehaviorError::NotFound(activity_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

#[cfg(test)]
#[path = "behavior_tests.rs"]
mod tests;
