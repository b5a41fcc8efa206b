// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure classification for job executions
//!
//! Behaviors report failures as [`BehaviorError`]; the executor turns each
//! result into an [`ExecutionAttempt`]. Fatal and retryable failures consume
//! a retry the same way. The class only changes what operators see.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by an activity behavior during execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BehaviorError {
    #[error("no behavior registered for '{0}'")]
    NotFound(String),
    #[error("could not instantiate behavior '{name}': {reason}")]
    Instantiation { name: String, reason: String },
    #[error("invalid activity definition: {0}")]
    Definition(String),
    #[error("{message}")]
    Failed {
        message: String,
        detail: Option<String>,
    },
    #[error("behavior panicked: {0}")]
    Panicked(String),
    #[error("execution exceeded its lease of {0:?}")]
    LeaseExpired(Duration),
}

impl BehaviorError {
    /// A transient failure with no further detail
    pub fn failed(message: impl Into<String>) -> Self {
        BehaviorError::Failed {
            message: message.into(),
            detail: None,
        }
    }

    /// Capture an error and its source chain
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        BehaviorError::Failed {
            message: err.to_string(),
            detail: (!chain.is_empty()).then(|| chain.join("\n")),
        }
    }
}

/// Whether a failure could plausibly go away on retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Retryable,
    /// The work cannot run as defined (missing or broken behavior)
    Fatal,
}

/// Classify a behavior error
pub fn classify(error: &BehaviorError) -> FailureClass {
    match error {
        BehaviorError::NotFound(_)
        | BehaviorError::Instantiation { .. }
        | BehaviorError::Definition(_) => FailureClass::Fatal,
        BehaviorError::Failed { .. }
        | BehaviorError::Panicked(_)
        | BehaviorError::LeaseExpired(_) => FailureClass::Retryable,
    }
}

/// Last failure recorded on a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCause {
    pub message: String,
    pub detail: String,
    pub fatal: bool,
}

impl FailureCause {
    pub fn new(error: &BehaviorError) -> Self {
        let detail = match error {
            BehaviorError::Failed {
                detail: Some(detail),
                ..
            } => detail.clone(),
            other => format!("{:?}", other),
        };
        Self {
            message: error.to_string(),
            detail,
            fatal: classify(error) == FailureClass::Fatal,
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fatal {
            write!(f, "[fatal] {}", self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Outcome of a single execution, consumed immediately by the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionAttempt {
    Succeeded,
    Retryable(FailureCause),
    Fatal(FailureCause),
}

impl ExecutionAttempt {
    pub fn from_result(result: Result<(), BehaviorError>) -> Self {
        match result {
            Ok(()) => ExecutionAttempt::Succeeded,
            Err(error) => {
                let cause = FailureCause::new(&error);
                match classify(&error) {
                    FailureClass::Retryable => ExecutionAttempt::Retryable(cause),
                    FailureClass::Fatal => ExecutionAttempt::Fatal(cause),
                }
            }
        }
    }

    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            ExecutionAttempt::Succeeded => None,
            ExecutionAttempt::Retryable(cause) | ExecutionAttempt::Fatal(cause) => Some(cause),
        }
    }
}

#[cfg(test)]
#[path = "failure_tests.rs"]
mod tests;
