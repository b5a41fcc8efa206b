// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration
//!
//! Loaded once at startup from TOML. The engine-wide retry cycle is parsed
//! here, so a malformed cycle stops the engine from starting instead of
//! surfacing on the first failed job.

use crate::policy::{RetryDefaults, DEFAULT_RETRIES};
use crate::schedule::{self, ScheduleError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid engine retry cycle: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Engine-wide retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Default `R<n>/<duration>` cycle for activities without their own
    #[serde(default)]
    pub failed_job_retry_time_cycle: Option<String>,
    /// Retry count when no cycle applies at all
    #[serde(default = "default_retries")]
    pub default_retries: u32,
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            failed_job_retry_time_cycle: None,
            default_retries: DEFAULT_RETRIES,
        }
    }
}

/// Worker pool and acquisition settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// How long an acquired job stays locked to its worker
    #[serde(default = "default_lease", with = "humantime_serde")]
    pub lease: Duration,
    /// Idle wait between acquisition scans
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Candidates read per acquisition scan
    #[serde(default = "default_acquisition_batch")]
    pub acquisition_batch: usize,
    /// Freeze a job on its first fatal failure instead of counting down
    #[serde(default)]
    pub fatal_exhausts_retries: bool,
    #[serde(default = "default_worker_prefix")]
    pub worker_prefix: String,
}

fn default_workers() -> usize {
    4
}

fn default_lease() -> Duration {
    Duration::from_secs(300)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_acquisition_batch() -> usize {
    10
}

fn default_worker_prefix() -> String {
    "worker".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            lease: default_lease(),
            poll_interval: default_poll_interval(),
            acquisition_batch: default_acquisition_batch(),
            fatal_exhausts_retries: false,
            worker_prefix: default_worker_prefix(),
        }
    }
}

impl EngineConfig {
    /// Read and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML config text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry_defaults()?;
        if self.executor.workers == 0 {
            return Err(ConfigError::Invalid("executor.workers must be at least 1".into()));
        }
        if self.executor.lease.is_zero() {
            return Err(ConfigError::Invalid("executor.lease must be positive".into()));
        }
        if self.executor.acquisition_batch == 0 {
            return Err(ConfigError::Invalid(
                "executor.acquisition_batch must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The parsed engine-wide defaults handed to the policy resolver
    pub fn retry_defaults(&self) -> Result<RetryDefaults, ScheduleError> {
        let engine_schedule = self
            .retry
            .failed_job_retry_time_cycle
            .as_deref()
            .map(schedule::parse)
            .transpose()?;
        Ok(RetryDefaults {
            engine_schedule,
            default_retries: self.retry.default_retries,
        })
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
