// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incidents raised when a job runs out of retries

use async_trait::async_trait;
use rj_core::{FailureCause, JobId, JobOwner};
use std::sync::{Arc, Mutex};

/// Operator-visible record of a job that exhausted its retries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    pub job_id: JobId,
    pub owner: JobOwner,
    pub exception: FailureCause,
}

/// Receives incidents from the executor
#[async_trait]
pub trait IncidentHandler: Send + Sync + 'static {
    async fn raise(&self, incident: Incident);
}

/// Logs incidents at error level
#[derive(Clone, Copy, Default)]
pub struct LogIncidentHandler;

#[async_trait]
impl IncidentHandler for LogIncidentHandler {
    async fn raise(&self, incident: Incident) {
        tracing::error!(
            job_id = %incident.job_id,
            process_instance = %incident.owner.process_instance_id,
            activity = %incident.owner.activity_id,
            exception = %incident.exception,
            "job failed with no retries left"
        );
    }
}

/// Keeps every raised incident in memory
#[derive(Clone, Default)]
pub struct RecordingIncidentHandler {
    incidents: Arc<Mutex<Vec<Incident>>>,
}

impl RecordingIncidentHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.incidents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl IncidentHandler for RecordingIncidentHandler {
    async fn raise(&self, incident: Incident) {
        self.incidents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(incident);
    }
}
