// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::executor::ExecutorDeps;
use crate::fake::FakeBehavior;
use crate::incident::RecordingIncidentHandler;
use crate::BehaviorRegistry;
use rj_core::{BehaviorError, ExecutorConfig, FakeClock, RetryDefaults, SequentialIdGen};
use rj_storage::JobTable;
use std::sync::Arc;
use std::time::Duration;

const ACTIVITY: &str = "serviceTask";

type Service = JobService<JobTable, FakeClock, SequentialIdGen>;

fn setup(behavior: FakeBehavior) -> (Service, FakeClock, RecordingIncidentHandler) {
    let clock = FakeClock::new();
    let incidents = RecordingIncidentHandler::new();
    let executor = JobExecutor::new(
        ExecutorDeps {
            store: Arc::new(JobTable::in_memory()),
            behaviors: BehaviorRegistry::new().with(ACTIVITY, behavior),
            incidents: Arc::new(incidents.clone()),
            clock: clock.clone(),
        },
        ExecutorConfig::default(),
    );
    let service = JobService::new(
        executor,
        RetryPolicyResolver::new(RetryDefaults::default()),
        SequentialIdGen::default(),
    );
    (service, clock, incidents)
}

fn owner(pi: &str) -> JobOwner {
    JobOwner::new("process", pi, ACTIVITY)
}

#[test]
fn create_job_resolves_policy() {
    let (service, _, _) = setup(FakeBehavior::new());

    let job = service
        .create_job(owner("pi-1"), &ActivityRef::new(ACTIVITY))
        .unwrap();
    assert_eq!(job.id, JobId::new("job-1"));
    assert_eq!(job.retries_remaining, 3);
    assert_eq!(job.state, JobState::Pending);

    let job = service
        .create_job(
            owner("pi-1"),
            &ActivityRef::new(ACTIVITY).with_retry_time_cycle("R7/PT1M"),
        )
        .unwrap();
    assert_eq!(job.retries_remaining, 7);
}

#[test]
fn create_job_rejects_bad_cycle() {
    let (service, _, _) = setup(FakeBehavior::new());
    let err = service
        .create_job(
            owner("pi-1"),
            &ActivityRef::new(ACTIVITY).with_retry_time_cycle("garbage"),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Schedule(_)));
    assert!(service.query(&JobQuery::new()).unwrap().is_empty());
}

#[tokio::test]
async fn execute_job_ignores_due_date() {
    let fake = FakeBehavior::new();
    let (service, clock, _) = setup(fake.clone());
    let job = service
        .create_job_with_policy(owner("pi-1"), RetryPolicy::fixed(3))
        .unwrap();
    let future = clock.now() + chrono::TimeDelta::hours(1);
    let mut delayed = job.clone();
    delayed.due_date = future;
    service
        .executor()
        .store()
        .compare_and_swap(delayed, job.version)
        .unwrap();

    let outcome = service.execute_job(&job.id).await.unwrap();

    assert_eq!(outcome, ExecutionOutcome::Succeeded);
    assert!(service.job(&job.id).unwrap().is_none());
    assert_eq!(fake.calls(), vec![job.id]);
}

#[tokio::test]
async fn execute_job_refuses_live_lease() {
    let (service, _, _) = setup(FakeBehavior::new());
    let job = service
        .create_job_with_policy(owner("pi-1"), RetryPolicy::fixed(3))
        .unwrap();
    service
        .executor()
        .acquire_next(&WorkerId::new("w1"))
        .await
        .unwrap()
        .unwrap();

    let err = service.execute_job(&job.id).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::JobLocked { holder, .. } if holder == WorkerId::new("w1")
    ));
}

#[tokio::test]
async fn execute_job_reports_missing_and_suspended() {
    let (service, _, _) = setup(FakeBehavior::new());
    let err = service.execute_job(&JobId::new("nope")).await.unwrap_err();
    assert!(matches!(err, ServiceError::JobNotFound(_)));

    let job = service
        .create_job_with_policy(owner("pi-1"), RetryPolicy::fixed(3))
        .unwrap();
    service.suspend_job(&job.id).unwrap();
    let err = service.execute_job(&job.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::JobSuspended(_)));
}

#[tokio::test]
async fn failed_job_can_be_executed_by_hand() {
    let fake = FakeBehavior::failing(BehaviorError::failed("boom"));
    let (service, _, incidents) = setup(fake.clone());
    let job = service
        .create_job_with_policy(owner("pi-1"), RetryPolicy::fixed(1))
        .unwrap();

    let outcome = service.execute_job(&job.id).await.unwrap();
    assert_eq!(
        outcome,
        ExecutionOutcome::Failed {
            incident_raised: true
        }
    );

    // Still failing: stays frozen, no second incident
    let outcome = service.execute_job(&job.id).await.unwrap();
    assert_eq!(
        outcome,
        ExecutionOutcome::Failed {
            incident_raised: false
        }
    );
    let frozen = service.job(&job.id).unwrap().unwrap();
    assert_eq!(frozen.state, JobState::FailedFatal);
    assert_eq!(frozen.attempts, 2);
    assert_eq!(incidents.incidents().len(), 1);

    // Fixed: success removes it
    fake.push(crate::fake::FakeOutcome::Succeed);
    let outcome = service.execute_job(&job.id).await.unwrap();
    assert_eq!(outcome, ExecutionOutcome::Succeeded);
    assert!(service.job(&job.id).unwrap().is_none());
}

#[test]
fn queries_filter_by_process_instance() {
    let (service, _, _) = setup(FakeBehavior::new());
    service
        .create_job_with_policy(owner("pi-1"), RetryPolicy::fixed(3))
        .unwrap();
    service
        .create_job_with_policy(owner("pi-2"), RetryPolicy::fixed(3))
        .unwrap();
    service
        .create_job_with_policy(owner("pi-1"), RetryPolicy::fixed(3))
        .unwrap();

    let jobs = service.jobs_for_process_instance("pi-1").unwrap();
    let ids: Vec<_> = jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["job-1", "job-3"]);
}

#[tokio::test]
async fn state_queries_see_lapsed_lease_as_pending() {
    let (service, clock, _) = setup(FakeBehavior::new());
    let job = service
        .create_job_with_policy(owner("pi-1"), RetryPolicy::fixed(3))
        .unwrap();
    service
        .executor()
        .acquire_next(&WorkerId::new("crashed"))
        .await
        .unwrap()
        .unwrap();
    let pending = JobQuery::new().in_state(JobState::Pending);
    let locked = JobQuery::new().in_state(JobState::Locked);
    assert!(service.query(&pending).unwrap().is_empty());
    assert_eq!(service.query(&locked).unwrap().len(), 1);

    clock.advance(Duration::from_secs(301));

    let ids: Vec<_> = service
        .query(&pending)
        .unwrap()
        .into_iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(ids, vec![job.id]);
    assert!(service.query(&locked).unwrap().is_empty());
}

#[test]
fn cancel_job_removes_it() {
    let (service, _, _) = setup(FakeBehavior::new());
    let job = service
        .create_job_with_policy(owner("pi-1"), RetryPolicy::fixed(3))
        .unwrap();

    service.cancel_job(&job.id).unwrap();
    assert!(service.job(&job.id).unwrap().is_none());
    assert!(matches!(
        service.cancel_job(&job.id),
        Err(ServiceError::JobNotFound(_))
    ));
}

#[test]
fn cancel_process_instance_removes_only_its_jobs() {
    let (service, _, _) = setup(FakeBehavior::new());
    for pi in ["pi-1", "pi-2", "pi-1"] {
        service
            .create_job_with_policy(owner(pi), RetryPolicy::fixed(3))
            .unwrap();
    }

    let cancelled = service.cancel_process_instance("pi-1").unwrap();

    assert_eq!(cancelled.len(), 2);
    assert_eq!(service.query(&JobQuery::new()).unwrap().len(), 1);
}

#[tokio::test]
async fn suspend_and_activate_gate_acquisition() {
    let (service, _, _) = setup(FakeBehavior::new());
    let job = service
        .create_job_with_policy(owner("pi-1"), RetryPolicy::fixed(3))
        .unwrap();
    let worker = WorkerId::new("w1");

    let suspended = service.suspend_job(&job.id).unwrap();
    assert_eq!(suspended.state, JobState::Suspended);
    assert!(service.executor().acquire_next(&worker).await.unwrap().is_none());
    assert!(matches!(
        service.suspend_job(&job.id),
        Err(ServiceError::Job(JobError::InvalidTransition { .. }))
    ));

    service.activate_job(&job.id).unwrap();
    assert!(service.executor().acquire_next(&worker).await.unwrap().is_some());
}

#[tokio::test]
async fn lease_from_config_bounds_manual_lock() {
    let (service, clock, _) = setup(FakeBehavior::new());
    let job = service
        .create_job_with_policy(owner("pi-1"), RetryPolicy::fixed(3))
        .unwrap();
    let acquired = service
        .executor()
        .acquire_next(&WorkerId::new("crashed"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        acquired.job.lock_expiration,
        Some(clock.now() + chrono::TimeDelta::seconds(300))
    );

    clock.advance(Duration::from_secs(301));
    let outcome = service.execute_job(&job.id).await.unwrap();
    assert_eq!(outcome, ExecutionOutcome::Succeeded);
}
