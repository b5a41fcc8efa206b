// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box tests for the rj binary

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use rj_core::{BehaviorError, FailureCause, Job, JobId, JobOwner, JobState, JobStore, RetryPolicy};
use rj_storage::JobTable;
use std::path::Path;

fn rj() -> Command {
    Command::cargo_bin("rj").unwrap()
}

/// Write three jobs to a WAL: two for pi-1 (one failed), one for pi-2
fn seed(path: &Path) {
    let table = JobTable::open(path).unwrap();
    let now = chrono::Utc::now();
    let schedule = rj_core::schedule::parse("R5/PT5M").unwrap();
    table
        .insert(Job::new(
            JobId::new("job-a"),
            JobOwner::new("order", "pi-1", "charge"),
            RetryPolicy::from_schedule(schedule),
            now,
        ))
        .unwrap();

    let mut failed = Job::new(
        JobId::new("job-b"),
        JobOwner::new("order", "pi-1", "ship"),
        RetryPolicy::fixed(0),
        now,
    );
    failed.state = JobState::FailedFatal;
    failed.exception = Some(FailureCause::new(&BehaviorError::NotFound(
        "this.class.does.not.Exist".into(),
    )));
    table.insert(failed).unwrap();

    table
        .insert(Job::new(
            JobId::new("job-c"),
            JobOwner::new("invoice", "pi-2", "send"),
            RetryPolicy::fixed(3),
            now,
        ))
        .unwrap();
}

#[test]
fn help_lists_commands() {
    rj().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("jobs"));
}

#[test]
fn parse_prints_canonical_cycle() {
    rj().args(["parse", "R5/PT5M"])
        .assert()
        .success()
        .stdout(predicate::str::contains("R5/PT5M: 5 retries, 300s apart"));
}

#[test]
fn parse_json_output() {
    let output = rj().args(["parse", "R3/PT1H30M", "-o", "json"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["repeat_count"], 3);
    assert_eq!(value["cycle_secs"], 5400.0);
}

#[test]
fn parse_rejects_bad_expressions() {
    for expression in ["R0/PT5M", "garbage", "R5/P1M"] {
        rj().args(["parse", expression])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid retry cycle"));
    }
}

#[test]
fn resolve_prefers_activity_cycle() {
    rj().args([
        "resolve",
        "--activity-cycle",
        "R10/PT5M",
        "--engine-cycle",
        "R5/PT5M",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("10 retries every R10/PT5M (from activity)"));
}

#[test]
fn resolve_uses_engine_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("engine.toml");
    std::fs::write(&config, "[retry]\nfailed_job_retry_time_cycle = \"R5/PT5M\"\n").unwrap();

    rj().args(["resolve", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("5 retries every R5/PT5M (from engine default)"));
}

#[test]
fn resolve_falls_back_to_three() {
    rj().arg("resolve")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 retries, no backoff (from fallback)"));
}

#[test]
fn check_accepts_valid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("engine.toml");
    std::fs::write(
        &config,
        "[retry]\nfailed_job_retry_time_cycle = \"R5/PT5M\"\n\n[executor]\nworkers = 2\nlease = \"90s\"\n",
    )
    .unwrap();

    rj().args(["check", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration ok"))
        .stdout(predicate::str::contains("workers: 2"))
        .stdout(predicate::str::contains("lease: 90s"));
}

#[test]
fn check_rejects_bad_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("engine.toml");
    std::fs::write(&config, "[retry]\nfailed_job_retry_time_cycle = \"R5\"\n").unwrap();

    rj().args(["check", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn jobs_list_filters() {
    let dir = tempfile::tempdir().unwrap();
    let wal = dir.path().join("jobs.wal");
    seed(&wal);

    rj().args(["jobs", "list", "--wal"])
        .arg(&wal)
        .assert()
        .success()
        .stdout(predicate::str::contains("job-a"))
        .stdout(predicate::str::contains("job-c"));

    rj().args(["jobs", "list", "--process-instance", "pi-2", "--wal"])
        .arg(&wal)
        .assert()
        .success()
        .stdout(predicate::str::contains("job-c"))
        .stdout(predicate::str::contains("job-a").not());

    rj().args(["jobs", "list", "--state", "failed", "--wal"])
        .arg(&wal)
        .assert()
        .success()
        .stdout(predicate::str::contains("job-b"))
        .stdout(predicate::str::contains("job-a").not());
}

#[test]
fn jobs_list_json_is_in_creation_order() {
    let dir = tempfile::tempdir().unwrap();
    let wal = dir.path().join("jobs.wal");
    seed(&wal);

    let output = rj()
        .args(["jobs", "list", "-o", "json", "--wal"])
        .arg(&wal)
        .output()
        .unwrap();
    assert!(output.status.success());
    let jobs: Vec<Job> = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<_> = jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["job-a", "job-b", "job-c"]);
}

#[test]
fn jobs_show_prints_exception() {
    let dir = tempfile::tempdir().unwrap();
    let wal = dir.path().join("jobs.wal");
    seed(&wal);

    rj().args(["jobs", "show", "job-b", "--wal"])
        .arg(&wal)
        .assert()
        .success()
        .stdout(predicate::str::contains("state: failed_fatal"))
        .stdout(predicate::str::contains("[fatal]"))
        .stdout(predicate::str::contains("this.class.does.not.Exist"));

    rj().args(["jobs", "show", "missing", "--wal"])
        .arg(&wal)
        .assert()
        .failure()
        .stderr(predicate::str::contains("job not found"));
}

#[test]
fn jobs_mutations_persist() {
    let dir = tempfile::tempdir().unwrap();
    let wal = dir.path().join("jobs.wal");
    seed(&wal);

    rj().args(["jobs", "suspend", "job-a", "--wal"])
        .arg(&wal)
        .assert()
        .success()
        .stdout(predicate::str::contains("Suspended job-a"));
    rj().args(["jobs", "cancel-instance", "pi-2", "--wal"])
        .arg(&wal)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled 1 job(s) of pi-2"));

    let table = JobTable::open(&wal).unwrap();
    let job = table.get(&JobId::new("job-a")).unwrap().unwrap();
    assert_eq!(job.state, JobState::Suspended);
    assert!(table.get(&JobId::new("job-c")).unwrap().is_none());

    rj().args(["jobs", "cancel", "job-c", "--wal"])
        .arg(&wal)
        .assert()
        .failure()
        .stderr(predicate::str::contains("job not found"));
}
