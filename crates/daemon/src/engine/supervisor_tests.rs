// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mn_core::{FakeClock, JobSpec, Schedule};

fn registry_with(command: &str) -> (Arc<Mutex<JobRegistry>>, Fingerprint) {
    let job = mn_core::Job::from_spec(
        JobSpec::builder()
            .command(command)
            .schedule(Schedule::Cron("* * * * *".to_string()))
            .build(),
    )
    .unwrap();
    let fingerprint = job.fingerprint.clone();
    let mut registry = JobRegistry::new();
    registry.insert(job);
    (Arc::new(Mutex::new(registry)), fingerprint)
}

#[tokio::test]
async fn successful_run_recorded() {
    let (registry, fp) = registry_with("sleep 0.1");
    let clock = FakeClock::default();

    execute(Arc::clone(&registry), clock, fp.clone()).await;

    let jobs = registry.lock();
    let job = jobs.get(&fp).unwrap();
    assert_eq!(job.state, JobState::Stopped);
    assert_eq!(job.refcount, 0);
    assert_eq!(job.pid, 0);
    assert!(job.started_at_ms.is_some());
    assert!(job.ended_at_ms.is_some());
}

#[tokio::test]
async fn nonzero_exit_marks_unknown() {
    let (registry, fp) = registry_with("sleep 0.1; exit 3");
    let clock = FakeClock::default();

    execute(Arc::clone(&registry), clock, fp.clone()).await;

    let jobs = registry.lock();
    let job = jobs.get(&fp).unwrap();
    assert_eq!(job.state, JobState::Unknown);
    assert_eq!(job.refcount, 0);
}

#[tokio::test]
async fn deleting_job_never_spawned() {
    let (registry, fp) = registry_with("sleep 5");
    registry.lock().get_mut(&fp).unwrap().state = JobState::Deleting;
    let clock = FakeClock::default();

    execute(Arc::clone(&registry), clock, fp.clone()).await;

    let jobs = registry.lock();
    let job = jobs.get(&fp).unwrap();
    assert_eq!(job.state, JobState::Deleting);
    assert_eq!(job.refcount, 0);
    assert!(job.started_at_ms.is_none());
}

#[tokio::test]
async fn saturated_job_never_spawned() {
    let (registry, fp) = registry_with("sleep 5");
    {
        let mut jobs = registry.lock();
        let job = jobs.get_mut(&fp).unwrap();
        job.refcount = 1;
        job.state = JobState::Running;
    }
    let clock = FakeClock::default();

    execute(Arc::clone(&registry), clock, fp.clone()).await;

    let jobs = registry.lock();
    let job = jobs.get(&fp).unwrap();
    assert_eq!(job.state, JobState::Running);
    assert_eq!(job.refcount, 1);
}

#[tokio::test]
async fn spawn_failure_marks_fatal() {
    let (registry, fp) = registry_with("echo never runs");
    let clock = FakeClock::default();

    execute_with(Arc::clone(&registry), clock, fp.clone(), "/nonexistent/shell").await;

    let jobs = registry.lock();
    let job = jobs.get(&fp).unwrap();
    assert_eq!(job.state, JobState::Fatal);
    assert_eq!(job.refcount, 0);
    assert_eq!(job.pid, 0);
    assert!(job.started_at_ms.is_none());
}

#[tokio::test]
async fn dispatch_never_shows_starting() {
    let (registry, fp) = registry_with("sleep 0.2");
    let task =
        tokio::spawn(execute(Arc::clone(&registry), FakeClock::default(), fp.clone()));

    // `Starting` belongs to the control surface; an admitted dispatch
    // goes from Waiting straight to Running at commit.
    let mut saw_starting = false;
    for _ in 0..500 {
        let state = registry.lock().get(&fp).unwrap().state;
        saw_starting |= state == JobState::Starting;
        if state == JobState::Running {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
    assert!(!saw_starting);
    assert_eq!(registry.lock().get(&fp).unwrap().state, JobState::Running);
    task.await.unwrap();
}

#[tokio::test]
async fn unknown_fingerprint_is_a_noop() {
    let registry = Arc::new(Mutex::new(JobRegistry::new()));
    execute(registry, FakeClock::default(), Fingerprint::new("missing")).await;
}

#[tokio::test]
async fn stdout_appended_to_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("job.out");
    let job = mn_core::Job::from_spec(
        JobSpec::builder()
            .command("sleep 0.1; echo done")
            .output_path(out.to_str().unwrap())
            .schedule(Schedule::Cron("* * * * *".to_string()))
            .build(),
    )
    .unwrap();
    let fp = job.fingerprint.clone();
    let registry = Arc::new(Mutex::new(JobRegistry::new()));
    registry.lock().insert(job);

    execute(Arc::clone(&registry), FakeClock::default(), fp).await;

    assert_eq!(std::fs::read_to_string(&out).unwrap(), "done\n");
}

#[tokio::test]
async fn exit_timestamps_come_from_clock() {
    let (registry, fp) = registry_with("sleep 0.1");
    let clock = FakeClock::default();
    clock.set_epoch_ms(42_000);

    execute(Arc::clone(&registry), clock, fp.clone()).await;

    let jobs = registry.lock();
    let job = jobs.get(&fp).unwrap();
    assert_eq!(job.started_at_ms, Some(42_000));
    assert_eq!(job.ended_at_ms, Some(42_000));
}
