// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::schedule::Schedule;
use proptest::prelude::*;

#[test]
fn fingerprint_is_deterministic() {
    let spec = JobSpec::builder().build();
    let a = spec.fingerprint().unwrap();
    let b = spec.fingerprint().unwrap();
    assert_eq!(a, b);
}

#[test]
fn fingerprint_changes_with_command() {
    let a = JobSpec::builder().command("echo one").build().fingerprint().unwrap();
    let b = JobSpec::builder().command("echo two").build().fingerprint().unwrap();
    assert_ne!(a, b);
}

#[test]
fn fingerprint_changes_with_schedule() {
    let a = JobSpec::builder()
        .schedule(Schedule::Cron("* * * * *".to_string()))
        .build()
        .fingerprint()
        .unwrap();
    let b = JobSpec::builder()
        .schedule(Schedule::Interval(500))
        .build()
        .fingerprint()
        .unwrap();
    assert_ne!(a, b);
}

#[test]
fn fingerprint_short() {
    let fp = JobSpec::builder().build().fingerprint().unwrap();
    assert_eq!(fp.short(12).len(), 12);
    assert!(fp.as_str().starts_with(fp.short(12)));
}

proptest! {
    /// Any single-field edit yields a different fingerprint.
    #[test]
    fn fingerprint_sensitive_to_every_field(
        name in "[a-z]{1,16}",
        command in "[ -~]{1,64}",
        max in 1u32..8,
    ) {
        let base = JobSpec::builder().build();
        let a = base.fingerprint().unwrap();
        let renamed = JobSpec::builder().name(name.clone()).build();
        if renamed != base {
            prop_assert_ne!(renamed.fingerprint().unwrap(), a.clone());
        }
        let edited = JobSpec::builder().command(command.clone()).build();
        if edited != base {
            prop_assert_ne!(edited.fingerprint().unwrap(), a.clone());
        }
        let bumped = JobSpec::builder().max_concurrency(max).build();
        if bumped != base {
            prop_assert_ne!(bumped.fingerprint().unwrap(), a);
        }
    }
}

#[test]
fn from_spec_starts_waiting() {
    let job = Job::from_spec(JobSpec::builder().build()).unwrap();
    assert_eq!(job.state, JobState::Waiting);
    assert_eq!(job.pid, 0);
    assert_eq!(job.refcount, 0);
    assert!(job.started_at_ms.is_none());
}

#[test]
fn note_started_sets_running() {
    let mut job = Job::from_spec(JobSpec::builder().build()).unwrap();
    job.note_started(4321, 1_000);
    assert_eq!(job.state, JobState::Running);
    assert_eq!(job.pid, 4321);
    assert_eq!(job.refcount, 1);
    assert_eq!(job.started_at_ms, Some(1_000));
}

#[test]
fn note_started_preserves_deleting() {
    let mut job = Job::from_spec(JobSpec::builder().build()).unwrap();
    job.state = JobState::Deleting;
    job.note_started(4321, 1_000);
    assert_eq!(job.state, JobState::Deleting);
    assert_eq!(job.refcount, 1);
}

#[test]
fn note_exited_clean() {
    let mut job = Job::from_spec(JobSpec::builder().build()).unwrap();
    job.note_started(4321, 1_000);
    job.note_exited(Some(0), 2_000);
    assert_eq!(job.state, JobState::Stopped);
    assert_eq!(job.pid, 0);
    assert_eq!(job.refcount, 0);
    assert_eq!(job.ended_at_ms, Some(2_000));
}

#[test]
fn note_exited_nonzero_is_unknown() {
    let mut job = Job::from_spec(JobSpec::builder().build()).unwrap();
    job.note_started(4321, 1_000);
    job.note_exited(Some(2), 2_000);
    assert_eq!(job.state, JobState::Unknown);
}

#[test]
fn note_exited_signal_is_unknown() {
    let mut job = Job::from_spec(JobSpec::builder().build()).unwrap();
    job.note_started(4321, 1_000);
    job.note_exited(None, 2_000);
    assert_eq!(job.state, JobState::Unknown);
}

#[test]
fn note_exited_preserves_deleting_and_drains() {
    let mut job = Job::from_spec(JobSpec::builder().build()).unwrap();
    job.note_started(4321, 1_000);
    job.state = JobState::Deleting;
    job.note_exited(Some(0), 2_000);
    assert_eq!(job.state, JobState::Deleting);
    assert!(job.is_drained());
}

#[test]
fn spawn_outcome_preserves_deleting() {
    let mut job = Job::from_spec(JobSpec::builder().build()).unwrap();
    job.note_spawn_outcome(JobState::Fatal);
    assert_eq!(job.state, JobState::Fatal);
    job.state = JobState::Deleting;
    job.note_spawn_outcome(JobState::Backoff);
    assert_eq!(job.state, JobState::Deleting);
}
