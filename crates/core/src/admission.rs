// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission control: may a job start a new execution right now?
//!
//! Pure decisions with one documented side effect: finding a `Running`
//! job due again bumps its overrun counter before the capacity check,
//! so jobs with `max_concurrency > 1` can still admit additional runs.

use crate::job::Job;
use crate::state::JobState;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Reject(RejectReason),
}

impl Admission {
    pub fn is_admit(self) -> bool {
        matches!(self, Admission::Admit)
    }
}

/// Why a job was not admitted. Capacity rejection is a normal
/// scheduling outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The job is draining toward removal.
    Deleting,
    /// Another fingerprint of the same logical id is still draining.
    IdDraining,
    /// Interval jobs are admitted by their own timer, not the tick scan.
    IntervalDriven,
    /// The cron expression is not due at this time.
    NotDue,
    /// `refcount` has reached `max_concurrency`.
    AtCapacity,
}

crate::simple_display! {
    RejectReason {
        Deleting => "deleting",
        IdDraining => "id draining",
        IntervalDriven => "interval driven",
        NotDue => "not due",
        AtCapacity => "at capacity",
    }
}

/// Per-tick admission check for cron-expression jobs.
///
/// `id_draining` is the registry's answer to [`crate::JobRegistry::is_id_draining`]
/// for this job's logical id, computed by the caller while it holds the map.
pub fn admit(job: &mut Job, id_draining: bool, now_ms: u64) -> Admission {
    if job.state == JobState::Deleting {
        return Admission::Reject(RejectReason::Deleting);
    }
    if id_draining {
        return Admission::Reject(RejectReason::IdDraining);
    }
    // Manual override: one-shot, bypasses the due check entirely.
    if job.state == JobState::Starting {
        return Admission::Admit;
    }
    if job.is_interval() {
        return Admission::Reject(RejectReason::IntervalDriven);
    }
    if !job.spec.schedule.is_due(now_ms) {
        return Admission::Reject(RejectReason::NotDue);
    }
    if job.state == JobState::Running {
        // Due again before the previous run finished. Not a
        // short-circuit: capacity decides below.
        job.overrun_count += 1;
    }
    if job.refcount >= job.spec.max_concurrency {
        return Admission::Reject(RejectReason::AtCapacity);
    }
    Admission::Admit
}

/// Per-firing admission check for interval jobs. The timer supplies the
/// cadence; only deletion and capacity can hold a firing back.
pub fn admit_interval(job: &mut Job) -> Admission {
    if job.state == JobState::Deleting {
        return Admission::Reject(RejectReason::Deleting);
    }
    if job.refcount >= job.spec.max_concurrency {
        if job.state == JobState::Running {
            job.overrun_count += 1;
        }
        return Admission::Reject(RejectReason::AtCapacity);
    }
    Admission::Admit
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
