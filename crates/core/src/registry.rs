// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The resident job map and diff-based reconciliation.
//!
//! Reconciliation diffs a freshly fetched job set against the resident
//! set. Added fingerprints are inserted `Waiting`; disappeared
//! fingerprints are removed immediately when idle, or marked `Deleting`
//! and drained when executions are still in flight. Interval jobs are
//! never drained: their timer is cancelled synchronously and the job is
//! dropped.

use crate::job::{Fingerprint, Job};
use crate::state::JobState;
use std::collections::HashMap;

/// What one reconciliation pass changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Fingerprints inserted this pass (state `Waiting`).
    pub added: Vec<Fingerprint>,
    /// Fingerprints newly marked `Deleting` (still draining).
    pub marked_deleting: Vec<Fingerprint>,
    /// Fingerprints physically removed this pass.
    pub removed: Vec<Fingerprint>,
    /// Logical ids of removed interval jobs whose timers must be
    /// cancelled now.
    pub cancel_timers: Vec<i64>,
}

/// The resident `fingerprint → Job` map.
///
/// Shared between the scheduler loop, the process supervisor, and the
/// control surface; each field has a single writer (see the supervisor
/// for the refcount/state discipline).
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: HashMap<Fingerprint, Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fresh fetch into the resident map.
    ///
    /// Jobs present in both sets are left untouched, including jobs
    /// already `Deleting` from a previous cycle: those re-enter the
    /// removal pass every cycle and are dropped once drained.
    pub fn reconcile(&mut self, fetched: HashMap<Fingerprint, Job>) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        let stale: Vec<Fingerprint> = self
            .jobs
            .keys()
            .filter(|fp| !fetched.contains_key(*fp))
            .cloned()
            .collect();

        for fp in stale {
            let (is_interval, refcount, state, id) = match self.jobs.get(&fp) {
                Some(j) => (j.is_interval(), j.refcount, j.state, j.spec.id),
                None => continue,
            };
            if is_interval {
                // No grace period: the timer stops firing now.
                outcome.cancel_timers.push(id);
                self.jobs.remove(&fp);
                outcome.removed.push(fp);
            } else if refcount > 0 {
                if state != JobState::Deleting {
                    if let Some(j) = self.jobs.get_mut(&fp) {
                        j.state = JobState::Deleting;
                    }
                    outcome.marked_deleting.push(fp);
                }
            } else {
                self.jobs.remove(&fp);
                outcome.removed.push(fp);
            }
        }

        for (fp, mut job) in fetched {
            if self.jobs.contains_key(&fp) {
                continue;
            }
            job.state = JobState::Waiting;
            outcome.added.push(fp.clone());
            self.jobs.insert(fp, job);
        }

        outcome
    }

    /// Whether a logical id still has a draining `Deleting` sibling.
    ///
    /// While an edited definition's predecessor drains, the successor
    /// is held back so one id never runs under two fingerprints.
    pub fn is_id_draining(&self, id: i64) -> bool {
        self.jobs
            .values()
            .any(|j| j.spec.id == id && j.state == JobState::Deleting)
    }

    pub fn get(&self, fingerprint: impl AsRef<str>) -> Option<&Job> {
        self.jobs.get(fingerprint.as_ref())
    }

    pub fn get_mut(&mut self, fingerprint: impl AsRef<str>) -> Option<&mut Job> {
        self.jobs.get_mut(fingerprint.as_ref())
    }

    pub fn insert(&mut self, job: Job) {
        self.jobs.insert(job.fingerprint.clone(), job);
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn jobs_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.values_mut()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
