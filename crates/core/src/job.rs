// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definition, runtime state, and content-addressed identity.

use crate::schedule::Schedule;
use crate::state::JobState;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

crate::define_id! {
    /// Content hash over a job's substituted definition.
    ///
    /// The resident map's key and the unit of reconciliation identity:
    /// two records are the same job instance iff fingerprints match, so
    /// any field edit yields a brand-new schedulable entity.
    pub struct Fingerprint;
}

/// Immutable job definition as fetched from the source of truth.
///
/// `command` has variable placeholders already substituted; the
/// fingerprint is computed over the substituted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Stable logical identifier from the store. Distinct from the
    /// fingerprint: one id maps to two fingerprints transiently while
    /// an edited definition supersedes its predecessor.
    pub id: i64,
    pub name: String,
    pub command: String,
    pub schedule: Schedule,
    /// Stdout sink path; empty means discard.
    pub output_path: String,
    /// Stderr sink path; empty means discard.
    pub error_path: String,
    pub max_concurrency: u32,
    pub tag_id: i64,
    pub server_id: i64,
}

impl JobSpec {
    /// Compute the content hash over the canonical JSON of this spec.
    ///
    /// Deterministic for a fixed definition: struct field order fixes
    /// the JSON key order.
    pub fn fingerprint(&self) -> Result<Fingerprint, serde_json::Error> {
        let canonical = serde_json::to_string(self)?;
        Ok(Fingerprint::new(format!("{:x}", Sha256::digest(canonical.as_bytes()))))
    }
}

/// A resident job: immutable spec plus mutable runtime state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub fingerprint: Fingerprint,
    pub spec: JobSpec,
    pub state: JobState,
    /// OS pid of the most recent execution; 0 when not running.
    pub pid: u32,
    /// In-flight executions of this fingerprint, bounded by
    /// `spec.max_concurrency`. Incremented only when a spawn is
    /// confirmed started, decremented exactly once per observed exit.
    pub refcount: u32,
    /// Times the job was found due while already at capacity.
    pub overrun_count: u32,
    pub started_at_ms: Option<u64>,
    pub ended_at_ms: Option<u64>,
}

impl Job {
    /// Create a resident job from a fetched spec. Starts `Waiting`.
    pub fn from_spec(spec: JobSpec) -> Result<Self, serde_json::Error> {
        let fingerprint = spec.fingerprint()?;
        Ok(Self {
            fingerprint,
            spec,
            state: JobState::Waiting,
            pid: 0,
            refcount: 0,
            overrun_count: 0,
            started_at_ms: None,
            ended_at_ms: None,
        })
    }

    pub fn is_interval(&self) -> bool {
        self.spec.schedule.is_interval()
    }

    /// Whether the reconciler may physically remove this job.
    pub fn is_drained(&self) -> bool {
        self.state == JobState::Deleting && self.refcount == 0
    }

    /// Record a confirmed process start. `Deleting` is preserved so the
    /// reconciler can still observe drain-to-zero.
    pub fn note_started(&mut self, pid: u32, epoch_ms: u64) {
        self.pid = pid;
        self.refcount += 1;
        self.started_at_ms = Some(epoch_ms);
        if self.state != JobState::Deleting {
            self.state = JobState::Running;
        }
    }

    /// Record an observed process exit. `Deleting` is preserved.
    pub fn note_exited(&mut self, exit_code: Option<i32>, epoch_ms: u64) {
        self.pid = 0;
        self.refcount = self.refcount.saturating_sub(1);
        self.ended_at_ms = Some(epoch_ms);
        if self.state != JobState::Deleting {
            self.state = match exit_code {
                Some(0) => JobState::Stopped,
                _ => JobState::Unknown,
            };
        }
    }

    /// Record a terminal spawn outcome (`Fatal` or `Backoff`).
    /// `Deleting` is preserved.
    pub fn note_spawn_outcome(&mut self, outcome: JobState) {
        if self.state != JobState::Deleting {
            self.state = outcome;
        }
    }
}

crate::builder! {
    pub struct JobSpecBuilder => JobSpec {
        into {
            name: String = "test-job",
            command: String = "echo hi",
            output_path: String = "",
            error_path: String = "",
        }
        set {
            id: i64 = 1,
            schedule: Schedule = Schedule::Cron("* * * * *".to_string()),
            max_concurrency: u32 = 1,
            tag_id: i64 = 0,
            server_id: i64 = 1,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
