// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a job.
///
/// Transitions are driven by the process supervisor (spawn/exit) and the
/// control surface (manual start/stop). The reconciler only ever marks a
/// job `Deleting` or removes it outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Newly loaded, never run.
    Waiting,
    /// Externally requested start; bypasses the cron-due check once.
    Starting,
    /// A supervised process is executing.
    Running,
    /// Last run exited cleanly (code 0).
    Stopped,
    /// Spawn succeeded but the process was already dead on first probe.
    Backoff,
    /// Externally requested stop in flight; cleared when the exit is observed.
    Stopping,
    /// Last run exited with a non-zero code.
    Unknown,
    /// Spawn itself failed (command not found, resource exhaustion).
    Fatal,
    /// Removed from the source of truth; in-flight executions drain first.
    Deleting,
}

impl JobState {
    /// States in which a manual `start` request is a no-op.
    pub fn is_running_family(self) -> bool {
        matches!(self, JobState::Starting | JobState::Running | JobState::Deleting)
    }

    /// States in which no execution is in flight.
    pub fn is_stopped_family(self) -> bool {
        matches!(
            self,
            JobState::Stopped | JobState::Backoff | JobState::Unknown | JobState::Fatal
        )
    }
}

crate::simple_display! {
    JobState {
        Waiting => "waiting",
        Starting => "starting",
        Running => "running",
        Stopped => "stopped",
        Backoff => "backoff",
        Stopping => "stopping",
        Unknown => "unknown",
        Fatal => "fatal",
        Deleting => "deleting",
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
