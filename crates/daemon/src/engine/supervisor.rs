// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process supervision for a single admitted execution.
//!
//! One task per execution: spawn under `sh -c`, commit the start into
//! the registry, then suspend on the child until it exits. The registry
//! lock is never held across an await.

use std::process::Stdio;
use std::sync::Arc;

use mn_core::{Clock, Fingerprint, JobRegistry, JobState};
use parking_lot::Mutex;
use tokio::process::Command;
use tracing::{debug, warn};

/// Run one execution of the job identified by `fingerprint` to completion.
///
/// Re-validates under the lock before spawning and again before
/// committing the start, so a job deleted or saturated between admission
/// and spawn never leaks a process into the books.
pub async fn execute<C: Clock>(
    registry: Arc<Mutex<JobRegistry>>,
    clock: C,
    fingerprint: Fingerprint,
) {
    execute_with(registry, clock, fingerprint, "sh").await;
}

/// [`execute`] with the shell binary injectable, so tests can force an
/// OS-level spawn failure.
async fn execute_with<C: Clock>(
    registry: Arc<Mutex<JobRegistry>>,
    clock: C,
    fingerprint: Fingerprint,
    shell: &str,
) {
    // Guard phase: confirm the job is still spawnable and copy what the
    // spawn needs out of the lock. Registry state is untouched until the
    // commit; `Starting` stays reserved for the control surface.
    let (command, output_path, error_path) = {
        let jobs = registry.lock();
        let Some(job) = jobs.get(&fingerprint) else {
            return;
        };
        if job.state == JobState::Deleting || job.refcount >= job.spec.max_concurrency {
            return;
        }
        (job.spec.command.clone(), job.spec.output_path.clone(), job.spec.error_path.clone())
    };

    let mut child = match Command::new(shell)
        .arg("-c")
        .arg(&command)
        .stdin(Stdio::null())
        .stdout(sink(&output_path))
        .stderr(sink(&error_path))
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            warn!(fingerprint = %fingerprint.short(8), %command, "spawn failed: {e}");
            if let Some(job) = registry.lock().get_mut(&fingerprint) {
                job.note_spawn_outcome(JobState::Fatal);
            }
            return;
        }
    };

    // A child that is already gone this early never ran usefully.
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(fingerprint = %fingerprint.short(8), ?status, "exited immediately after spawn");
            if let Some(job) = registry.lock().get_mut(&fingerprint) {
                job.note_spawn_outcome(JobState::Backoff);
            }
            return;
        }
        Ok(None) => {}
        Err(e) => {
            warn!(fingerprint = %fingerprint.short(8), "failed to probe child: {e}");
            if let Some(job) = registry.lock().get_mut(&fingerprint) {
                job.note_spawn_outcome(JobState::Fatal);
            }
            return;
        }
    }

    // Commit phase: the job may have been saturated by a racing task
    // between the guard and the spawn.
    let pid = child.id().unwrap_or(0);
    let committed = {
        let mut jobs = registry.lock();
        match jobs.get_mut(&fingerprint) {
            Some(job) if job.refcount < job.spec.max_concurrency => {
                job.note_started(pid, clock.epoch_ms());
                true
            }
            Some(_) => {
                warn!(fingerprint = %fingerprint.short(8), "saturated before commit, killing child");
                false
            }
            None => false,
        }
    };
    if !committed {
        let _ = child.kill().await;
        return;
    }
    debug!(fingerprint = %fingerprint.short(8), pid, "started");

    let status = child.wait().await;

    let mut jobs = registry.lock();
    if let Some(job) = jobs.get_mut(&fingerprint) {
        match status {
            Ok(status) => {
                debug!(fingerprint = %fingerprint.short(8), pid, ?status, "exited");
                job.note_exited(status.code(), clock.epoch_ms());
            }
            Err(e) => {
                warn!(fingerprint = %fingerprint.short(8), pid, "wait failed: {e}");
                job.note_exited(None, clock.epoch_ms());
            }
        }
    }
}

/// Append sink for a configured output path; empty paths discard.
fn sink(path: &str) -> Stdio {
    if path.is_empty() {
        return Stdio::null();
    }
    match std::fs::OpenOptions::new().append(true).create(true).open(path) {
        Ok(file) => Stdio::from(file),
        Err(e) => {
            warn!(%path, "failed to open output sink, discarding: {e}");
            Stdio::null()
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
