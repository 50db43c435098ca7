// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane actions applied to resident jobs.
//!
//! Actions arrive as query parameters on the listing page and mutate
//! in-memory state only; the database is never written. Every applied
//! action produces a one-line message echoed back on the next listing.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use mn_core::{Clock, JobRegistry, JobState};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::engine::timers::TimerRegistry;
use crate::store::JobStore;

/// Control actions accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Force-admit a job on the next tick regardless of due-ness.
    Start,
    /// SIGTERM the job's most recent process.
    Stop,
    /// Invalidate the store cache.
    Flush,
    /// Truncate the daemon log.
    ClearLog,
    /// Truncate the job's stdout sink.
    ClearOutput,
    /// Truncate the job's stderr sink.
    ClearError,
    /// Cancel a job's interval timer until the next tick re-registers it.
    ClearTimer,
}

impl Action {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "flush" => Some(Self::Flush),
            "clear" => Some(Self::ClearLog),
            "clear_1" => Some(Self::ClearOutput),
            "clear_2" => Some(Self::ClearError),
            "clearTimer" => Some(Self::ClearTimer),
            _ => None,
        }
    }
}

mn_core::simple_display! {
    Action {
        Start => "start",
        Stop => "stop",
        Flush => "flush",
        ClearLog => "clear",
        ClearOutput => "clear_1",
        ClearError => "clear_2",
        ClearTimer => "clearTimer",
    }
}

/// Applies actions against the shared scheduler state.
pub struct Controller<C: Clock> {
    registry: Arc<Mutex<JobRegistry>>,
    timers: Arc<TimerRegistry>,
    store: Arc<dyn JobStore>,
    logfile: PathBuf,
    clock: C,
}

impl<C: Clock> Controller<C> {
    pub fn new(
        registry: Arc<Mutex<JobRegistry>>,
        timers: Arc<TimerRegistry>,
        store: Arc<dyn JobStore>,
        logfile: PathBuf,
        clock: C,
    ) -> Self {
        Self { registry, timers, store, logfile, clock }
    }

    /// Apply one action, optionally addressed to the job with the given
    /// fingerprint. Returns the message to echo back.
    pub fn apply(&self, action: Action, fingerprint: Option<&str>) -> String {
        let mut message = format!("{action} {} at {}", self.job_id(fingerprint), self.timestamp());
        info!(%action, fingerprint = fingerprint.unwrap_or(""), "control action");

        match action {
            Action::Start => {
                if let Some(mut job) = self.job_mut(fingerprint) {
                    if !job.state.is_running_family() {
                        job.state = JobState::Starting;
                    }
                }
            }
            Action::Stop => {
                let target = self.job_mut(fingerprint).and_then(|job| {
                    (job.state == JobState::Running && job.pid != 0).then_some(job.pid)
                });
                if let Some(pid) = target {
                    let ok = kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok();
                    if ok {
                        // Marker until the supervisor observes the exit.
                        if let Some(mut job) = self.job_mut(fingerprint) {
                            job.state = JobState::Stopping;
                        }
                    }
                    message.push_str(&format!(" result:{}", i32::from(ok)));
                }
            }
            Action::Flush => {
                self.store.flush();
                message.push_str(" result:1");
                debug!("flushed store cache");
            }
            Action::ClearLog => {
                let logfile = self.logfile.to_string_lossy().into_owned();
                append_clear_result(&mut message, &logfile);
            }
            Action::ClearOutput => {
                if let Some(path) = self.sink_path(fingerprint, false) {
                    append_clear_result(&mut message, &path);
                }
            }
            Action::ClearError => {
                if let Some(path) = self.sink_path(fingerprint, true) {
                    append_clear_result(&mut message, &path);
                }
            }
            Action::ClearTimer => {
                if let Some(id) = self.job_mut(fingerprint).map(|job| job.spec.id) {
                    self.timers.cancel(id);
                }
            }
        }
        message
    }

    fn timestamp(&self) -> String {
        Utc.timestamp_millis_opt(self.clock.epoch_ms() as i64)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default()
    }

    fn job_id(&self, fingerprint: Option<&str>) -> String {
        fingerprint
            .and_then(|fp| self.registry.lock().get(fp).map(|j| j.spec.id.to_string()))
            .unwrap_or_default()
    }

    fn job_mut(&self, fingerprint: Option<&str>) -> Option<parking_lot::MappedMutexGuard<'_, mn_core::Job>> {
        let fp = fingerprint?;
        parking_lot::MutexGuard::try_map(self.registry.lock(), |jobs| jobs.get_mut(fp)).ok()
    }

    fn sink_path(&self, fingerprint: Option<&str>, stderr: bool) -> Option<String> {
        let fp = fingerprint?;
        let jobs = self.registry.lock();
        let job = jobs.get(fp)?;
        let path = if stderr { &job.spec.error_path } else { &job.spec.output_path };
        (!path.is_empty()).then(|| path.clone())
    }
}

/// Truncate an existing sink file and record the result.
fn append_clear_result(message: &mut String, path: &str) {
    if path.is_empty() || !std::path::Path::new(path).is_file() {
        return;
    }
    let ok = std::fs::write(path, "").is_ok();
    message.push_str(&format!(" result:{}", i32::from(ok)));
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
