// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler loop: fetch, reconcile, admit, dispatch.
//!
//! One tick per minute by default. Cron jobs are admitted here against
//! the minute grid; interval jobs run off dedicated timer tasks and are
//! only reconciled here.

pub mod supervisor;
pub mod timers;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mn_core::{admit, Admission, Clock, Fingerprint, JobRegistry, JobState};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::store::JobStore;
use timers::TimerRegistry;

pub struct Engine<C: Clock> {
    registry: Arc<Mutex<JobRegistry>>,
    store: Arc<dyn JobStore>,
    clock: C,
    timers: Arc<TimerRegistry>,
    tick_period: Duration,
    /// Ticks whose work ran longer than the tick period.
    out_of_window: AtomicU32,
}

impl<C: Clock + 'static> Engine<C> {
    pub fn new(store: Arc<dyn JobStore>, clock: C, tick_period: Duration) -> Self {
        Self {
            registry: Arc::new(Mutex::new(JobRegistry::new())),
            store,
            clock,
            timers: Arc::new(TimerRegistry::new()),
            tick_period,
            out_of_window: AtomicU32::new(0),
        }
    }

    /// Shared handle to the resident job map, for the control plane.
    pub fn registry(&self) -> Arc<Mutex<JobRegistry>> {
        Arc::clone(&self.registry)
    }

    pub fn timers(&self) -> Arc<TimerRegistry> {
        Arc::clone(&self.timers)
    }

    pub fn out_of_window(&self) -> u32 {
        self.out_of_window.load(Ordering::Relaxed)
    }

    /// One scheduler pass. A fetch failure skips the pass entirely; the
    /// resident map keeps scheduling from its last good state.
    pub async fn tick(&self) {
        let fetched = match self.store.fetch_jobs().await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("job fetch failed, keeping previous job set: {e}");
                return;
            }
        };

        let outcome = self.registry.lock().reconcile(fetched);
        if !outcome.added.is_empty()
            || !outcome.marked_deleting.is_empty()
            || !outcome.removed.is_empty()
        {
            info!(
                added = outcome.added.len(),
                deleting = outcome.marked_deleting.len(),
                removed = outcome.removed.len(),
                "reconciled job set"
            );
        }
        for id in outcome.cancel_timers {
            self.timers.cancel(id);
        }

        let now = self.clock.epoch_ms();
        let mut admitted: Vec<Fingerprint> = Vec::new();
        let mut new_timers: Vec<(Fingerprint, Duration, CancellationToken)> = Vec::new();
        {
            let mut jobs = self.registry.lock();
            let draining: HashSet<i64> = jobs
                .jobs()
                .filter(|j| j.state == JobState::Deleting)
                .map(|j| j.spec.id)
                .collect();

            for job in jobs.jobs_mut() {
                if job.is_interval()
                    && job.state != JobState::Deleting
                    && !self.timers.contains(job.spec.id)
                {
                    let token = self.timers.register(job.spec.id);
                    if let Some(period) = job.spec.schedule.period() {
                        new_timers.push((job.fingerprint.clone(), period, token));
                    }
                }

                let id_draining =
                    job.state != JobState::Deleting && draining.contains(&job.spec.id);
                if admit(job, id_draining, now) == Admission::Admit {
                    admitted.push(job.fingerprint.clone());
                }
            }
        }

        for (fingerprint, period, token) in new_timers {
            timers::spawn_interval(
                Arc::clone(&self.registry),
                self.clock.clone(),
                fingerprint,
                period,
                token,
            );
        }
        for fingerprint in admitted {
            tokio::spawn(supervisor::execute(
                Arc::clone(&self.registry),
                self.clock.clone(),
                fingerprint,
            ));
        }
    }

    /// Drive ticks until `shutdown` fires. A tick that overruns the
    /// period is counted and the next one starts immediately.
    pub async fn run(&self, shutdown: CancellationToken) {
        loop {
            let started = std::time::Instant::now();
            self.tick().await;

            let elapsed = started.elapsed();
            if elapsed >= self.tick_period {
                let total = self.out_of_window.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(?elapsed, total, "tick overran its period");
                if shutdown.is_cancelled() {
                    break;
                }
                continue;
            }

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.tick_period - elapsed) => {}
            }
        }
        self.timers.cancel_all();
        info!("scheduler loop stopped");
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
