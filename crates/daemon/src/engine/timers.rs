// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interval timers.
//!
//! Interval jobs never go through the per-minute due check. Each one
//! gets a dedicated timer task that fires every period and admits an
//! execution against capacity. Timers are keyed by logical job id so
//! the control plane can cancel one without knowing the fingerprint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mn_core::{admit_interval, Admission, Clock, Fingerprint, JobRegistry};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::supervisor;

/// Live interval timers, one token per registered job id.
#[derive(Default)]
pub struct TimerRegistry {
    timers: Mutex<HashMap<i64, CancellationToken>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.timers.lock().contains_key(&id)
    }

    /// Register a token for `id`, replacing (and cancelling) any
    /// previous registration.
    pub fn register(&self, id: i64) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(old) = self.timers.lock().insert(id, token.clone()) {
            old.cancel();
        }
        token
    }

    /// Cancel and forget the timer for `id`. A missing id is a no-op;
    /// the job may have been re-registered on a later tick.
    pub fn cancel(&self, id: i64) {
        if let Some(token) = self.timers.lock().remove(&id) {
            token.cancel();
            info!(id, "cancelled interval timer");
        }
    }

    pub fn cancel_all(&self) {
        for (_, token) in self.timers.lock().drain() {
            token.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.timers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.lock().is_empty()
    }
}

/// Spawn the timer task for one interval job.
///
/// The first tick of `tokio::time::interval` fires immediately; it is
/// swallowed so a freshly loaded job waits a full period before its
/// first run.
pub fn spawn_interval<C: Clock + 'static>(
    registry: Arc<Mutex<JobRegistry>>,
    clock: C,
    fingerprint: Fingerprint,
    period: Duration,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await;
        loop {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(fingerprint = %fingerprint.short(8), "interval timer stopped");
                    return;
                }
                _ = interval.tick() => {}
            }

            let admitted = {
                let mut jobs = registry.lock();
                match jobs.get_mut(&fingerprint) {
                    Some(job) => admit_interval(job) == Admission::Admit,
                    // Job left the registry without a cancel; stop firing.
                    None => return,
                }
            };
            if admitted {
                tokio::spawn(supervisor::execute(
                    Arc::clone(&registry),
                    clock.clone(),
                    fingerprint.clone(),
                ));
            }
        }
    });
}

#[cfg(test)]
#[path = "timers_tests.rs"]
mod tests;
