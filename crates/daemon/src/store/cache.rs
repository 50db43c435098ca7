// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL cache over a [`JobStore`].
//!
//! The control plane's `flush` action invalidates the cache so an edit
//! lands on the very next tick instead of waiting out the TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mn_core::{Fingerprint, Job};
use parking_lot::Mutex;

use super::{JobStore, StoreError};

struct Cached<T> {
    fetched_at: Instant,
    value: T,
}

pub struct CachedStore<S> {
    inner: S,
    ttl: Duration,
    jobs: Mutex<Option<Cached<HashMap<Fingerprint, Job>>>>,
    tags: Mutex<Option<Cached<HashMap<i64, String>>>>,
}

impl<S> CachedStore<S> {
    /// A zero TTL disables caching entirely.
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self { inner, ttl, jobs: Mutex::new(None), tags: Mutex::new(None) }
    }

    fn fresh<T: Clone>(&self, slot: &Mutex<Option<Cached<T>>>) -> Option<T> {
        let guard = slot.lock();
        match guard.as_ref() {
            Some(cached) if cached.fetched_at.elapsed() < self.ttl => Some(cached.value.clone()),
            _ => None,
        }
    }

    fn fill<T>(&self, slot: &Mutex<Option<Cached<T>>>, value: &T)
    where
        T: Clone,
    {
        *slot.lock() = Some(Cached { fetched_at: Instant::now(), value: value.clone() });
    }
}

#[async_trait]
impl<S: JobStore> JobStore for CachedStore<S> {
    async fn fetch_jobs(&self) -> Result<HashMap<Fingerprint, Job>, StoreError> {
        if let Some(jobs) = self.fresh(&self.jobs) {
            return Ok(jobs);
        }
        // The lock is never held across the fetch.
        let jobs = self.inner.fetch_jobs().await?;
        self.fill(&self.jobs, &jobs);
        Ok(jobs)
    }

    async fn fetch_tags(&self) -> Result<HashMap<i64, String>, StoreError> {
        if let Some(tags) = self.fresh(&self.tags) {
            return Ok(tags);
        }
        let tags = self.inner.fetch_tags().await?;
        self.fill(&self.tags, &tags);
        Ok(tags)
    }

    fn flush(&self) {
        *self.jobs.lock() = None;
        *self.tags.lock() = None;
        self.inner.flush();
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
