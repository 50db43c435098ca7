// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mn_core::{Fingerprint, Job};
use parking_lot::Mutex;

use super::{JobStore, StoreError};

#[derive(Default)]
pub struct FixtureStore {
    jobs: Mutex<HashMap<Fingerprint, Job>>,
    tags: Mutex<HashMap<i64, String>>,
    fail_fetch: Mutex<bool>,
    fetches: AtomicUsize,
    flushes: AtomicUsize,
}

impl FixtureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_jobs(&self, jobs: Vec<Job>) {
        *self.jobs.lock() = jobs.into_iter().map(|j| (j.fingerprint.clone(), j)).collect();
    }

    pub fn set_tags(&self, tags: HashMap<i64, String>) {
        *self.tags.lock() = tags;
    }

    pub fn fail_next_fetch(&self, fail: bool) {
        *self.fail_fetch.lock() = fail;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStore for FixtureStore {
    async fn fetch_jobs(&self) -> Result<HashMap<Fingerprint, Job>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if *self.fail_fetch.lock() {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(self.jobs.lock().clone())
    }

    async fn fetch_tags(&self) -> Result<HashMap<i64, String>, StoreError> {
        Ok(self.tags.lock().clone())
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}
