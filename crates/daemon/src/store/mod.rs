// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definition storage: the database is the source of truth.
//!
//! The engine only reads. Definitions are fetched per tick, substituted,
//! fingerprinted, and handed to the registry for reconciliation.

mod cache;
mod mysql;

pub use cache::CachedStore;
pub use mysql::MySqlStore;

#[cfg(test)]
pub mod fixture;

use std::collections::HashMap;

use async_trait::async_trait;
use mn_core::{Fingerprint, Job};
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to fingerprint job {id} ({name}): {source}")]
    Fingerprint {
        id: i64,
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only access to job definitions and their lookup tables.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch the enabled job set for this daemon's server id, keyed by
    /// fingerprint. Commands come back with variables substituted.
    async fn fetch_jobs(&self) -> Result<HashMap<Fingerprint, Job>, StoreError>;

    /// Fetch the `tag id → tag name` table.
    async fn fetch_tags(&self) -> Result<HashMap<i64, String>, StoreError>;

    /// Drop any cached result so the next fetch hits the database.
    fn flush(&self) {}
}
