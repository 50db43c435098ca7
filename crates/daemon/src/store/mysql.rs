// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MySQL-backed job store.
//!
//! Reads the `scheduler_jobs`, `scheduler_vars`, and `scheduler_tags`
//! tables. Rows with an unparseable schedule are skipped with a warning
//! rather than failing the whole fetch.

use std::collections::HashMap;

use async_trait::async_trait;
use mn_core::{vars, Fingerprint, Job, JobSpec, Schedule};
use sqlx::mysql::MySqlPool;
use tracing::warn;

use super::{JobStore, StoreError};

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: i64,
    name: String,
    command: String,
    cron: String,
    output: Option<String>,
    stderr: Option<String>,
    max_concurrence: i64,
    tag_id: i64,
    server_id: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct VarRow {
    name: String,
    value: String,
}

#[derive(Debug, sqlx::FromRow)]
struct TagRow {
    id: i64,
    name: String,
}

pub struct MySqlStore {
    pool: MySqlPool,
    server_id: i64,
    /// Scope key for the variable table; variables are shared across
    /// servers under one scope id.
    var_scope: i64,
}

impl MySqlStore {
    pub async fn connect(url: &str, server_id: i64, var_scope: i64) -> Result<Self, StoreError> {
        let pool = MySqlPool::connect(url).await?;
        Ok(Self { pool, server_id, var_scope })
    }

    /// Fetch the `{name} → value` substitution table.
    async fn fetch_vars(&self) -> Result<HashMap<String, String>, StoreError> {
        let rows = sqlx::query_as::<_, VarRow>(
            "SELECT name, value FROM scheduler_vars WHERE server_id = ?",
        )
        .bind(self.var_scope)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| (r.name, r.value)).collect())
    }
}

#[async_trait]
impl JobStore for MySqlStore {
    async fn fetch_jobs(&self) -> Result<HashMap<Fingerprint, Job>, StoreError> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT id, name, command, cron, output, stderr, max_concurrence, tag_id, server_id \
             FROM scheduler_jobs WHERE server_id = ? AND status = 1",
        )
        .bind(self.server_id)
        .fetch_all(&self.pool)
        .await?;
        let table = self.fetch_vars().await?;

        let mut jobs = HashMap::with_capacity(rows.len());
        for row in rows {
            let schedule = match Schedule::parse(&row.cron) {
                Ok(schedule) => schedule,
                Err(e) => {
                    warn!(id = row.id, name = %row.name, "skipping job with bad schedule: {e}");
                    continue;
                }
            };
            let name = row.name.clone();
            let spec = JobSpec {
                id: row.id,
                name: row.name,
                command: vars::substitute(&row.command, &table),
                schedule,
                output_path: row.output.unwrap_or_default(),
                error_path: row.stderr.unwrap_or_default(),
                max_concurrency: u32::try_from(row.max_concurrence).unwrap_or(1).max(1),
                tag_id: row.tag_id,
                server_id: row.server_id,
            };
            let job = Job::from_spec(spec)
                .map_err(|source| StoreError::Fingerprint { id: row.id, name, source })?;
            jobs.insert(job.fingerprint.clone(), job);
        }
        Ok(jobs)
    }

    async fn fetch_tags(&self) -> Result<HashMap<i64, String>, StoreError> {
        let rows = sqlx::query_as::<_, TagRow>("SELECT id, name FROM scheduler_tags")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| (r.id, r.name)).collect())
    }
}
