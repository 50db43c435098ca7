// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron/interval schedule variants and due-ness evaluation.
//!
//! The source-of-truth `cron` column is stringly typed: either a cron
//! expression or a bare number meaning "run every N milliseconds". The
//! two kinds schedule through entirely different paths (per-tick cron
//! scan vs a persistent timer), so they are a tagged variant here and
//! dispatch happens on the tag.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors from schedule parsing.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("empty schedule")]
    Empty,
    #[error("interval must be at least 1ms")]
    ZeroInterval,
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
}

/// When a job runs: a cron expression or a fixed millisecond period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Schedule {
    /// Fixed period in milliseconds, driven by a persistent timer.
    Interval(u64),
    /// Cron expression, evaluated against the wall clock each tick.
    Cron(String),
}

impl Schedule {
    /// Parse the raw `cron` column value: all-digits is an interval,
    /// anything else must be a valid cron expression.
    pub fn parse(raw: &str) -> Result<Self, ScheduleError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ScheduleError::Empty);
        }
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            let ms = raw.parse::<u64>().map_err(|e| ScheduleError::InvalidCron {
                expr: raw.to_string(),
                reason: e.to_string(),
            })?;
            if ms == 0 {
                return Err(ScheduleError::ZeroInterval);
            }
            return Ok(Schedule::Interval(ms));
        }
        // Validate eagerly so a bad expression is a fetch-time error, not
        // a job that silently never fires.
        cron_schedule(raw)?;
        Ok(Schedule::Cron(raw.to_string()))
    }

    pub fn is_interval(&self) -> bool {
        matches!(self, Schedule::Interval(_))
    }

    /// The timer period for interval schedules.
    pub fn period(&self) -> Option<Duration> {
        match self {
            Schedule::Interval(ms) => Some(Duration::from_millis(*ms)),
            Schedule::Cron(_) => None,
        }
    }

    /// Whether a cron schedule is due at the given time.
    ///
    /// Due-ness has minute granularity, so `now` is truncated to the
    /// start of its minute before the check. Interval schedules are
    /// never "due" here; their own timer admits them.
    pub fn is_due(&self, epoch_ms: u64) -> bool {
        match self {
            Schedule::Interval(_) => false,
            Schedule::Cron(expr) => match cron_schedule(expr) {
                Ok(schedule) => minute_start(epoch_ms)
                    .map(|dt| schedule.includes(dt))
                    .unwrap_or(false),
                // Unreachable for schedules built via `parse`.
                Err(_) => false,
            },
        }
    }
}

crate::simple_display! {
    Schedule {
        Interval(..) => "interval",
        Cron(..) => "cron",
    }
}

/// Build a `cron::Schedule`, accepting classic five-field expressions by
/// prepending a zero seconds field.
fn cron_schedule(expr: &str) -> Result<cron::Schedule, ScheduleError> {
    let fields = expr.split_whitespace().count();
    let normalized;
    let full = if fields == 5 {
        normalized = format!("0 {expr}");
        normalized.as_str()
    } else {
        expr
    };
    cron::Schedule::from_str(full).map_err(|e| ScheduleError::InvalidCron {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}

fn minute_start(epoch_ms: u64) -> Option<DateTime<Utc>> {
    let truncated = epoch_ms - epoch_ms % 60_000;
    Utc.timestamp_millis_opt(truncated as i64).single()
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
