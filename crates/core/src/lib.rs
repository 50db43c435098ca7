// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core domain logic for the metronome scheduling daemon.
//!
//! Pure data types and decisions, no I/O: the job model with
//! content-addressed identity, the cron/interval schedule variants, the
//! reconciler that diffs the resident job set against a fresh fetch, and
//! the admission controller that bounds concurrent executions per job.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod admission;
pub mod clock;
pub mod job;
mod macros;
pub mod registry;
pub mod schedule;
pub mod state;
pub mod vars;

pub use admission::{admit, admit_interval, Admission, RejectReason};
pub use clock::{Clock, FakeClock, SystemClock};
pub use job::{Fingerprint, Job, JobSpec};
pub use registry::{JobRegistry, ReconcileOutcome};
pub use schedule::{Schedule, ScheduleError};
pub use state::JobState;
