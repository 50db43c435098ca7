// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The metronome daemon: periodically reloads job definitions from the
//! database, reconciles them into the resident job map, admits and
//! supervises executions, and serves a minimal HTTP control plane.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod control;
pub mod engine;
pub mod http;
pub mod lifecycle;
pub mod listener;
pub mod store;
