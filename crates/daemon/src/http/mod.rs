// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 plumbing for the control plane.
//!
//! The surface is a handful of GET routes on a trusted network, so the
//! codec is hand-rolled: parse a request head, emit a response string.

pub mod request;
pub mod response;

pub use request::{ParseError, Request};
