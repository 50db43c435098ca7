// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: pidfile lock, startup, shutdown.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tracing::{info, warn};

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire pidfile lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Exclusive pidfile lock held for the daemon's lifetime.
///
/// The lock is released when this is dropped; the file itself is removed
/// by [`PidLock::release`] during orderly shutdown.
pub struct PidLock {
    path: PathBuf,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    file: File,
}

impl PidLock {
    /// Acquire the pidfile lock and record our PID.
    ///
    /// Opens without truncating so a failed acquisition never wipes the
    /// running daemon's PID.
    pub fn acquire(path: &Path) -> Result<Self, LifecycleError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

        // Truncate now that we hold the lock.
        let mut file = file;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;

        info!(pidfile = %path.display(), pid = std::process::id(), "acquired pidfile lock");
        Ok(Self { path: path.to_path_buf(), file })
    }

    /// Remove the pidfile during orderly shutdown.
    pub fn release(self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("Failed to remove pidfile: {}", e);
            }
        }
        // Lock itself is released when self.file is dropped.
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
