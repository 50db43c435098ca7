// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: TOML file plus environment overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use std::time::Duration;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("failed to parse config {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("no port configured for server id {0}")]
    UnknownServerId(i64),
    #[error("database.url is required")]
    MissingDatabaseUrl,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Scope key for the variable table fetch.
    #[serde(default)]
    pub var_scope: i64,
    /// Seconds a fetched job set stays cached; 0 disables caching.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    120
}

/// Raw TOML shape.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    database: DatabaseConfig,
    /// `server id → control port` table; the daemon serves one id.
    #[serde(default)]
    server_ports: std::collections::HashMap<String, u16>,
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_tick_secs")]
    tick_secs: u64,
    #[serde(default)]
    keepalive: bool,
    pidfile: Option<PathBuf>,
    logfile: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_tick_secs() -> u64 {
    60
}

/// Resolved daemon configuration for one server id.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_id: i64,
    pub database: DatabaseConfig,
    pub host: String,
    pub port: u16,
    /// Scheduler loop target period (spec default 60s).
    pub tick: Duration,
    pub keepalive: bool,
    pub pidfile: PathBuf,
    pub logfile: PathBuf,
}

impl Config {
    /// Load the config file and resolve it for `server_id`.
    ///
    /// Pidfile/logfile defaults carry the server id so multiple daemons
    /// can share a host.
    pub fn load(path: &Path, server_id: i64) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let file: ConfigFile =
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;

        if file.database.url.is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        let port = file
            .server_ports
            .get(&server_id.to_string())
            .copied()
            .ok_or(ConfigError::UnknownServerId(server_id))?;

        let pidfile = file
            .pidfile
            .unwrap_or_else(|| PathBuf::from(format!("/var/run/metronome{server_id}.pid")));
        let logfile = file
            .logfile
            .unwrap_or_else(|| PathBuf::from(format!("/var/log/metronome{server_id}.log")));

        Ok(Self {
            server_id,
            database: file.database,
            host: file.host,
            port,
            tick: Duration::from_secs(file.tick_secs.max(1)),
            keepalive: file.keepalive,
            pidfile: substitute_server_id(pidfile, server_id),
            logfile: substitute_server_id(logfile, server_id),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Replace a `{id}` marker in configured paths, matching the config
/// file convention for per-server pidfiles and logfiles.
fn substitute_server_id(path: PathBuf, server_id: i64) -> PathBuf {
    match path.to_str() {
        Some(s) if s.contains("{id}") => PathBuf::from(s.replace("{id}", &server_id.to_string())),
        _ => path,
    }
}

/// Config file path: `MN_CONFIG` or the conventional /etc location.
pub fn config_path() -> PathBuf {
    std::env::var("MN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/etc/metronome/metronome.toml"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
