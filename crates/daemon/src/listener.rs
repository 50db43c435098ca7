// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for the HTTP control plane.
//!
//! Accepts TCP connections and serves the job listing, per-job log
//! tails, and a daemon status summary. Connections are handled in
//! spawned tasks so a slow client never blocks the scheduler loop.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use mn_core::{Clock, Job};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::control::{Action, Controller};
use crate::engine::Engine;
use crate::http::{request, response};
use crate::store::JobStore;

/// Cap on one request head; anything longer is dropped.
const MAX_REQUEST_BYTES: usize = 8 * 1024;
/// Log tail size served by `/logs`.
const LOG_TAIL_BYTES: u64 = 64 * 1024;

/// Shared daemon context for all request handlers.
pub struct ListenCtx<C: Clock> {
    pub engine: Arc<Engine<C>>,
    pub controller: Controller<C>,
    pub store: Arc<dyn JobStore>,
    pub server_id: i64,
    /// Honor client keep-alive requests.
    pub keepalive: bool,
    pub started_at_ms: u64,
}

pub struct Listener<C: Clock> {
    tcp: TcpListener,
    ctx: Arc<ListenCtx<C>>,
}

impl<C: Clock + 'static> Listener<C> {
    pub fn new(tcp: TcpListener, ctx: Arc<ListenCtx<C>>) -> Self {
        Self { tcp, ctx }
    }

    /// Accept connections until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("listener stopped");
                    return;
                }
                accepted = self.tcp.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted connection");
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, &ctx).await {
                                debug!("connection closed: {e}");
                            }
                        });
                    }
                    Err(e) => error!("accept error: {e}"),
                },
            }
        }
    }
}

async fn handle_connection<C: Clock + 'static>(
    mut stream: TcpStream,
    ctx: &ListenCtx<C>,
) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(1024);
    loop {
        // Read one request head.
        let head_end = loop {
            if let Some(pos) = find_head_end(&buf) {
                break pos;
            }
            if buf.len() >= MAX_REQUEST_BYTES {
                warn!("request head exceeds {MAX_REQUEST_BYTES} bytes, dropping connection");
                return Ok(());
            }
            let mut chunk = [0u8; 1024];
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        buf.drain(..head_end);

        let request = match request::Request::parse(&head) {
            Ok(request) => request,
            Err(e) => {
                debug!("unparseable request: {e}");
                stream.write_all(response::not_found(false).as_bytes()).await?;
                return Ok(());
            }
        };

        let keep_alive = ctx.keepalive && request.keep_alive();
        let body = route(&request, keep_alive, ctx).await;
        stream.write_all(body.as_bytes()).await?;

        if !keep_alive {
            return Ok(());
        }
    }
}

/// Byte offset just past the `\r\n\r\n` head terminator.
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

async fn route<C: Clock + 'static>(
    request: &request::Request,
    keep_alive: bool,
    ctx: &ListenCtx<C>,
) -> String {
    if request.method != "GET" {
        return response::not_found(keep_alive);
    }
    match request.path.as_str() {
        "/" | "/index.php" => listing(request, keep_alive, ctx).await,
        "/index.html" => response::moved("/", keep_alive),
        "/logs" => logs(request, keep_alive, ctx),
        "/status" => status(keep_alive, ctx),
        _ => response::not_found(keep_alive),
    }
}

/// The job listing: applies any requested action first, then renders
/// the (optionally filtered) resident job set.
async fn listing<C: Clock + 'static>(
    request: &request::Request,
    keep_alive: bool,
    ctx: &ListenCtx<C>,
) -> String {
    let message = request
        .param("action")
        .and_then(Action::parse)
        .map(|action| ctx.controller.apply(action, request.param("md5")));

    let tag_filter = request.param("tagid").and_then(|v| v.parse::<i64>().ok());
    let id_filter = request.param("id").and_then(|v| v.parse::<i64>().ok());

    let mut jobs: Vec<Job> = {
        let registry = ctx.engine.registry();
        let jobs = registry.lock();
        jobs.jobs()
            .filter(|j| tag_filter.is_none_or(|t| j.spec.tag_id == t))
            .filter(|j| id_filter.is_none_or(|id| j.spec.id == id))
            .cloned()
            .collect()
    };
    jobs.sort_by(|a, b| a.spec.id.cmp(&b.spec.id).then(a.fingerprint.as_str().cmp(b.fingerprint.as_str())));

    let tags = ctx.store.fetch_tags().await.unwrap_or_default();
    let body = json!({
        "server_id": ctx.server_id,
        "message": message,
        "tags": tags,
        "jobs": jobs,
    });
    response::ok("application/json", &body.to_string(), keep_alive)
}

/// Tail of a job's stdout (`type=1`) or stderr (`type=2`) sink.
fn logs<C: Clock + 'static>(
    request: &request::Request,
    keep_alive: bool,
    ctx: &ListenCtx<C>,
) -> String {
    let Some(fingerprint) = request.param("md5") else {
        return response::not_found(keep_alive);
    };
    let stderr = request.param("type") == Some("2");

    let path = {
        let registry = ctx.engine.registry();
        let jobs = registry.lock();
        match jobs.get(fingerprint) {
            Some(job) => {
                let path = if stderr { &job.spec.error_path } else { &job.spec.output_path };
                path.clone()
            }
            None => return response::not_found(keep_alive),
        }
    };
    if path.is_empty() {
        return response::not_found(keep_alive);
    }

    let modified = std::fs::metadata(&path).ok().and_then(|m| m.modified().ok());
    if let (Some(modified), Some(since)) = (modified, request.headers.get("if-modified-since")) {
        if unchanged_since(modified, since) {
            return response::not_modified(keep_alive);
        }
    }

    match tail_file(&path, LOG_TAIL_BYTES) {
        Ok(tail) => match modified.and_then(http_date) {
            Some(last_modified) => {
                response::ok_with_last_modified("text/plain", &tail, &last_modified, keep_alive)
            }
            None => response::ok("text/plain", &tail, keep_alive),
        },
        Err(e) => {
            debug!(%path, "log tail failed: {e}");
            response::not_found(keep_alive)
        }
    }
}

/// IMF-fixdate for a filesystem timestamp, at second granularity.
fn http_date(t: std::time::SystemTime) -> Option<String> {
    let secs = t.duration_since(std::time::UNIX_EPOCH).ok()?.as_secs();
    let dt = Utc.timestamp_opt(secs as i64, 0).single()?;
    Some(dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

/// Whether the sink has not changed since the client's validator.
/// Unparseable validators are treated as stale.
fn unchanged_since(modified: std::time::SystemTime, since: &str) -> bool {
    let Ok(since) = DateTime::parse_from_rfc2822(since) else {
        return false;
    };
    let secs = modified
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    secs <= since.timestamp()
}

fn status<C: Clock + 'static>(keep_alive: bool, ctx: &ListenCtx<C>) -> String {
    let (job_count, running, stopped) = {
        let registry = ctx.engine.registry();
        let jobs = registry.lock();
        (
            jobs.len(),
            jobs.jobs().map(|j| j.refcount as u64).sum::<u64>(),
            jobs.jobs().filter(|j| j.state.is_stopped_family()).count(),
        )
    };
    let body = json!({
        "server_id": ctx.server_id,
        "started_at_ms": ctx.started_at_ms,
        "jobs": job_count,
        "running": running,
        "stopped": stopped,
        "timers": ctx.engine.timers().len(),
        "out_of_window": ctx.engine.out_of_window(),
    });
    response::ok("application/json", &body.to_string(), keep_alive)
}

/// Read at most `max` bytes from the end of a file.
fn tail_file(path: &str, max: u64) -> std::io::Result<String> {
    use std::io::{Read, Seek, SeekFrom};

    let mut file = std::fs::File::open(path)?;
    let len = file.metadata()?.len();
    if len > max {
        // May land mid-character; the lossy conversion absorbs it.
        file.seek(SeekFrom::Start(len - max))?;
    }
    let mut out = Vec::new();
    file.take(max).read_to_end(&mut out)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
