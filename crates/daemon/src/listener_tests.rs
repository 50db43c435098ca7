// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::fixture::FixtureStore;
use mn_core::{FakeClock, JobSpec, JobState, Schedule};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

// Never due during tests, so the listing stays inert.
const NEVER_DUE: &str = "0 0 1 1 *";

fn job(id: i64, name: &str, tag_id: i64) -> Job {
    Job::from_spec(
        JobSpec::builder()
            .id(id)
            .name(name)
            .tag_id(tag_id)
            .schedule(Schedule::Cron(NEVER_DUE.to_string()))
            .build(),
    )
    .unwrap()
}

async fn start_listener(jobs: Vec<Job>) -> (SocketAddr, Arc<ListenCtx<FakeClock>>, CancellationToken) {
    let store = Arc::new(FixtureStore::new());
    store.set_jobs(jobs);
    let clock = FakeClock::default();
    let engine = Arc::new(Engine::new(
        Arc::clone(&store) as Arc<dyn JobStore>,
        clock.clone(),
        Duration::from_secs(60),
    ));
    engine.tick().await;

    let controller = Controller::new(
        engine.registry(),
        engine.timers(),
        Arc::clone(&store) as Arc<dyn JobStore>,
        PathBuf::from("/nonexistent/mn.log"),
        clock,
    );
    let ctx = Arc::new(ListenCtx {
        engine,
        controller,
        store,
        server_id: 1,
        keepalive: false,
        started_at_ms: 0,
    });

    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    tokio::spawn(Listener::new(tcp, Arc::clone(&ctx)).run(shutdown.clone()));
    (addr, ctx, shutdown)
}

async fn get(addr: SocketAddr, target: &str) -> String {
    get_with_header(addr, target, "").await
}

/// `header`, when present, must carry its own trailing `\r\n`.
async fn get_with_header(addr: SocketAddr, target: &str, header: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(format!("GET {target} HTTP/1.1\r\nHost: test\r\n{header}\r\n").as_bytes())
        .await
        .unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8_lossy(&out).into_owned()
}

#[tokio::test]
async fn listing_serves_resident_jobs() {
    let (addr, _ctx, shutdown) = start_listener(vec![job(1, "backup", 0)]).await;

    let response = get(addr, "/").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.contains("\"backup\""));
    assert!(response.contains("\"server_id\":1"));
    shutdown.cancel();
}

#[tokio::test]
async fn listing_filters_by_tag() {
    let (addr, _ctx, shutdown) =
        start_listener(vec![job(1, "tagged", 5), job(2, "untagged", 0)]).await;

    let response = get(addr, "/?tagid=5").await;
    assert!(response.contains("\"tagged\""));
    assert!(!response.contains("\"untagged\""));
    shutdown.cancel();
}

#[tokio::test]
async fn listing_filters_by_id() {
    let (addr, _ctx, shutdown) = start_listener(vec![job(1, "one", 0), job(2, "two", 0)]).await;

    let response = get(addr, "/?id=2").await;
    assert!(!response.contains("\"one\""));
    assert!(response.contains("\"two\""));
    shutdown.cancel();
}

#[tokio::test]
async fn start_action_applied_through_listing() {
    let the_job = job(1, "target", 0);
    let fp = the_job.fingerprint.clone();
    let (addr, ctx, shutdown) = start_listener(vec![the_job]).await;

    let response = get(addr, &format!("/?action=start&md5={fp}")).await;
    assert!(response.contains("\"message\":\"start 1 at "), "{response}");

    let registry = ctx.engine.registry();
    assert_eq!(registry.lock().get(&fp).unwrap().state, JobState::Starting);
    shutdown.cancel();
}

#[tokio::test]
async fn logs_route_tails_output_sink() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("job.out");
    std::fs::write(&out, "line one\nline two\n").unwrap();
    let the_job = Job::from_spec(
        JobSpec::builder()
            .output_path(out.to_str().unwrap())
            .schedule(Schedule::Cron(NEVER_DUE.to_string()))
            .build(),
    )
    .unwrap();
    let fp = the_job.fingerprint.clone();
    let (addr, _ctx, shutdown) = start_listener(vec![the_job]).await;

    let response = get(addr, &format!("/logs?md5={fp}&type=1")).await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.contains("Content-Type: text/plain"));
    assert!(response.contains("Last-Modified: "));
    assert!(response.ends_with("line one\nline two\n"));
    shutdown.cancel();
}

#[tokio::test]
async fn logs_route_honors_if_modified_since() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("job.out");
    std::fs::write(&out, "stale tail\n").unwrap();
    let the_job = Job::from_spec(
        JobSpec::builder()
            .output_path(out.to_str().unwrap())
            .schedule(Schedule::Cron(NEVER_DUE.to_string()))
            .build(),
    )
    .unwrap();
    let fp = the_job.fingerprint.clone();
    let (addr, _ctx, shutdown) = start_listener(vec![the_job]).await;

    let target = format!("/logs?md5={fp}&type=1");
    let fresh = get_with_header(
        addr,
        &target,
        "If-Modified-Since: Thu, 01 Jan 2037 00:00:00 GMT\r\n",
    )
    .await;
    assert!(fresh.starts_with("HTTP/1.1 304 Not Modified\r\n"), "{fresh}");

    let stale = get_with_header(
        addr,
        &target,
        "If-Modified-Since: Thu, 01 Jan 1970 00:00:01 GMT\r\n",
    )
    .await;
    assert!(stale.starts_with("HTTP/1.1 200 OK\r\n"), "{stale}");
    assert!(stale.ends_with("stale tail\n"));
    shutdown.cancel();
}

#[tokio::test]
async fn logs_route_unknown_fingerprint_404s() {
    let (addr, _ctx, shutdown) = start_listener(vec![]).await;
    let response = get(addr, "/logs?md5=missing&type=1").await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "{response}");
    shutdown.cancel();
}

#[tokio::test]
async fn index_html_redirects() {
    let (addr, _ctx, shutdown) = start_listener(vec![]).await;
    let response = get(addr, "/index.html").await;
    assert!(response.starts_with("HTTP/1.1 301 Moved Permanently\r\n"), "{response}");
    assert!(response.contains("Location: /\r\n"));
    shutdown.cancel();
}

#[tokio::test]
async fn unknown_route_404s() {
    let (addr, _ctx, shutdown) = start_listener(vec![]).await;
    let response = get(addr, "/nope").await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "{response}");
    shutdown.cancel();
}

#[tokio::test]
async fn status_reports_counters() {
    let (addr, _ctx, shutdown) = start_listener(vec![job(1, "a", 0)]).await;
    let response = get(addr, "/status").await;
    assert!(response.contains("\"jobs\":1"));
    assert!(response.contains("\"running\":0"));
    assert!(response.contains("\"stopped\":0"));
    assert!(response.contains("\"out_of_window\":0"));
    shutdown.cancel();
}
