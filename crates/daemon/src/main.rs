// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mnd <server_id>` - the metronome scheduler daemon.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mn_core::{Clock, SystemClock};
use mn_daemon::config::{self, Config};
use mn_daemon::control::Controller;
use mn_daemon::engine::Engine;
use mn_daemon::lifecycle::PidLock;
use mn_daemon::listener::{ListenCtx, Listener};
use mn_daemon::store::{CachedStore, JobStore, MySqlStore};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}

async fn run() -> i32 {
    let Some(server_id) = std::env::args().nth(1).and_then(|arg| arg.parse::<i64>().ok()) else {
        eprintln!("usage: mnd <server_id>");
        return 3;
    };

    let config_file = config::config_path();
    let config = match Config::load(&config_file, server_id) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load {}: {e}", config_file.display());
            return 3;
        }
    };

    let _log_guard = init_tracing(&config.logfile);
    info!(
        server_id,
        addr = %config.listen_addr(),
        tick_secs = config.tick.as_secs(),
        "starting metronome daemon v{}",
        env!("CARGO_PKG_VERSION")
    );

    let pidlock = match PidLock::acquire(&config.pidfile) {
        Ok(lock) => lock,
        Err(e) => {
            error!("{e}");
            return 3;
        }
    };

    let store = match MySqlStore::connect(
        &config.database.url,
        server_id,
        config.database.var_scope,
    )
    .await
    {
        Ok(store) => store,
        Err(e) => {
            error!("database connection failed: {e}");
            pidlock.release();
            return 3;
        }
    };
    let store: Arc<dyn JobStore> = Arc::new(CachedStore::new(
        store,
        Duration::from_secs(config.database.cache_ttl_secs),
    ));

    let tcp = match TcpListener::bind(config.listen_addr()).await {
        Ok(tcp) => tcp,
        Err(e) => {
            error!(addr = %config.listen_addr(), "bind failed: {e}");
            pidlock.release();
            return 3;
        }
    };

    let clock = SystemClock;
    let engine = Arc::new(Engine::new(Arc::clone(&store), clock.clone(), config.tick));
    let controller = Controller::new(
        engine.registry(),
        engine.timers(),
        Arc::clone(&store),
        config.logfile.clone(),
        clock.clone(),
    );
    let ctx = Arc::new(ListenCtx {
        engine: Arc::clone(&engine),
        controller,
        store,
        server_id,
        keepalive: config.keepalive,
        started_at_ms: clock.epoch_ms(),
    });

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let listener_task = tokio::spawn(Listener::new(tcp, ctx).run(shutdown.clone()));
    engine.run(shutdown).await;
    let _ = listener_task.await;

    pidlock.release();
    info!("daemon exited cleanly");
    0
}

/// Route logs to the configured logfile; fall back to stderr when the
/// file location is unusable. The guard flushes buffered lines on drop.
fn init_tracing(logfile: &Path) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_env("MN_LOG").unwrap_or_else(|_| EnvFilter::new("mn_daemon=info"));

    match (logfile.parent(), logfile.file_name()) {
        (Some(dir), Some(name)) if dir.is_dir() => {
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

/// Cancel the token on SIGINT, SIGTERM, or SIGQUIT.
fn spawn_signal_handler(shutdown: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let (mut sigterm, mut sigquit) =
            match (signal(SignalKind::terminate()), signal(SignalKind::quit())) {
                (Ok(sigterm), Ok(sigquit)) => (sigterm, sigquit),
                _ => {
                    error!("failed to install signal handlers");
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigquit.recv() => info!("received SIGQUIT"),
        }
        shutdown.cancel();
    });
}
