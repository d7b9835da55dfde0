//! Server lifecycle: bind, serve, evict idle sessions, shut down.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use repsense_common::config::{ServerConfig, SessionConfig};
use repsense_common::error::{RepsenseError, RepsenseResult};
use repsense_core::SessionStore;

use crate::routes::router;
use crate::state::AppState;

/// Serve until Ctrl-C, then drop all live sessions.
pub async fn serve(
    server: &ServerConfig,
    sessions: &SessionConfig,
    state: AppState,
) -> RepsenseResult<()> {
    let addr = format!("{}:{}", server.host, server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| RepsenseError::resource(format!("Failed to bind {addr}: {e}")))?;
    serve_on(listener, sessions, state, shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    sessions: &SessionConfig,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> RepsenseResult<()> {
    let local: Option<SocketAddr> = listener.local_addr().ok();
    tracing::info!(addr = ?local, "Repsense server listening");

    let store = Arc::clone(&state.sessions);
    let sweeper = spawn_idle_sweeper(Arc::clone(&store), sessions);

    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(RepsenseError::from);

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    store.clear();
    tracing::info!("Repsense server stopped");
    result
}

/// Periodically evict abandoned live sessions. Returns `None` when eviction
/// is disabled.
pub fn spawn_idle_sweeper(
    store: Arc<SessionStore>,
    config: &SessionConfig,
) -> Option<JoinHandle<()>> {
    let timeout = config.idle_timeout_secs? as f64;
    let period = Duration::from_secs(config.sweep_interval_secs.max(1));
    tracing::debug!(
        timeout_secs = timeout,
        sweep_secs = period.as_secs(),
        "Idle session sweeper started"
    );

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let evicted = store.evict_idle(timeout);
            if !evicted.is_empty() {
                tracing::info!(
                    count = evicted.len(),
                    remaining = store.len(),
                    "Evicted idle sessions"
                );
            }
        }
    }))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
