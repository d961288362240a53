//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use super::middleware::{rate_limit, GateState};
use crate::error::{GateError, Result};
use crate::ratelimit::RateLimiter;

/// HTTP server fronting downstream handlers with the tenant rate limiter.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Limiter and tenant header
    state: GateState,
    /// Idle tenant eviction period, if enabled
    eviction_interval: Option<Duration>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, state: GateState) -> Self {
        Self {
            addr,
            state,
            eviction_interval: None,
        }
    }

    /// Periodically evict tenants that have been idle for a full window.
    pub fn with_eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = Some(interval);
        self
    }

    /// The router this server serves.
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!(addr = %self.addr, error = %e, "Failed to bind HTTP listener");
            GateError::Io(e)
        })?;

        info!(
            addr = %listener.local_addr()?,
            tenant_header = %self.state.tenant_header(),
            "Starting HTTP server with graceful shutdown"
        );

        let sweeper = self
            .eviction_interval
            .map(|interval| spawn_sweeper(Arc::clone(self.state.limiter()), interval));

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }

        result.map_err(|e| {
            error!(error = %e, "HTTP server failed");
            GateError::Io(e)
        })
    }
}

/// Build the application router.
///
/// `/health` bypasses the limiter; every other route, including the
/// fallback, is rate limited.
pub fn build_router(state: GateState) -> Router {
    let limited = Router::new()
        .route("/test", get(test_endpoint))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/health", get(health))
        .merge(limited)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<GateState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "tenants": state.limiter().tenant_count(),
    }))
}

async fn test_endpoint() -> impl IntoResponse {
    Json(json!({ "message": "Request successful" }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "NotFound", "message": "No such route" })),
    )
}

/// Evict idle tenants every `interval` until the task is aborted.
pub(crate) fn spawn_sweeper(limiter: Arc<RateLimiter>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = limiter.evict_idle();
            debug!(
                evicted = evicted,
                tenants = limiter.tenant_count(),
                "Idle tenant sweep finished"
            );
        }
    })
}
