//! HTTP channel — the inbound surface of the bot.
//!
//! `run()` drives the axum event loop until the shutdown [`CancellationToken`]
//! is cancelled.
//!
//! ## URL layout
//!
//! ```text
//! POST /invocations   — JSON object in, JSON object out (optional X-Session-Id)
//! GET  /ping          — {"status": "Healthy"}
//! ```

mod api;

use std::sync::Arc;

use axum::{Router, routing::{get, post}};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agents::AgentsSubsystem;
use crate::error::AppError;

pub use api::SESSION_HEADER;

// ── Shared request state ──────────────────────────────────────────────────────

/// Axum router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone: all fields are reference-counted.
#[derive(Clone)]
pub(crate) struct AxumState {
    /// Channel identifier used in log spans.
    pub channel_id: Arc<str>,
    pub agents: Arc<AgentsSubsystem>,
}

// ── HttpChannel ───────────────────────────────────────────────────────────────

pub struct HttpChannel {
    channel_id: String,
    bind_addr: String,
    agents: Arc<AgentsSubsystem>,
}

impl HttpChannel {
    pub fn new(
        channel_id: impl Into<String>,
        bind_addr: impl Into<String>,
        agents: Arc<AgentsSubsystem>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            bind_addr: bind_addr.into(),
            agents,
        }
    }

    /// Bind and serve until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), AppError> {
        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|e| AppError::Comms(format!("bind failed on {}: {e}", self.bind_addr)))?;

        info!(channel_id = %self.channel_id, bind_addr = %self.bind_addr, "http channel listening");
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), AppError> {
        let channel_id = self.channel_id.clone();
        let router = build_router_with_id(&self.channel_id, self.agents);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| AppError::Comms(format!("http server error: {e}")))?;

        info!(%channel_id, "http channel shut down");
        Ok(())
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Router for the invocation API, usable without binding a socket.
pub fn build_router(agents: Arc<AgentsSubsystem>) -> Router {
    build_router_with_id("http", agents)
}

fn build_router_with_id(channel_id: &str, agents: Arc<AgentsSubsystem>) -> Router {
    let state = AxumState { channel_id: Arc::from(channel_id), agents };
    Router::new()
        .route("/invocations", post(api::invocations))
        .route("/ping", get(api::ping))
        .fallback(api::not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_config, test_state};

    #[tokio::test]
    async fn serves_until_cancelled() {
        let config = test_config();
        let agents = Arc::new(AgentsSubsystem::new(&config.agents, test_state(&config)).unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(HttpChannel::new("http", addr.to_string(), agents).serve(listener, shutdown.clone()));

        let body: serde_json::Value = reqwest::get(format!("http://{addr}/ping"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "Healthy");

        shutdown.cancel();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn bind_failure_is_comms_error() {
        let config = test_config();
        let agents = Arc::new(AgentsSubsystem::new(&config.agents, test_state(&config)).unwrap());
        let err = HttpChannel::new("http", "not-an-address", agents)
            .run(CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("comms error: bind failed"), "{err}");
    }
}
