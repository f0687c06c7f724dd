//! Axum HTTP gateway: the transport boundary in front of the engine.
//!
//! Body limits and request timeouts follow the same hardening defaults as the
//! rest of the stack; the SSE run stream is the only long-lived response, and
//! the timeout layer bounds response-head production, not body streaming.

mod handlers;
pub mod sse;

use crate::config::Config;
use crate::engine::Engine;
use crate::llm::Provider;
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use handlers::{handle_agents, handle_health, handle_run};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

pub use handlers::{AgentSummary, RunRequest};

/// Maximum request body size (256KB) — run requests may carry document text.
pub const MAX_BODY_SIZE: usize = 262_144;
/// Request timeout (30s).
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub provider: Arc<dyn Provider>,
    pub registry: Arc<ToolRegistry>,
    pub config: Arc<Config>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/agent/run", post(handle_run))
        .route("/api/agents", get(handle_agents))
        .route("/health", get(handle_health))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(
    config: Arc<Config>,
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
) -> Result<()> {
    let engine = Engine::new(
        provider.clone(),
        registry.clone(),
        config.engine.max_iterations,
    );
    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid gateway address {}:{}",
                config.gateway.host, config.gateway.port
            )
        })?;

    let state = AppState {
        engine,
        provider,
        registry,
        config,
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding gateway to {addr}"))?;
    info!(%addr, "gateway listening");
    axum::serve(listener, router).await.context("gateway serve")?;
    Ok(())
}
