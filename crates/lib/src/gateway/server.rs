//! Gateway HTTP server (single port).

use crate::channels::{InboundEvent, LineChannel, LineEvent, LineWebhook};
use crate::config::{self, Config};
use crate::dispatch::Dispatcher;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared state for the gateway (config, dispatcher, reply channel).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
    pub line: LineChannel,
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let line = LineChannel::new(
        config::resolve_line_token(&config),
        config.channels.line.api_base.clone(),
    );
    if !line.can_send() {
        log::warn!("line channel access token not configured; replies will be logged, not sent");
    }
    if config::resolve_sensor_token(&config).is_none() {
        log::warn!("sensor access token not configured; room queries will report the sensor as unreachable");
    }

    let state = GatewayState {
        config: Arc::new(config.clone()),
        dispatcher: Dispatcher::from_config(&config),
        line,
    };

    let app = Router::new()
        .route("/", get(health_http))
        .route("/callback", post(line_webhook))
        .with_state(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// POST /callback — receives the LINE webhook JSON and answers each event in order.
async fn line_webhook(State(state): State<GatewayState>, body: Bytes) -> StatusCode {
    let webhook: LineWebhook = match serde_json::from_slice(&body) {
        Ok(w) => w,
        Err(e) => {
            log::debug!("line webhook: malformed body: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    for event in &webhook.events {
        handle_event(&state, event).await;
    }
    StatusCode::OK
}

async fn handle_event(state: &GatewayState, event: &LineEvent) {
    let inbound = InboundEvent::from(event);
    let Some(reply) = state.dispatcher.dispatch(&inbound).await else {
        return;
    };
    let Some(ref reply_token) = event.reply_token else {
        log::debug!("line: {} event has no reply token, dropping reply", event.kind);
        return;
    };
    if !state.line.can_send() {
        log::info!(
            "line reply (not sent): {}",
            serde_json::to_string(&reply).unwrap_or_default()
        );
        return;
    }
    if let Err(e) = state.line.reply(reply_token, &[reply]).await {
        log::warn!("line reply failed: {}", e);
    }
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "channel": state.line.id(),
        "port": state.config.gateway.port,
    }))
}
