//! Shanuki · Learning Unit Generator Backend
//!
//! - Axum HTTP + WebSocket API driving the unit wizard
//! - Gemini integration for generation (enabled by GEMINI_API_KEY)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   GEMINI_API_KEY       : enables generation if present
//!   GEMINI_BASE_URL      : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_UNIT_MODEL    : default "gemini-3-pro-preview"
//!   GEMINI_HELPER_MODEL  : default "gemini-3-flash-preview"
//!   GEMINI_TIMEOUT_SECS  : optional request timeout (none by default)
//!   SHANUKI_CONFIG_PATH  : path to TOML config (prompt templates + catalog)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod composer;
mod interpreter;
mod gemini;
mod documents;
mod state;
mod session;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: prompt templates, catalog, model client.
  let state = Arc::new(AppState::new());

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "shanuki_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "shanuki_backend", error = %e, "Failed to listen for ctrl-c");
    return;
  }
  info!(target: "shanuki_backend", "Shutdown signal received");
}
