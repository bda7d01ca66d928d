//! Exomaths · exercise generation backend
//!
//! - Axum HTTP API (generation, template validation, catalog)
//! - Catalog reconciliation at startup and after every source write
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   EXERCISE_CONFIG_PATH : path to TOML config (exercise bank, sources, cache TTL)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use exomaths_backend::logic::reconcile_all;
use exomaths_backend::routes::build_router;
use exomaths_backend::state::AppState;
use exomaths_backend::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (definitions, generators, primed store).
  let state = Arc::new(AppState::from_env().await?);

  // Bring every topic's catalog in line before serving.
  match reconcile_all(state.clone()).await {
    Ok(outcomes) => info!(target: "exomaths_backend", topics = outcomes.len(), "Startup reconciliation complete"),
    Err(e) => error!(target: "exomaths_backend", error = %e, "Startup reconciliation failed; serving anyway"),
  }

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state);

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "exomaths_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "exomaths_backend", error = %e, "Failed to listen for Ctrl-C");
    return;
  }
  info!(target: "exomaths_backend", "Shutdown signal received");
}
