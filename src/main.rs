use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use sdc_backend::core::config::redact_sensitive_values;
use sdc_backend::core::logging;
use sdc_backend::server;
use sdc_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize()?;
    logging::init(&state.paths.log_dir);

    match serde_json::to_value(state.settings.as_ref()) {
        Ok(value) => tracing::info!("Effective configuration: {}", redact_sensitive_values(&value)),
        Err(err) => tracing::warn!("Failed to render configuration: {}", err),
    }

    let bind_addr = format!("{}:{}", state.settings.server.host, state.settings.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
