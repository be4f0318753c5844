//! HTTP surface of the escrow service.

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

pub mod config;
pub mod handlers;
pub mod health;
mod json;
mod ownership;

pub use config::Config;
pub use handlers::not_found_handler;
pub use json::JsonBody;
pub use ownership::Ownership;

use crate::{caretakers, payment_information, secrets, ServiceState};

const STATUS_PREFIX: &str = "/_status";

/// Largest request body. A full secret is base64 text plus the JSON around it.
pub const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// All routes with state applied, without tracing. Tests drive this directly.
pub fn router(state: ServiceState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .nest("/secrets", secrets::router(state.clone()))
        .nest("/caretakers", caretakers::router(state.clone()))
        .route("/payments/:public_key", get(payment_information::handler))
        .route("/servicetime", get(handlers::service_time_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Run the API HTTP server until the shutdown channel fires.
pub async fn run_api(
    config: Config,
    state: ServiceState,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let listen_addr = config.listen_addr;
    let log_level = config.log_level;
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    let router = router(state).layer(trace_layer);

    tracing::info!(addr = ?listen_addr, "API server listening");
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}
