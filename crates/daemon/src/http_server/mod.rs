use axum::http::header::{ACCEPT, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderName, Method};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

use common::transport::CLIENT_PUBLIC_KEY_HEADER;

pub mod api;
mod config;
mod handlers;
mod health;

pub use config::Config;

use crate::ServiceState;

const STATUS_PREFIX: &str = "/_status";

/// All routes: `/_status` health checks plus the book API at the root
pub fn router(state: ServiceState) -> Router {
    Router::new()
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .merge(api::router(state.clone()))
        .fallback(handlers::not_found_handler)
        .with_state(state)
}

/// Bind `config.listen_addr` and serve until `shutdown_rx` fires
pub async fn run_api(
    config: Config,
    state: ServiceState,
    shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let listener = TcpListener::bind(config.listen_addr).await?;
    serve(listener, config.log_level, state, shutdown_rx).await
}

/// Serve on an already bound listener
pub async fn serve(
    listener: TcpListener,
    log_level: tracing::Level,
    state: ServiceState,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    let cors = CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::POST])
        .allow_headers(vec![
            ACCEPT,
            ORIGIN,
            CONTENT_TYPE,
            HeaderName::from_static(CLIENT_PUBLIC_KEY_HEADER),
        ])
        .allow_origin(Any)
        .allow_credentials(false);

    let app = router(state).layer(ServiceBuilder::new().layer(trace_layer).layer(cors));

    tracing::info!(addr = ?listener.local_addr()?, "API server listening");

    axum::serve(listener, app)
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
