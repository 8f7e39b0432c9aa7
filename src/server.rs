use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    adapter::LoggingAdapter,
    config::Config,
    handlers::{self, AppState},
    logging::SensitiveToken,
    primary::{CloudLoggingBackend, PrimaryBackend},
    rate_limit::{rate_limit_middleware, RateLimiter},
    signals::setup_signal_handlers,
    sink::LogSink,
};

/// Request bodies above this size are rejected before reaching a handler
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Start the visa log server
///
/// This function:
/// 1. Opens the local sink (creating the log directory if needed)
/// 2. Builds the primary backend when configured
/// 3. Sets up signal handlers for graceful shutdown
/// 4. Serves requests until a shutdown signal arrives
pub async fn start_server(config: Config) -> Result<()> {
    let sink = Arc::new(LogSink::open(&config.storage.log_dir).await?);

    let http_client = reqwest::Client::builder().build()?;
    let primary: Option<Arc<dyn PrimaryBackend>> =
        CloudLoggingBackend::from_config(http_client, &config.primary)
            .map(|backend| Arc::new(backend) as Arc<dyn PrimaryBackend>);

    match &primary {
        Some(backend) => info!(
            backend = backend.name(),
            project_id = %config.primary.project_id,
            log_name = %config.primary.log_name,
            token = %SensitiveToken::new(&config.primary.access_token),
            "Primary logging backend configured"
        ),
        None if config.primary.enabled => warn!(
            "Primary logging enabled but no access token set; using local storage only"
        ),
        None => info!("Primary logging disabled; using local storage only"),
    }

    let (shutdown_tx, signal_handle) = setup_signal_handlers();
    let mut shutdown_rx = shutdown_tx.subscribe();

    let limiter = RateLimiter::from_config(&config.rate_limit).map(Arc::new);
    if let Some(limiter) = &limiter {
        spawn_purge_task(limiter.clone(), shutdown_tx.subscribe());
    }

    let state = AppState::new(LoggingAdapter::new(sink, primary));
    let app = create_router(state, limiter);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting visa log server on {}", addr);
    info!(
        log_dir = %config.storage.log_dir,
        rate_limit = config.rate_limit.enabled,
        "Local fallback storage ready"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
        info!("Shutdown signal received, draining connections...");
    })
    .await?;

    signal_handle.await?;
    info!("Server stopped gracefully");

    Ok(())
}

/// Create the Axum router with all routes and middleware
///
/// Rate limiting, when present, covers the `/api/logs` routes only.
pub fn create_router(state: AppState, limiter: Option<Arc<RateLimiter>>) -> Router {
    let mut log_routes = Router::new()
        .route(
            "/api/logs",
            post(handlers::logs::ingest)
                .get(handlers::logs::query)
                .delete(handlers::logs::clear),
        )
        .route("/api/logs/export", get(handlers::export::export));

    if let Some(limiter) = limiter {
        log_routes = log_routes.layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    }

    Router::new()
        .route("/api/stats", get(handlers::stats::stats))
        .route("/api/health", get(handlers::health::health_check))
        .merge(log_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Periodically drop elapsed rate-limit windows so idle clients don't
/// accumulate.
fn spawn_purge_task(
    limiter: Arc<RateLimiter>,
    mut shutdown_rx: tokio::sync::broadcast::Receiver<crate::signals::ShutdownSignal>,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(limiter.window());
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    limiter.purge_expired();
                    tracing::debug!(clients = limiter.tracked_clients(), "Purged expired rate-limit windows");
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;

    async fn test_state() -> (tempfile::TempDir, AppState) {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let sink = Arc::new(LogSink::open(temp_dir.path()).await.unwrap());
        (temp_dir, AppState::new(LoggingAdapter::new(sink, None)))
    }

    #[tokio::test]
    async fn test_health_is_not_rate_limited() {
        let (_dir, state) = test_state().await;
        let limiter = Arc::new(RateLimiter::new(1, std::time::Duration::from_secs(60)));
        let app = create_router(state, Some(limiter));

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (_dir, state) = test_state().await;
        let app = create_router(state, None);

        let response = app
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
