use crate::auth::middleware::auth_middleware;
use crate::constants::{
    API_BASE, FILES_ROUTE, MULTIPART_OVERHEAD_BYTES, RATE_LIMIT_CLEANUP_INTERVAL_SECS,
};
use crate::handlers;
use crate::middleware::{
    cors_middleware, rate_limit_middleware, security_headers_middleware,
    suspicious_request_middleware, CorsPolicy, HttpRateLimiter, SecurityHeadersConfig,
    SuspiciousRequestConfig,
};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use drivedeal_core::{Config, StorageBackend};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Build the router and start the rate limiter's background sweep.
///
/// Must be called from within a Tokio runtime.
pub fn setup_routes(state: Arc<AppState>) -> Router {
    let rate_limiter = setup_rate_limiter(&state.config);
    build_router(state, rate_limiter)
}

/// Layers, outermost first: trace, CORS, rate limit, security headers, suspicious
/// payloads, optional auth. Axum applies `.layer` calls inside-out, hence the reverse
/// order below.
pub fn build_router(state: Arc<AppState>, rate_limiter: Arc<HttpRateLimiter>) -> Router {
    let config = &state.config;

    let cors = Arc::new(CorsPolicy::from_config(config));
    let security_headers = Arc::new(SecurityHeadersConfig::new(config.is_production()));
    let suspicious = Arc::new(SuspiciousRequestConfig {
        trusted_proxy_count: config.trusted_proxy_count,
    });

    Router::new()
        .merge(api_routes(config))
        .merge(file_routes(&state))
        .route("/health", get(handlers::health::health))
        .layer(from_fn_with_state(state.jwt.clone(), auth_middleware))
        .layer(from_fn_with_state(suspicious, suspicious_request_middleware))
        .layer(from_fn_with_state(
            security_headers,
            security_headers_middleware,
        ))
        .layer(from_fn_with_state(rate_limiter, rate_limit_middleware))
        .layer(from_fn_with_state(cors, cors_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes(config: &Config) -> Router<Arc<AppState>> {
    let upload_body_limit = config.upload.max_file_size + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route(
            &format!("{}/uploads", API_BASE),
            post(handlers::upload::upload_file).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route(
            &format!("{}/uploads/validate", API_BASE),
            post(handlers::metadata::validate_metadata),
        )
        .route(
            &format!("{}/auth/password/check", API_BASE),
            post(handlers::credentials::check_password),
        )
}

/// S3 hands out presigned URLs of its own; only the local backend is served from here.
fn file_routes(state: &AppState) -> Router<Arc<AppState>> {
    if state.storage.backend_type() != StorageBackend::Local {
        return Router::new();
    }
    Router::new().route(
        &format!("{}/{{*key}}", FILES_ROUTE),
        get(handlers::files::get_signed_file),
    )
}

/// Setup rate limiter with periodic cleanup task
fn setup_rate_limiter(config: &Config) -> Arc<HttpRateLimiter> {
    let rate_limiter = Arc::new(HttpRateLimiter::new(
        &config.rate_limit,
        config.trusted_proxy_count,
    ));

    // The sweep stops once the router (and with it the limiter) is dropped
    let weak = Arc::downgrade(&rate_limiter);
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(RATE_LIMIT_CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match weak.upgrade() {
                Some(limiter) => {
                    limiter.cleanup_expired_buckets().await;
                }
                None => break,
            }
        }
    });

    tracing::info!(
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window.as_secs(),
        trusted_proxy_count = config.trusted_proxy_count,
        "HTTP rate limiting enabled"
    );
    rate_limiter
}
