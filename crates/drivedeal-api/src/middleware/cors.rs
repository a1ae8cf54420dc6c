//! Origin allow-list.
//!
//! Browsers are only told an origin is allowed after it has been checked here; a
//! disallowed origin is refused outright instead of being answered without CORS headers.

use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use drivedeal_core::{AppError, Config};
use std::sync::Arc;

pub const CORS_REJECTED_MESSAGE: &str = "Not allowed by CORS";

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, PATCH";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";
const EXPOSED_HEADERS: &str = "Content-Range, X-Content-Range";
const PREFLIGHT_MAX_AGE_SECS: &str = "600";

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    allow_any: bool,
}

impl CorsPolicy {
    pub fn new(allowed_origins: Vec<String>, allow_any: bool) -> Self {
        Self {
            allowed_origins: allowed_origins
                .into_iter()
                .map(|o| o.trim_end_matches('/').to_lowercase())
                .collect(),
            allow_any,
        }
    }

    /// Outside production every origin is accepted.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cors_allowed_origins.clone(), !config.is_production())
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/').to_lowercase();
        self.allow_any
            || self
                .allowed_origins
                .iter()
                .any(|allowed| allowed == "*" || *allowed == origin)
    }
}

fn apply_cors_headers(headers: &mut HeaderMap, origin: HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(EXPOSED_HEADERS),
    );
    headers.append(header::VARY, HeaderValue::from_static("Origin"));
}

pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    // Same-origin and non-browser clients send no Origin
    let Some(origin) = request.headers().get(header::ORIGIN).cloned() else {
        return next.run(request).await;
    };

    let allowed = origin
        .to_str()
        .map(|o| policy.is_allowed(o))
        .unwrap_or(false);
    if !allowed {
        tracing::warn!(
            origin = ?origin,
            path = %request.uri().path(),
            "Blocked cross-origin request"
        );
        return HttpAppError(AppError::Cors(CORS_REJECTED_MESSAGE.to_string())).into_response();
    }

    let is_preflight = request.method() == Method::OPTIONS
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);
    if is_preflight {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        apply_cors_headers(headers, origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE_SECS),
        );
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut(), origin);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list() {
        let policy = CorsPolicy::new(vec!["https://app.drivedeal.fr/".to_string()], false);
        assert!(policy.is_allowed("https://app.drivedeal.fr"));
        assert!(policy.is_allowed("https://APP.drivedeal.fr"));
        assert!(!policy.is_allowed("https://evil.example"));
        assert!(!policy.is_allowed("http://app.drivedeal.fr"));
    }

    #[test]
    fn test_non_production_allows_any() {
        let policy = CorsPolicy::new(Vec::new(), true);
        assert!(policy.is_allowed("http://localhost:3000"));
    }
}
