//! Attack-signature screening of incoming requests.
//!
//! Query string, headers and (non-multipart) body are matched against a fixed set of
//! injection signatures. A hit is answered with 403 and never reaches the handler.

use crate::constants::INSPECTED_BODY_LIMIT_BYTES;
use crate::error::HttpAppError;
use crate::utils::ip_extraction::client_ip;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use drivedeal_core::AppError;
use percent_encoding::percent_decode_str;
use regex::RegexSet;
use std::sync::{Arc, LazyLock};

static SUSPICIOUS_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)union\s+select",
        r"(?i)exec(\s|\+)+(s|x)p\w+",
        r"(?i)<script>",
        r"(?i)javascript:",
        r"(?i)onerror=",
        r"(?i)onload=",
        r"(?i)eval\(",
    ])
    .expect("suspicious patterns are valid")
});

#[derive(Debug, Clone)]
pub struct SuspiciousRequestConfig {
    pub trusted_proxy_count: usize,
}

pub fn is_suspicious(value: &str) -> bool {
    SUSPICIOUS_PATTERNS.is_match(value)
}

/// Query strings are matched decoded, `+` included, as a form parser would see them.
fn decoded_query(query: &str) -> String {
    percent_decode_str(&query.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

fn serialized_headers(headers: &HeaderMap) -> String {
    let map: serde_json::Map<String, serde_json::Value> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                serde_json::Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            )
        })
        .collect();
    serde_json::Value::Object(map).to_string()
}

/// File uploads are screened by the malware scanner, not by signature matching.
fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().to_lowercase().starts_with("multipart/"))
        .unwrap_or(false)
}

fn forbidden() -> Response {
    HttpAppError(AppError::Forbidden("Forbidden".to_string())).into_response()
}

pub async fn suspicious_request_middleware(
    State(config): State<Arc<SuspiciousRequestConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let query_hit = request
        .uri()
        .query()
        .map(|q| is_suspicious(&decoded_query(q)))
        .unwrap_or(false);
    let header_hit = is_suspicious(&serialized_headers(request.headers()));

    let (request, body_hit) = if query_hit || header_hit || is_multipart(request.headers()) {
        (request, false)
    } else {
        let (parts, body) = request.into_parts();
        let bytes = match axum::body::to_bytes(body, INSPECTED_BODY_LIMIT_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "Request body could not be buffered for inspection");
                return HttpAppError(AppError::Validation(
                    "Request body too large".to_string(),
                ))
                .into_response();
            }
        };
        let hit = is_suspicious(&String::from_utf8_lossy(&bytes));
        (Request::from_parts(parts, Body::from(bytes)), hit)
    };

    if query_hit || header_hit || body_hit {
        tracing::error!(
            ip = %client_ip(&request, config.trusted_proxy_count),
            path = %request.uri().path(),
            method = %request.method(),
            "Suspicious activity detected"
        );
        return forbidden();
    }

    next.run(request).await
}
