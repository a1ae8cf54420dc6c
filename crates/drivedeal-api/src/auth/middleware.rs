use crate::auth::jwt::JwtKeys;
use crate::auth::models::Principal;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use drivedeal_core::AppError;
use std::sync::Arc;

const BEARER_PREFIX: &str = "Bearer ";

fn invalid_token() -> Response {
    HttpAppError(AppError::Unauthorized("Invalid token".to_string())).into_response()
}

/// Optional bearer authentication.
///
/// Requests without an `Authorization` header pass through anonymously; handlers that need
/// a caller see an empty [`MaybePrincipal`](super::MaybePrincipal). A header that is present
/// but not a valid HS256 token is rejected with 401.
pub async fn auth_middleware(
    State(keys): State<Arc<JwtKeys>>,
    mut request: Request,
    next: Next,
) -> Response {
    if !request.headers().contains_key(AUTHORIZATION) {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from);
    let Some(token) = token else {
        tracing::debug!("Authorization header is not a bearer token");
        return invalid_token();
    };

    match keys.verify(&token) {
        Ok(principal) => {
            tracing::debug!(user_id = %principal.user_id, "Request authenticated");
            request.extensions_mut().insert::<Principal>(principal);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Bearer token rejected");
            invalid_token()
        }
    }
}
