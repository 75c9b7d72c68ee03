//! Bearer-token authentication against the configured shared secret.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Reject requests whose `Authorization: Bearer <token>` header does not
/// match the configured shared secret.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match bearer_token(&request) {
        Some(token) if token == state.config.auth_token => next.run(request).await,
        _ => {
            warn!(uri = %request.uri(), "Rejected unauthenticated request");
            ApiError::Unauthorized.into_response()
        }
    }
}

/// Extract the bearer token from the Authorization header.
fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_auth(value: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/process");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_extraction() {
        let req = request_with_auth(Some("Bearer secret-token"));
        assert_eq!(bearer_token(&req), Some("secret-token"));
    }

    #[test]
    fn test_missing_or_malformed_header() {
        assert_eq!(bearer_token(&request_with_auth(None)), None);
        assert_eq!(bearer_token(&request_with_auth(Some("secret-token"))), None);
        assert_eq!(bearer_token(&request_with_auth(Some("Basic abc"))), None);
    }
}
