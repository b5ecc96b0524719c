use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::debug;

use super::error::ApiError;
use super::state::HttpState;

/// Bearer-token gate for the mutating endpoints.
///
/// With no token configured the gate is open; deployments are expected to
/// set one outside local development.
pub async fn api_auth(
    State(state): State<HttpState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.api_token.as_deref() else {
        return next.run(request).await;
    };

    let presented =
        extract_token(request.headers().get(axum::http::header::AUTHORIZATION)).or_else(|| {
            request
                .headers()
                .get("x-api-key")
                .and_then(|v| v.to_str().ok().map(|s| s.to_string()))
        });

    let Some(presented) = presented else {
        return ApiError::unauthorized().into_response();
    };

    if presented.as_bytes().ct_eq(expected.as_bytes()).into() {
        next.run(request).await
    } else {
        debug!("rejected request with mismatched bearer token");
        ApiError::unauthorized().into_response()
    }
}

fn extract_token(header: Option<&axum::http::HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?;
    Some(bearer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_required() {
        let value = axum::http::HeaderValue::from_static("Bearer edge-token");
        assert_eq!(extract_token(Some(&value)).as_deref(), Some("edge-token"));

        let bare = axum::http::HeaderValue::from_static("edge-token");
        assert!(extract_token(Some(&bare)).is_none());
        assert!(extract_token(None).is_none());
    }
}
