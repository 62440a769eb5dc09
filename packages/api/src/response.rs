// ABOUTME: Wire-level response helpers for the gateway
// ABOUTME: Maps AuthError onto {error, error_description} JSON with the right status

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;
use url::Url;

use grove_auth::AuthError;

/// Structured error body every failure path returns.
#[derive(Debug, Serialize, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    pub error_description: String,
    /// Present on slow_down so clients can adopt the new polling interval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

/// Wrapper giving `AuthError` an HTTP rendering.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        let interval = match &self.0 {
            AuthError::SlowDown { interval } => Some(*interval),
            _ => None,
        };
        let body = OAuthErrorBody {
            error: self.0.wire_code().to_string(),
            error_description: self.0.wire_description(),
            interval,
        };
        (status, Json(body)).into_response()
    }
}

fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::MissingClientId
        | AuthError::InvalidRequest(_)
        | AuthError::MissingState
        | AuthError::InvalidState(_)
        | AuthError::MissingCode
        | AuthError::UpstreamDenied { .. }
        | AuthError::UnsupportedGrantType(_)
        | AuthError::AuthorizationPending
        | AuthError::SlowDown { .. }
        | AuthError::AccessDenied
        | AuthError::ExpiredToken => StatusCode::BAD_REQUEST,

        AuthError::SessionInvalid(_)
        | AuthError::InvalidGrant(_)
        | AuthError::UnknownClient(_) => StatusCode::UNAUTHORIZED,

        AuthError::TokenExchange(_) | AuthError::SessionValidation(_) => StatusCode::BAD_GATEWAY,

        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A 302 redirect. OAuth user agents expect Found, not 303/307.
pub fn found(url: &Url) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, url.as_str().to_string())],
    )
        .into_response()
}
