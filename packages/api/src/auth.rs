// ABOUTME: Request authentication for session-bearing endpoints
// ABOUTME: Extracts the bearer session, refreshing it against the provider when expired

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use grove_auth::{AuthError, Session};

use crate::response::ApiError;
use crate::state::AppState;

/// The authenticated caller's session, pulled from `Authorization: Bearer`.
/// An expired session with a refresh token is refreshed in place.
pub struct CurrentSession(pub Session);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| {
                ApiError(AuthError::SessionInvalid("missing bearer token".to_string()))
            })?;

        let session = state.flow.ensure_fresh(bearer).await.map_err(ApiError)?;
        Ok(CurrentSession(session))
    }
}
