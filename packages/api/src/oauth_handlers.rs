// ABOUTME: HTTP handlers for the delegated OAuth surface
// ABOUTME: /authorize, /callback, /token, and the RFC 8414 metadata document

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;
use tracing::info;

use grove_auth::device::types::DEVICE_CODE_GRANT_TYPE;
use grove_auth::oauth::delegation::{AuthorizeParams, CallbackParams, CodeExchangeParams};
use grove_auth::AuthError;

use crate::auth::CurrentSession;
use crate::response::{found, ApiError};
use crate::state::AppState;

/// Begin delegated authorization: preserve the upstream request in the state
/// parameter and send the user to the identity provider.
pub async fn authorize(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Response, ApiError> {
    let url = state.flow.authorize(params)?;
    Ok(found(&url))
}

/// Receive the identity provider's result and complete the upstream grant.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let url = state.flow.callback(params).await?;
    Ok(found(&url))
}

/// Form body of the token endpoint; which fields matter depends on the grant.
#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub refresh_token: Option<String>,
    pub device_code: Option<String>,
    pub client_id: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
}

/// Token endpoint. Refresh exchanges pass through to the identity provider;
/// device-code polls hit the device store; authorization codes go to the
/// grant engine, which owns reuse detection.
pub async fn token(
    State(state): State<AppState>,
    Form(request): Form<TokenRequest>,
) -> Result<Response, ApiError> {
    let grant_type = request.grant_type.unwrap_or_default();

    match grant_type.as_str() {
        "refresh_token" => {
            let refresh_token = request.refresh_token.ok_or(AuthError::InvalidRequest(
                "refresh_token is required".to_string(),
            ))?;
            let tokens = state.flow.refresh_passthrough(&refresh_token).await?;
            Ok(Json(tokens).into_response())
        }
        DEVICE_CODE_GRANT_TYPE => {
            let device_code = request.device_code.ok_or(AuthError::InvalidRequest(
                "device_code is required".to_string(),
            ))?;
            let client_id = request.client_id.ok_or(AuthError::InvalidRequest(
                "client_id is required".to_string(),
            ))?;
            let token = state.devices.poll(&device_code, &client_id).await?;
            Ok(Json(token).into_response())
        }
        "authorization_code" => {
            let code = request
                .code
                .ok_or(AuthError::InvalidRequest("code is required".to_string()))?;
            let tokens = state
                .engine
                .exchange_code(CodeExchangeParams {
                    code,
                    client_id: request.client_id,
                    redirect_uri: request.redirect_uri,
                    code_verifier: request.code_verifier,
                })
                .await?;
            info!("Exchanged authorization code for upstream tokens");
            Ok(Json(tokens).into_response())
        }
        other => Err(AuthError::UnsupportedGrantType(other.to_string()).into()),
    }
}

/// Delete the caller's session.
pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Response, ApiError> {
    state.sessions.delete(&session.id).await?;
    info!(session_id = %session.id, "Session deleted on logout");
    Ok(Json(serde_json::json!({ "message": "Signed out" })).into_response())
}

/// RFC 8414 authorization server metadata.
pub async fn oauth_metadata(State(state): State<AppState>) -> impl IntoResponse {
    let issuer = state.config.issuer.trim_end_matches('/').to_string();

    Json(serde_json::json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{}/authorize", issuer),
        "token_endpoint": format!("{}/token", issuer),
        "device_authorization_endpoint": format!("{}/auth/device-code", issuer),
        "response_types_supported": ["code"],
        "grant_types_supported": [
            "authorization_code",
            "refresh_token",
            DEVICE_CODE_GRANT_TYPE,
        ],
        "code_challenge_methods_supported": ["S256"],
        "token_endpoint_auth_methods_supported": ["none"],
    }))
}
