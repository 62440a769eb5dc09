// ABOUTME: HTTP handlers for the device authorization grant, server half
// ABOUTME: Issues device/user codes and records the user's approve/deny decision

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use grove_auth::device::types::{DeviceCodeRequest, DeviceCodeStatus, DEVICE_TOKEN_TTL_SECS};
use grove_auth::{AuthError, Session};

use crate::auth::CurrentSession;
use crate::response::ApiError;
use crate::state::AppState;

/// Issue a device code and user code for a known CLI client.
pub async fn request_device_code(
    State(state): State<AppState>,
    Json(request): Json<DeviceCodeRequest>,
) -> Result<Response, ApiError> {
    if request.client_id != state.config.cli_client_id {
        return Err(AuthError::UnknownClient(request.client_id).into());
    }

    let response = state
        .devices
        .create(&request.client_id, &state.config.issuer)
        .await?;
    Ok(Json(response).into_response())
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub user_code: Option<String>,
}

/// The page the CLI sends the user to. The identity provider owns the real
/// approval UI; this one shows the code and where the decision lands.
pub async fn verification_page(Query(query): Query<VerifyQuery>) -> impl IntoResponse {
    // Keep the echoed code to the user-code charset.
    let code: String = query
        .user_code
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(16)
        .collect();
    Html(format!(
        r#"<html>
<head>
    <title>Approve device sign-in</title>
    <style>
        body {{ font-family: system-ui, -apple-system, sans-serif; max-width: 600px; margin: 100px auto; text-align: center; }}
        code {{ font-size: 2em; letter-spacing: 0.2em; }}
        p {{ color: #64748b; }}
    </style>
</head>
<body>
    <h1>Approve device sign-in</h1>
    <p>A device is asking to sign in with this code:</p>
    <code>{}</code>
    <p>Confirm it matches what your terminal shows, then approve the request
    from your signed-in Grove session.</p>
</body>
</html>"#,
        code
    ))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub user_code: String,
    pub approve: bool,
}

/// Record the signed-in user's decision on a user code. Approval mints the
/// device's bearer token and the session behind it; the store's conditional
/// update makes a second decision a no-op.
pub async fn verify_device_code(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(request): Json<VerifyRequest>,
) -> Result<Response, ApiError> {
    let record = if request.approve {
        let token = format!("gst_{}", nanoid::nanoid!(32));
        let record = state
            .devices
            .approve(&request.user_code, &session.user_id, &token)
            .await?;

        // Only the winner of the transition owns the minted token.
        if record.status == DeviceCodeStatus::Authorized
            && record.access_token.as_deref() == Some(token.as_str())
        {
            let device_session = Session {
                id: token.clone(),
                user_id: session.user_id.clone(),
                email: session.email.clone(),
                tenants: session.tenants.clone(),
                access_token: token,
                refresh_token: None,
                expires_at: Utc::now().timestamp() + DEVICE_TOKEN_TTL_SECS,
            };
            state.sessions.store(&device_session).await?;
            info!(user_code = %record.user_code, user_id = %session.user_id, "Device login approved");
        }
        record
    } else {
        state.devices.deny(&request.user_code).await?
    };

    Ok(Json(serde_json::json!({
        "user_code": record.user_code,
        "status": record.status.to_string(),
    }))
    .into_response())
}
