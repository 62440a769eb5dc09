// ABOUTME: Tool router: dispatches named operations to downstream services
// ABOUTME: Wired actions forward with the caller's token, the rest are stubs

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, warn};

use grove_services::{Service, ServiceClient, ServiceError};

use crate::auth::CurrentSession;
use crate::response::ApiError;
use crate::state::AppState;

/// Invoke a named tool, `service.action`, forwarding the JSON body.
pub async fn invoke_tool(
    State(_state): State<AppState>,
    Path(tool): Path<String>,
    CurrentSession(session): CurrentSession,
    Json(args): Json<Value>,
) -> Result<Response, ApiError> {
    let Some((service_name, action)) = tool.split_once('.') else {
        return Ok(unknown_tool(&tool));
    };
    let Ok(service) = service_name.parse::<Service>() else {
        return Ok(unknown_tool(&tool));
    };

    let Some(route) = service.route_for(action) else {
        debug!(tool = %tool, "Tool not wired through yet");
        return Ok((
            StatusCode::NOT_IMPLEMENTED,
            Json(json!({
                "error": "not_implemented",
                "error_description": format!("{} is not wired through to {} yet", tool, service),
            })),
        )
            .into_response());
    };

    let client = ServiceClient::new(service.base_url())
        .map_err(|e| grove_auth::AuthError::Configuration(e.to_string()))?;

    match client.post_json(route, &session.access_token, &args).await {
        Ok(result) => Ok(Json(result).into_response()),
        Err(ServiceError::Authentication(msg)) => Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "session_invalid", "error_description": msg })),
        )
            .into_response()),
        Err(err) => {
            warn!(tool = %tool, "Downstream service call failed: {}", err);
            Ok((
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "upstream_unavailable",
                    "error_description": err.to_string(),
                })),
            )
                .into_response())
        }
    }
}

fn unknown_tool(tool: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "unknown_tool",
            "error_description": format!("No tool named {}", tool),
        })),
    )
        .into_response()
}
