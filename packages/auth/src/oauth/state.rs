// ABOUTME: Opaque state codec for in-flight upstream authorization requests
// ABOUTME: Round-trips the upstream request through the identity provider's state parameter

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// The upstream client's original authorization parameters, carried through
/// the identity provider's `state` query parameter. Never persisted; the URL
/// is its only storage, so the value is inherently short-lived and single-use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthRequest {
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// The upstream client's own CSRF state, echoed back on its redirect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,
}

/// Serialize a pending request into the opaque state blob (URL-safe unpadded
/// base64 over JSON).
pub fn encode_state(request: &PendingAuthRequest) -> AuthResult<String> {
    let json = serde_json::to_vec(request)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Recover the pending request from a state blob. Any decoding failure is a
/// hard error; the callback must reject the attempt.
pub fn decode_state(state: &str) -> AuthResult<PendingAuthRequest> {
    let bytes = URL_SAFE_NO_PAD
        .decode(state)
        .map_err(|e| AuthError::InvalidState(format!("not valid base64: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::InvalidState(format!("not a valid request payload: {}", e)))
}
