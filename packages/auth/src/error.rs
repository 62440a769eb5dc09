// ABOUTME: Error types for the delegated authentication core
// ABOUTME: Maps flow failures onto the wire-level {error, error_description} taxonomy

use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("client_id is required")]
    MissingClientId,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("state parameter is required")]
    MissingState,

    #[error("state payload could not be decoded: {0}")]
    InvalidState(String),

    #[error("no authorization code or session token in callback")]
    MissingCode,

    #[error("{error}: {description}")]
    UpstreamDenied { error: String, description: String },

    #[error("session invalid: {0}")]
    SessionInvalid(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("session validation failed: {0}")]
    SessionValidation(String),

    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    #[error("unknown client: {0}")]
    UnknownClient(String),

    #[error("authorization pending")]
    AuthorizationPending,

    #[error("polling too fast, slow down to {interval}s")]
    SlowDown { interval: u64 },

    #[error("access denied by user")]
    AccessDenied,

    #[error("device code expired")]
    ExpiredToken,

    #[error("unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("sealing error: {0}")]
    Seal(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthError {
    /// Stable wire code for the `{error, error_description}` response body.
    pub fn wire_code(&self) -> &str {
        match self {
            Self::MissingClientId | Self::InvalidRequest(_) => "invalid_request",
            Self::MissingState => "missing_state",
            Self::InvalidState(_) => "invalid_state",
            Self::MissingCode => "missing_code",
            Self::UpstreamDenied { error, .. } => error,
            Self::SessionInvalid(_) => "session_invalid",
            Self::TokenExchange(_) => "token_exchange_failed",
            Self::SessionValidation(_) => "session_validation_failed",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnknownClient(_) => "invalid_client",
            Self::AuthorizationPending => "authorization_pending",
            Self::SlowDown { .. } => "slow_down",
            Self::AccessDenied => "access_denied",
            Self::ExpiredToken => "expired_token",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            _ => "internal_error",
        }
    }

    /// Human-readable description carried next to the wire code. Upstream
    /// denials keep the identity provider's description verbatim.
    pub fn wire_description(&self) -> String {
        match self {
            Self::UpstreamDenied { description, .. } => description.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes() {
        assert_eq!(AuthError::MissingState.wire_code(), "missing_state");
        assert_eq!(
            AuthError::InvalidState("bad base64".into()).wire_code(),
            "invalid_state"
        );
        assert_eq!(AuthError::MissingClientId.wire_code(), "invalid_request");
        assert_eq!(
            AuthError::AuthorizationPending.wire_code(),
            "authorization_pending"
        );
    }

    #[test]
    fn test_upstream_denial_is_verbatim() {
        let err = AuthError::UpstreamDenied {
            error: "access_denied".into(),
            description: "User denied".into(),
        };
        assert_eq!(err.wire_code(), "access_denied");
        assert_eq!(err.wire_description(), "User denied");
    }
}
