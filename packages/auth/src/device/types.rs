// ABOUTME: Wire and record types for the RFC 8628 device authorization grant
// ABOUTME: Covers the issue response, token payload, poll outcomes, and stored records

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Device codes live for 15 minutes.
pub const DEVICE_CODE_TTL_SECS: i64 = 900;
/// Default polling interval handed to clients.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Bearer tokens minted on approval live for an hour.
pub const DEVICE_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCodeRequest {
    pub client_id: String,
}

/// Response to a device-code request: the machine-held code, the short
/// human-readable code, and where the user goes to approve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: String,
    pub expires_in: i64,
    pub interval: u64,
}

/// Token payload returned once the user approves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Outcome of a single poll against the token endpoint.
#[derive(Debug, Clone)]
pub enum DeviceCodePoll {
    Pending { interval_secs: u64 },
    SlowDown { interval_secs: u64 },
    Authorized { token: DeviceTokenResponse },
    AccessDenied,
    Expired,
}

/// Status of a stored device code. Transitions exactly once away from
/// `Pending`; terminal states are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCodeStatus {
    Pending,
    Authorized,
    Denied,
    Expired,
}

impl fmt::Display for DeviceCodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Authorized => write!(f, "authorized"),
            Self::Denied => write!(f, "denied"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for DeviceCodeStatus {
    type Err = AuthError;

    fn from_str(s: &str) -> AuthResult<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "authorized" => Ok(Self::Authorized),
            "denied" => Ok(Self::Denied),
            "expired" => Ok(Self::Expired),
            other => Err(AuthError::Storage(format!(
                "unknown device code status: {}",
                other
            ))),
        }
    }
}

/// One stored device authorization attempt.
#[derive(Debug, Clone)]
pub struct DeviceCodeRecord {
    pub device_code: String,
    pub user_code: String,
    pub client_id: String,
    pub status: DeviceCodeStatus,
    pub user_id: Option<String>,
    pub access_token: Option<String>,
    pub interval: u64,
    pub expires_at: i64,
    pub last_polled_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            DeviceCodeStatus::Pending,
            DeviceCodeStatus::Authorized,
            DeviceCodeStatus::Denied,
            DeviceCodeStatus::Expired,
        ] {
            assert_eq!(status.to_string().parse::<DeviceCodeStatus>().unwrap(), status);
        }
        assert!("approved".parse::<DeviceCodeStatus>().is_err());
    }
}
