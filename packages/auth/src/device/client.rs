// ABOUTME: Client half of the device authorization grant
// ABOUTME: Requests codes and polls the token endpoint until the user decides

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::device::types::{
    DeviceCodePoll, DeviceCodeRequest, DeviceCodeResponse, DeviceTokenResponse,
    DEVICE_CODE_GRANT_TYPE,
};
use crate::error::{AuthError, AuthResult};

/// Ceiling on total polling time, independent of the server-reported
/// expires_in. Guarantees the loop terminates even against a server that
/// never reaches a terminal state.
const MAX_POLL_SECS: u64 = 900;

#[derive(Debug, Deserialize)]
struct DeviceErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    interval: Option<u64>,
}

/// Polls a device authorization to completion.
pub struct DeviceFlowClient {
    base_url: String,
    client_id: String,
    http: Client,
}

impl DeviceFlowClient {
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>) -> AuthResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AuthError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.into(),
            client_id: client_id.into(),
            http,
        })
    }

    /// Request a device code and user code for this client.
    pub async fn request_device_code(&self) -> AuthResult<DeviceCodeResponse> {
        let url = format!("{}/auth/device-code", self.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&url)
            .json(&DeviceCodeRequest {
                client_id: self.client_id.clone(),
            })
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("auth server unreachable: {}", e)))?;

        match response.status() {
            status if status.is_success() => response
                .json::<DeviceCodeResponse>()
                .await
                .map_err(|e| AuthError::TokenExchange(format!("malformed device code response: {}", e))),
            StatusCode::UNAUTHORIZED => Err(AuthError::UnknownClient(self.client_id.clone())),
            status => Err(AuthError::TokenExchange(format!(
                "auth server returned status {}",
                status
            ))),
        }
    }

    /// One poll of the token endpoint.
    pub async fn poll_once(&self, device_code: &str) -> AuthResult<DeviceCodePoll> {
        let url = format!("{}/token", self.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", DEVICE_CODE_GRANT_TYPE),
                ("device_code", device_code),
                ("client_id", &self.client_id),
            ])
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("auth server unreachable: {}", e)))?;

        if response.status().is_success() {
            let token = response
                .json::<DeviceTokenResponse>()
                .await
                .map_err(|e| AuthError::TokenExchange(format!("malformed token response: {}", e)))?;
            return Ok(DeviceCodePoll::Authorized { token });
        }

        let body = response
            .json::<DeviceErrorResponse>()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("malformed error response: {}", e)))?;

        match body.error.as_str() {
            "authorization_pending" => Ok(DeviceCodePoll::Pending {
                interval_secs: body.interval.unwrap_or(0),
            }),
            "slow_down" => Ok(DeviceCodePoll::SlowDown {
                interval_secs: body.interval.unwrap_or(0),
            }),
            "access_denied" => Ok(DeviceCodePoll::AccessDenied),
            "expired_token" => Ok(DeviceCodePoll::Expired),
            other => Err(AuthError::TokenExchange(format!(
                "{}: {}",
                other,
                body.error_description.unwrap_or_default()
            ))),
        }
    }

    /// Poll until the user approves, denies, or the code expires. Sleeps the
    /// server-advertised interval between polls, honors slow_down by adopting
    /// the increased interval, and gives up after min(expires_in, 900)
    /// seconds of total elapsed time.
    pub async fn wait_for_authorization(
        &self,
        grant: &DeviceCodeResponse,
    ) -> AuthResult<DeviceTokenResponse> {
        let ceiling = Duration::from_secs((grant.expires_in.max(0) as u64).min(MAX_POLL_SECS));
        let started = Instant::now();
        let mut interval = grant.interval.max(1);

        info!(user_code = %grant.user_code, "Waiting for device authorization");

        loop {
            tokio::time::sleep(Duration::from_secs(interval)).await;
            if started.elapsed() >= ceiling {
                return Err(AuthError::ExpiredToken);
            }

            match self.poll_once(&grant.device_code).await? {
                DeviceCodePoll::Pending { interval_secs } => {
                    if interval_secs > 0 {
                        interval = interval_secs;
                    }
                    debug!("Authorization pending, next poll in {}s", interval);
                }
                DeviceCodePoll::SlowDown { interval_secs } => {
                    // Honor the server's new interval; fall back to +5s.
                    interval = if interval_secs > 0 {
                        interval_secs
                    } else {
                        interval + 5
                    };
                    debug!("Server asked to slow down, next poll in {}s", interval);
                }
                DeviceCodePoll::Authorized { token } => {
                    info!("Device authorization approved");
                    return Ok(token);
                }
                DeviceCodePoll::AccessDenied => return Err(AuthError::AccessDenied),
                DeviceCodePoll::Expired => return Err(AuthError::ExpiredToken),
            }
        }
    }
}
