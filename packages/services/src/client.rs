use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

/// Minimal bearer-authenticated JSON client for one downstream service.
#[derive(Clone)]
pub struct ServiceClient {
    http_client: Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(base_url: impl Into<String>) -> ServiceResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    /// Forward a JSON payload to a service path with the caller's token.
    pub async fn post_json(
        &self,
        path: &str,
        access_token: &str,
        body: &Value,
    ) -> ServiceResult<Value> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        debug!("Forwarding request to {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => response
                .json::<Value>()
                .await
                .map_err(|e| ServiceError::InvalidResponse(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(ServiceError::Authentication(
                "Invalid or expired token".to_string(),
            )),
            StatusCode::NOT_FOUND => Err(ServiceError::NotFound(format!("No resource at {}", url))),
            status => {
                let error_text = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(ServiceError::Http(error_text))
            }
        }
    }
}
