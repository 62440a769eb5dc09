// ABOUTME: HTTP client for the Grove Accounts identity provider
// ABOUTME: Resolves sessions, exchanges authorization codes, and refreshes credentials

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::config::IdentityConfig;
use crate::error::{AuthError, AuthResult};

/// A confirmed identity returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub tenants: Vec<String>,
}

/// Bearer credentials issued by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Seconds
    pub expires_in: i64,
    pub token_type: String,
    pub scope: Option<String>,
}

/// Result of a server-to-server authorization-code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeExchange {
    #[serde(flatten)]
    pub tokens: IdentityTokens,
    pub user: IdentityProfile,
}

#[derive(Debug, Serialize)]
struct CodeExchangeRequest<'a> {
    code: &'a str,
    client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<&'a str>,
    redirect_uri: &'a str,
    grant_type: &'static str,
}

/// Client for the identity provider's HTTP surface. Performs no retries;
/// retry semantics belong to callers.
#[derive(Clone)]
pub struct IdentityClient {
    config: IdentityConfig,
    client: Client,
}

impl IdentityClient {
    pub fn new(config: IdentityConfig) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AuthError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Build the provider's authentication entry point URL, carrying only the
    /// parameters the provider understands plus the opaque state blob.
    pub fn entry_url(&self, state: &str) -> AuthResult<Url> {
        let mut url = Url::parse(&self.config.base_url)
            .and_then(|u| u.join("/auth/authorize"))
            .map_err(|e| AuthError::Configuration(format!("Invalid identity provider URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("state", state);

        Ok(url)
    }

    /// Resolve a pre-validated session token into a confirmed identity.
    pub async fn resolve_session(&self, session_token: &str) -> AuthResult<IdentityProfile> {
        let url = format!("{}/auth/session", self.config.base_url.trim_end_matches('/'));
        debug!("Resolving session against identity provider");

        let response = self
            .client
            .get(&url)
            .bearer_auth(session_token)
            .send()
            .await
            .map_err(|e| AuthError::SessionValidation(format!("identity provider unreachable: {}", e)))?;

        match response.status() {
            status if status.is_success() => response
                .json::<IdentityProfile>()
                .await
                .map_err(|e| AuthError::SessionValidation(format!("malformed session response: {}", e))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::SessionInvalid(
                "identity provider rejected the session token".to_string(),
            )),
            status => {
                error!("Session validation failed with status {}", status);
                Err(AuthError::SessionValidation(format!(
                    "identity provider returned status {}",
                    status
                )))
            }
        }
    }

    /// Exchange an authorization code for credentials and identity. The
    /// gateway is a confidential client of the provider, so no verifier is
    /// involved here.
    pub async fn exchange_code(&self, code: &str) -> AuthResult<CodeExchange> {
        let url = format!(
            "{}/auth/token/exchange",
            self.config.base_url.trim_end_matches('/')
        );
        debug!("Exchanging authorization code with identity provider");

        let request = CodeExchangeRequest {
            code,
            client_id: &self.config.client_id,
            client_secret: self.config.client_secret.as_deref(),
            redirect_uri: &self.config.redirect_uri,
            grant_type: "authorization_code",
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("identity provider unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            // Don't leak the response body, only log the status
            error!("Code exchange failed with status {}", status);
            return Err(AuthError::TokenExchange(format!(
                "identity provider returned status {}",
                status
            )));
        }

        response
            .json::<CodeExchange>()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("malformed token response: {}", e)))
    }

    /// Refresh expired credentials.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<IdentityTokens> {
        let url = format!("{}/token", self.config.base_url.trim_end_matches('/'));
        debug!("Refreshing credentials with identity provider");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.config.client_id),
            ])
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("identity provider unreachable: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            error!("Token refresh rejected with status {}", status);
            return Err(AuthError::InvalidGrant(
                "refresh token rejected by identity provider".to_string(),
            ));
        }
        if !status.is_success() {
            error!("Token refresh failed with status {}", status);
            return Err(AuthError::TokenExchange(format!(
                "identity provider returned status {}",
                status
            )));
        }

        response
            .json::<IdentityTokens>()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("malformed token response: {}", e)))
    }
}
