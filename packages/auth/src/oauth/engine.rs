// ABOUTME: In-process grant engine backing development and tests
// ABOUTME: Issues single-use authorization codes and verifies PKCE at exchange

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::error::{AuthError, AuthResult};
use crate::oauth::delegation::{
    CodeExchangeParams, CompletedGrant, GrantGateway, GrantProps, GrantTokens,
};
use crate::oauth::pkce::verify_pkce_challenge;
use crate::oauth::state::PendingAuthRequest;

const CODE_TTL_MINUTES: i64 = 10;
const TOKEN_TTL_SECS: i64 = 3600;

struct IssuedCode {
    request: PendingAuthRequest,
    grant: CompletedGrant,
    issued_at: DateTime<Utc>,
}

/// Upstream OAuth engine kept in process memory. Codes are removed on first
/// exchange, so replays fail with `invalid_grant`.
#[derive(Default)]
pub struct LocalGrantEngine {
    codes: Mutex<HashMap<String, IssuedCode>>,
    tokens: Mutex<HashMap<String, GrantProps>>,
}

impl LocalGrantEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the props bag behind a minted access token. This is what the
    /// upstream-facing resource server sees on authenticated calls.
    pub async fn props_for_token(&self, access_token: &str) -> Option<GrantProps> {
        self.tokens.lock().await.get(access_token).cloned()
    }
}

#[async_trait]
impl GrantGateway for LocalGrantEngine {
    async fn complete_authorization(
        &self,
        request: &PendingAuthRequest,
        grant: CompletedGrant,
    ) -> AuthResult<Url> {
        let redirect_uri = request.redirect_uri.as_deref().ok_or_else(|| {
            AuthError::InvalidRequest("upstream request carried no redirect_uri".to_string())
        })?;

        let mut url = Url::parse(redirect_uri)
            .map_err(|e| AuthError::InvalidRequest(format!("bad upstream redirect_uri: {}", e)))?;

        let code = nanoid::nanoid!();
        self.codes.lock().await.insert(
            code.clone(),
            IssuedCode {
                request: request.clone(),
                grant,
                issued_at: Utc::now(),
            },
        );

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", &code);
            if let Some(state) = &request.state {
                pairs.append_pair("state", state);
            }
        }

        debug!(client_id = %request.client_id, "Issued authorization code");
        Ok(url)
    }

    async fn exchange_code(&self, params: CodeExchangeParams) -> AuthResult<GrantTokens> {
        let issued = self
            .codes
            .lock()
            .await
            .remove(&params.code)
            .ok_or_else(|| {
                AuthError::InvalidGrant("unknown or already used authorization code".to_string())
            })?;

        if Utc::now() - issued.issued_at > Duration::minutes(CODE_TTL_MINUTES) {
            return Err(AuthError::InvalidGrant("authorization code expired".to_string()));
        }

        if let Some(client_id) = &params.client_id {
            if client_id != &issued.request.client_id {
                return Err(AuthError::InvalidGrant(
                    "client_id does not match the authorization request".to_string(),
                ));
            }
        }
        if let (Some(sent), Some(registered)) =
            (&params.redirect_uri, &issued.request.redirect_uri)
        {
            if sent != registered {
                return Err(AuthError::InvalidGrant(
                    "redirect_uri does not match the authorization request".to_string(),
                ));
            }
        }

        if let Some(challenge) = &issued.request.code_challenge {
            let verifier = params.code_verifier.as_deref().ok_or_else(|| {
                AuthError::InvalidGrant("code_verifier is required for this code".to_string())
            })?;
            let method = issued
                .request
                .code_challenge_method
                .as_deref()
                .unwrap_or("S256");
            let verified = match method {
                "S256" => verify_pkce_challenge(verifier, challenge),
                "plain" => verifier == challenge,
                _ => false,
            };
            if !verified {
                return Err(AuthError::InvalidGrant("PKCE verification failed".to_string()));
            }
        }

        let access_token = format!("gat_{}", nanoid::nanoid!(32));
        self.tokens
            .lock()
            .await
            .insert(access_token.clone(), issued.grant.props);

        Ok(GrantTokens {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: TOKEN_TTL_SECS,
            scope: issued.grant.scope,
        })
    }
}
