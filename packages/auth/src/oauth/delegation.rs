// ABOUTME: The OAuth delegation flow: authorize, callback, and session refresh
// ABOUTME: Fronts an upstream OAuth client while the identity provider verifies users

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{AuthError, AuthResult};
use crate::oauth::identity::{IdentityClient, IdentityTokens};
use crate::oauth::session::{Session, SessionStore};
use crate::oauth::state::{decode_state, encode_state, PendingAuthRequest};

/// Session lifetime assumed for direct session-token handoffs, where the
/// provider reports no expiry of its own.
const SESSION_HANDOFF_TTL_SECS: i64 = 8 * 60 * 60;

/// Query parameters of an upstream authorization request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeParams {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub response_type: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

/// Query parameters of the identity provider's callback redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub session_token: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Identity resolved at the callback.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub user_id: String,
    pub email: String,
    pub tenants: Vec<String>,
}

/// Opaque props handed to the upstream engine; the upstream-facing resource
/// server receives these on authenticated calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantProps {
    pub session_id: String,
    pub access_token: String,
    pub tenants: Vec<String>,
}

/// Everything the upstream engine needs to finish the grant.
#[derive(Debug, Clone)]
pub struct CompletedGrant {
    pub identity: ResolvedIdentity,
    pub scope: Option<String>,
    pub props: GrantProps,
}

/// Token material minted by the upstream engine at its code exchange.
#[derive(Debug, Clone, Serialize)]
pub struct GrantTokens {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Parameters of an upstream client's authorization-code exchange.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeExchangeParams {
    pub code: String,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
}

/// The upstream OAuth engine's primitives. The flow receives an
/// implementation at construction; it never discovers one at runtime.
#[async_trait]
pub trait GrantGateway: Send + Sync {
    /// Complete a waiting authorization: issue a code bound to the original
    /// upstream request and return the redirect back to the upstream client.
    async fn complete_authorization(
        &self,
        request: &PendingAuthRequest,
        grant: CompletedGrant,
    ) -> AuthResult<Url>;

    /// Exchange an issued authorization code for tokens. Codes are single
    /// use; the engine owns reuse detection and PKCE verification.
    async fn exchange_code(&self, params: CodeExchangeParams) -> AuthResult<GrantTokens>;
}

/// Orchestrates one delegated authorization attempt end to end.
pub struct DelegationFlow {
    identity: IdentityClient,
    engine: Arc<dyn GrantGateway>,
    sessions: SessionStore,
}

impl DelegationFlow {
    pub fn new(
        identity: IdentityClient,
        engine: Arc<dyn GrantGateway>,
        sessions: SessionStore,
    ) -> Self {
        Self {
            identity,
            engine,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Begin delegated authorization. The upstream request is preserved by
    /// serializing it into the state parameter; PKCE parameters ride along
    /// opaquely and are never forwarded to the identity provider.
    pub fn authorize(&self, params: AuthorizeParams) -> AuthResult<Url> {
        let client_id = params
            .client_id
            .filter(|id| !id.is_empty())
            .ok_or(AuthError::MissingClientId)?;

        let request = PendingAuthRequest {
            client_id,
            redirect_uri: params.redirect_uri,
            scope: params.scope,
            state: params.state,
            code_challenge: params.code_challenge,
            code_challenge_method: params.code_challenge_method,
        };

        let state = encode_state(&request)?;
        let url = self.identity.entry_url(&state)?;
        info!(
            client_id = %request.client_id,
            "Redirecting upstream authorization to identity provider"
        );
        Ok(url)
    }

    /// Receive the identity provider's result and complete the upstream
    /// grant. Not idempotent: each valid callback consumes a one-time code
    /// on the upstream side.
    pub async fn callback(&self, params: CallbackParams) -> AuthResult<Url> {
        if let Some(error) = params.error {
            // Provider denials are propagated verbatim, no reinterpretation.
            return Err(AuthError::UpstreamDenied {
                error,
                description: params.error_description.unwrap_or_default(),
            });
        }

        let state = params.state.ok_or(AuthError::MissingState)?;
        let request = decode_state(&state)?;
        debug!(client_id = %request.client_id, "Recovered upstream request from state");

        let (profile, tokens) = if let Some(session_token) = params.session_token {
            let profile = self.identity.resolve_session(&session_token).await?;
            let tokens = IdentityTokens {
                access_token: session_token,
                refresh_token: None,
                expires_in: SESSION_HANDOFF_TTL_SECS,
                token_type: "Bearer".to_string(),
                scope: None,
            };
            (profile, tokens)
        } else if let Some(code) = params.code {
            let exchange = self.identity.exchange_code(&code).await?;
            (exchange.user, exchange.tokens)
        } else {
            return Err(AuthError::MissingCode);
        };

        let session = Session {
            id: nanoid::nanoid!(),
            user_id: profile.id.clone(),
            email: profile.email.clone(),
            tenants: profile.tenants.clone(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token,
            expires_at: Utc::now().timestamp() + tokens.expires_in,
        };
        self.sessions.store(&session).await?;

        let grant = CompletedGrant {
            identity: ResolvedIdentity {
                user_id: profile.id,
                email: profile.email,
                tenants: profile.tenants.clone(),
            },
            scope: request.scope.clone(),
            props: GrantProps {
                session_id: session.id.clone(),
                access_token: session.access_token.clone(),
                tenants: profile.tenants,
            },
        };

        let redirect = self.engine.complete_authorization(&request, grant).await?;
        info!(session_id = %session.id, "Completed delegated authorization");
        Ok(redirect)
    }

    /// Refresh-token exchange passthrough for the gateway token endpoint.
    pub async fn refresh_passthrough(&self, refresh_token: &str) -> AuthResult<IdentityTokens> {
        self.identity.refresh(refresh_token).await
    }

    /// Load a session for a tool call, refreshing it against the identity
    /// provider when expired. Refresh overwrites the record wholesale.
    pub async fn ensure_fresh(&self, session_id: &str) -> AuthResult<Session> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| AuthError::SessionInvalid("unknown session".to_string()))?;

        if session.is_valid() {
            return Ok(session);
        }

        let refresh_token = session
            .refresh_token
            .clone()
            .ok_or_else(|| AuthError::SessionInvalid("session expired".to_string()))?;

        debug!(session_id = %session.id, "Session expired, refreshing");
        let tokens = self.identity.refresh(&refresh_token).await?;

        let updated = Session {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.or(Some(refresh_token)),
            expires_at: Utc::now().timestamp() + tokens.expires_in,
            ..session
        };
        self.sessions.store(&updated).await?;
        Ok(updated)
    }
}
