// ABOUTME: Environment-driven configuration for the gateway and CLI
// ABOUTME: Recognizes identity-provider credentials, sealing key, and the environment tag

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::{AuthError, AuthResult};

/// Deployment environment tag. Controls log verbosity only; protocol
/// behavior is identical across environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            Self::Development => "debug",
            Self::Staging => "info",
            Self::Production => "info",
        }
    }
}

impl FromStr for Environment {
    type Err = AuthError;

    fn from_str(s: &str) -> AuthResult<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(AuthError::Configuration(format!(
                "Unknown environment: {}. Supported: development, staging, production",
                s
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Connection details for the Grove Accounts identity provider.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
}

/// Gateway configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub identity: IdentityConfig,
    /// Public base URL this gateway is reachable at; used for metadata and
    /// device verification URIs.
    pub issuer: String,
    /// AEAD key for tokens at rest. Absent means plaintext storage.
    pub sealing_key: Option<String>,
    pub environment: Environment,
    /// Client id the `grove` CLI authenticates with on the device flow.
    pub cli_client_id: String,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let base_url = env::var("GROVE_ACCOUNTS_URL")
            .unwrap_or_else(|_| "https://accounts.grove.dev".to_string());
        let client_id =
            env::var("GROVE_ACCOUNTS_CLIENT_ID").unwrap_or_else(|_| "grove-gateway".to_string());
        let client_secret = env::var("GROVE_ACCOUNTS_CLIENT_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let issuer =
            env::var("GROVE_ISSUER").unwrap_or_else(|_| "http://localhost:4101".to_string());
        let redirect_uri =
            env::var("GROVE_REDIRECT_URI").unwrap_or_else(|_| format!("{}/callback", issuer));

        let sealing_key = env::var("GROVE_SEALING_KEY").ok().filter(|s| !s.is_empty());

        let environment = env::var("GROVE_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .parse::<Environment>()?;

        let cli_client_id =
            env::var("GROVE_CLI_CLIENT_ID").unwrap_or_else(|_| "grove-cli".to_string());

        Ok(AuthConfig {
            identity: IdentityConfig {
                base_url,
                client_id,
                client_secret,
                redirect_uri,
            },
            issuer,
            sealing_key,
            environment,
            cli_client_id,
        })
    }
}
