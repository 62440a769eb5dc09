// ABOUTME: Shared application state for the gateway's handlers
// ABOUTME: Every dependency is injected here, nothing is discovered at runtime

use std::sync::Arc;

use sqlx::SqlitePool;

use grove_auth::{
    AuthConfig, AuthResult, DelegationFlow, DeviceAuthStore, GrantGateway, IdentityClient,
    LocalGrantEngine, SessionStore, TokenSealer,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuthConfig>,
    pub flow: Arc<DelegationFlow>,
    pub engine: Arc<dyn GrantGateway>,
    pub sessions: SessionStore,
    pub devices: DeviceAuthStore,
}

impl AppState {
    /// Wire the gateway up with the in-process grant engine.
    pub fn new(pool: SqlitePool, config: AuthConfig) -> AuthResult<Self> {
        Self::with_engine(pool, config, Arc::new(LocalGrantEngine::new()))
    }

    /// Wire the gateway up against a caller-provided grant engine.
    pub fn with_engine(
        pool: SqlitePool,
        config: AuthConfig,
        engine: Arc<dyn GrantGateway>,
    ) -> AuthResult<Self> {
        let sealer = TokenSealer::from_optional_key(config.sealing_key.as_deref())?;
        let sessions = SessionStore::new(pool.clone(), sealer);
        let devices = DeviceAuthStore::new(pool);
        let identity = IdentityClient::new(config.identity.clone())?;
        let flow = Arc::new(DelegationFlow::new(
            identity,
            engine.clone(),
            sessions.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            flow,
            engine,
            sessions,
            devices,
        })
    }
}
