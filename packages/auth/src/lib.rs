// ABOUTME: Grove authentication library: delegated OAuth and device login
// ABOUTME: Fronts an upstream OAuth client while Grove Accounts verifies the user

pub mod config;
pub mod db;
pub mod device;
pub mod error;
pub mod oauth;

// Re-export main types
pub use config::{AuthConfig, Environment, IdentityConfig};
pub use device::{DeviceAuthStore, DeviceFlowClient};
pub use error::{AuthError, AuthResult};
pub use oauth::{
    DelegationFlow, GrantGateway, IdentityClient, LocalGrantEngine, PendingAuthRequest, Session,
    SessionStore, TokenSealer,
};
