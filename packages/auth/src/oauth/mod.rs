// ABOUTME: OAuth module for the delegated authorization flow
// ABOUTME: Includes the state codec, PKCE, identity client, sessions, and grant engine

pub mod delegation;
pub mod engine;
pub mod identity;
pub mod pkce;
pub mod seal;
pub mod session;
pub mod state;

pub use delegation::{
    AuthorizeParams, CallbackParams, CompletedGrant, DelegationFlow, GrantGateway, GrantProps,
    GrantTokens, ResolvedIdentity,
};
pub use engine::LocalGrantEngine;
pub use identity::{IdentityClient, IdentityProfile, IdentityTokens};
pub use seal::TokenSealer;
pub use session::{Session, SessionStore};
pub use state::PendingAuthRequest;
