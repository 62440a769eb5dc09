// ABOUTME: HTTP API layer for the Grove gateway providing routing and handlers
// ABOUTME: Integration layer over the auth core and the downstream service clients

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod device_handlers;
pub mod oauth_handlers;
pub mod response;
pub mod state;
pub mod tools_handlers;

pub use state::AppState;

/// Creates the delegated OAuth router
pub fn create_oauth_router() -> Router<AppState> {
    Router::new()
        .route("/authorize", get(oauth_handlers::authorize))
        .route("/callback", get(oauth_handlers::callback))
        .route("/token", post(oauth_handlers::token))
        .route("/auth/logout", post(oauth_handlers::logout))
        .route(
            "/.well-known/oauth-authorization-server",
            get(oauth_handlers::oauth_metadata),
        )
}

/// Creates the device authorization router
pub fn create_device_router() -> Router<AppState> {
    Router::new()
        .route("/auth/device-code", post(device_handlers::request_device_code))
        .route(
            "/auth/device-code/verify",
            post(device_handlers::verify_device_code),
        )
        .route("/device", get(device_handlers::verification_page))
}

/// Creates the tool router
pub fn create_tools_router() -> Router<AppState> {
    Router::new().route("/tools/{tool}", post(tools_handlers::invoke_tool))
}

/// Assemble the full gateway application.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(create_oauth_router())
        .merge(create_device_router())
        .merge(create_tools_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
