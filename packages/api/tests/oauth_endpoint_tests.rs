// ABOUTME: Endpoint tests for the delegated OAuth surface
// ABOUTME: Redirect shapes, structured errors, and the full authorize/callback/token loop

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use grove_api::{create_router, AppState};
use grove_auth::db::ensure_schema;
use grove_auth::oauth::state::decode_state;
use grove_auth::{AuthConfig, Environment, IdentityConfig};

async fn setup_test_db() -> (SqlitePool, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .unwrap();

    ensure_schema(&pool).await.unwrap();
    (pool, temp_dir)
}

fn test_config(idp_url: &str) -> AuthConfig {
    AuthConfig {
        identity: IdentityConfig {
            base_url: idp_url.to_string(),
            client_id: "grove-gateway".to_string(),
            client_secret: Some("gateway-secret".to_string()),
            redirect_uri: "http://localhost:4101/callback".to_string(),
        },
        issuer: "http://localhost:4101".to_string(),
        sealing_key: Some("test sealing key".to_string()),
        environment: Environment::Development,
        cli_client_id: "grove-cli".to_string(),
    }
}

async fn setup_server(idp_url: &str) -> (TestServer, AppState, TempDir) {
    let (pool, temp_dir) = setup_test_db().await;
    let state = AppState::new(pool, test_config(idp_url)).unwrap();
    let server = TestServer::new(create_router(state.clone())).unwrap();
    (server, state, temp_dir)
}

fn location_url(response: &axum_test::TestResponse) -> Url {
    let location = response.header("location");
    Url::parse(location.to_str().unwrap()).unwrap()
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.to_string())
}

#[tokio::test]
async fn test_authorize_returns_302_to_identity_provider() {
    let (server, _state, _temp) = setup_server("https://accounts.grove.dev").await;

    let response = server
        .get("/authorize")
        .add_query_param("client_id", "agent-platform")
        .add_query_param("redirect_uri", "https://agents.example.com/cb")
        .add_query_param("scope", "tools:read")
        .add_query_param("state", "upstream-csrf")
        .await;

    response.assert_status(StatusCode::FOUND);
    let url = location_url(&response);
    assert_eq!(url.host_str(), Some("accounts.grove.dev"));

    let recovered = decode_state(&query_param(&url, "state").unwrap()).unwrap();
    assert_eq!(recovered.client_id, "agent-platform");
    assert_eq!(
        recovered.redirect_uri.as_deref(),
        Some("https://agents.example.com/cb")
    );
    assert_eq!(recovered.scope.as_deref(), Some("tools:read"));
    assert_eq!(recovered.state.as_deref(), Some("upstream-csrf"));
}

#[tokio::test]
async fn test_authorize_without_client_id_is_invalid_request() {
    let (server, _state, _temp) = setup_server("https://accounts.grove.dev").await;

    let response = server.get("/authorize").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_callback_without_state_is_missing_state() {
    let (server, _state, _temp) = setup_server("https://accounts.grove.dev").await;

    let response = server
        .get("/callback")
        .add_query_param("code", "abc")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "missing_state");
}

#[tokio::test]
async fn test_callback_with_malformed_state_is_invalid_state() {
    let (server, _state, _temp) = setup_server("https://accounts.grove.dev").await;

    let response = server
        .get("/callback")
        .add_query_param("state", "%%%not-a-blob%%%")
        .add_query_param("code", "abc")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_state");
}

#[tokio::test]
async fn test_callback_propagates_provider_denial_verbatim() {
    let (server, _state, _temp) = setup_server("https://accounts.grove.dev").await;

    let response = server
        .get("/callback")
        .add_query_param("error", "access_denied")
        .add_query_param("error_description", "User denied")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "access_denied");
    assert_eq!(body["error_description"], "User denied");
}

#[tokio::test]
async fn test_token_rejects_unknown_grant_type() {
    let (server, _state, _temp) = setup_server("https://accounts.grove.dev").await;

    let response = server
        .post("/token")
        .form(&[("grant_type", "password")])
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn test_refresh_passthrough_surfaces_provider_rejection() {
    let idp = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&idp)
        .await;

    let (server, _state, _temp) = setup_server(&idp.uri()).await;

    let response = server
        .post("/token")
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", "stale-refresh"),
        ])
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test]
async fn test_refresh_passthrough_returns_provider_tokens() {
    let idp = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-access",
            "refresh_token": "fresh-refresh",
            "expires_in": 3600,
            "token_type": "Bearer",
            "scope": null,
        })))
        .mount(&idp)
        .await;

    let (server, _state, _temp) = setup_server(&idp.uri()).await;

    let response = server
        .post("/token")
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", "old-refresh"),
        ])
        .await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["access_token"], "fresh-access");
}

#[tokio::test]
async fn test_full_delegation_loop() {
    let idp = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .and(header("authorization", "Bearer idp-session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "user-1",
            "email": "fern@example.com",
            "tenants": ["tenant-a"],
        })))
        .mount(&idp)
        .await;

    let (server, _state, _temp) = setup_server(&idp.uri()).await;

    // 1. Upstream client starts authorization.
    let response = server
        .get("/authorize")
        .add_query_param("client_id", "agent-platform")
        .add_query_param("redirect_uri", "https://agents.example.com/cb")
        .add_query_param("state", "upstream-csrf")
        .await;
    response.assert_status(StatusCode::FOUND);
    let state_blob = query_param(&location_url(&response), "state").unwrap();

    // 2. Identity provider redirects back with its session token.
    let response = server
        .get("/callback")
        .add_query_param("state", &state_blob)
        .add_query_param("session_token", "idp-session-token")
        .await;
    response.assert_status(StatusCode::FOUND);
    let redirect = location_url(&response);
    assert!(redirect
        .as_str()
        .starts_with("https://agents.example.com/cb?"));
    assert_eq!(
        query_param(&redirect, "state").as_deref(),
        Some("upstream-csrf")
    );
    let code = query_param(&redirect, "code").unwrap();

    // 3. Upstream client exchanges its code at the token endpoint.
    let response = server
        .post("/token")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", "agent-platform"),
            ("redirect_uri", "https://agents.example.com/cb"),
        ])
        .await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["access_token"].as_str().unwrap().starts_with("gat_"));

    // 4. The code was single use.
    let response = server
        .post("/token")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
        ])
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test]
async fn test_callback_unreachable_provider_is_bad_gateway() {
    // Nothing listens on this port.
    let (server, _state, _temp) = setup_server("http://127.0.0.1:1").await;

    let response = server
        .get("/authorize")
        .add_query_param("client_id", "agent-platform")
        .await;
    let state_blob = query_param(&location_url(&response), "state").unwrap();

    let response = server
        .get("/callback")
        .add_query_param("state", &state_blob)
        .add_query_param("code", "idp-code")
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let body: Value = response.json();
    assert_eq!(body["error"], "token_exchange_failed");
}

#[tokio::test]
async fn test_metadata_document() {
    let (server, _state, _temp) = setup_server("https://accounts.grove.dev").await;

    let response = server.get("/.well-known/oauth-authorization-server").await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["issuer"], "http://localhost:4101");
    assert_eq!(
        body["authorization_endpoint"],
        "http://localhost:4101/authorize"
    );
    assert_eq!(body["token_endpoint"], "http://localhost:4101/token");
    assert!(body["grant_types_supported"]
        .as_array()
        .unwrap()
        .iter()
        .any(|g| g == "urn:ietf:params:oauth:grant-type:device_code"));
}
