// ABOUTME: Endpoint tests for the device authorization grant
// ABOUTME: The concrete issue/poll/approve scenario plus denial and auth guards

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::Utc;
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tempfile::TempDir;

use grove_api::{create_router, AppState};
use grove_auth::db::ensure_schema;
use grove_auth::{AuthConfig, Environment, IdentityConfig, Session};

const DEVICE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

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

async fn setup_server() -> (TestServer, AppState, TempDir) {
    let (pool, temp_dir) = setup_test_db().await;
    let config = AuthConfig {
        identity: IdentityConfig {
            base_url: "https://accounts.grove.dev".to_string(),
            client_id: "grove-gateway".to_string(),
            client_secret: None,
            redirect_uri: "http://localhost:4101/callback".to_string(),
        },
        issuer: "http://localhost:4101".to_string(),
        sealing_key: Some("test sealing key".to_string()),
        environment: Environment::Development,
        cli_client_id: "grove-cli".to_string(),
    };
    let state = AppState::new(pool, config).unwrap();
    let server = TestServer::new(create_router(state.clone())).unwrap();
    (server, state, temp_dir)
}

/// Store a browser session for the approving user and return its bearer.
async fn signed_in_user(state: &AppState) -> String {
    let session = Session {
        id: "sess-approver".to_string(),
        user_id: "user-1".to_string(),
        email: "fern@example.com".to_string(),
        tenants: vec!["tenant-a".to_string()],
        access_token: "sess-approver".to_string(),
        refresh_token: None,
        expires_at: Utc::now().timestamp() + 3600,
    };
    state.sessions.store(&session).await.unwrap();
    session.id
}

fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

#[tokio::test]
async fn test_device_login_end_to_end() {
    let (server, state, _temp) = setup_server().await;

    // Request a device code.
    let response = server
        .post("/auth/device-code")
        .json(&serde_json::json!({ "client_id": "grove-cli" }))
        .await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    let device_code = body["device_code"].as_str().unwrap().to_string();
    let user_code = body["user_code"].as_str().unwrap().to_string();
    assert!(body["verification_uri"].as_str().unwrap().ends_with("/device"));
    assert_eq!(body["expires_in"], 900);
    assert_eq!(body["interval"], 5);

    // Polling immediately is pending.
    let response = server
        .post("/token")
        .form(&[
            ("grant_type", DEVICE_GRANT),
            ("device_code", device_code.as_str()),
            ("client_id", "grove-cli"),
        ])
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "authorization_pending");

    // The signed-in user approves the code.
    let token = signed_in_user(&state).await;
    let (name, value) = bearer(&token);
    let response = server
        .post("/auth/device-code/verify")
        .add_header(name, value)
        .json(&serde_json::json!({ "user_code": user_code, "approve": true }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "authorized");

    // The very next poll returns the token payload.
    let response = server
        .post("/token")
        .form(&[
            ("grant_type", DEVICE_GRANT),
            ("device_code", device_code.as_str()),
            ("client_id", "grove-cli"),
        ])
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    let access_token = body["access_token"].as_str().unwrap().to_string();
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);

    // Repeated polls return the same payload.
    let response = server
        .post("/token")
        .form(&[
            ("grant_type", DEVICE_GRANT),
            ("device_code", device_code.as_str()),
            ("client_id", "grove-cli"),
        ])
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["access_token"], access_token.as_str());

    // The minted token is a working session for tool calls.
    let session = state.sessions.get(&access_token).await.unwrap().unwrap();
    assert_eq!(session.user_id, "user-1");
    assert_eq!(session.tenants, vec!["tenant-a"]);
}

#[tokio::test]
async fn test_device_code_unknown_client() {
    let (server, _state, _temp) = setup_server().await;

    let response = server
        .post("/auth/device-code")
        .json(&serde_json::json!({ "client_id": "impostor-cli" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_client");
}

#[tokio::test]
async fn test_verify_requires_session() {
    let (server, _state, _temp) = setup_server().await;

    let response = server
        .post("/auth/device-code/verify")
        .json(&serde_json::json!({ "user_code": "BCDF-GHJK", "approve": true }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let body: Value = response.json();
    assert_eq!(body["error"], "session_invalid");
}

#[tokio::test]
async fn test_denied_code_polls_access_denied_stably() {
    let (server, state, _temp) = setup_server().await;

    let response = server
        .post("/auth/device-code")
        .json(&serde_json::json!({ "client_id": "grove-cli" }))
        .await;
    let body: Value = response.json();
    let device_code = body["device_code"].as_str().unwrap().to_string();
    let user_code = body["user_code"].as_str().unwrap().to_string();

    let token = signed_in_user(&state).await;
    let (name, value) = bearer(&token);
    let response = server
        .post("/auth/device-code/verify")
        .add_header(name, value)
        .json(&serde_json::json!({ "user_code": user_code, "approve": false }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "denied");

    for _ in 0..2 {
        let response = server
            .post("/token")
            .form(&[
                ("grant_type", DEVICE_GRANT),
                ("device_code", device_code.as_str()),
                ("client_id", "grove-cli"),
            ])
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "access_denied");
    }
}

#[tokio::test]
async fn test_fast_polls_get_slow_down_with_interval() {
    let (server, _state, _temp) = setup_server().await;

    let response = server
        .post("/auth/device-code")
        .json(&serde_json::json!({ "client_id": "grove-cli" }))
        .await;
    let body: Value = response.json();
    let device_code = body["device_code"].as_str().unwrap().to_string();

    let form = [
        ("grant_type", DEVICE_GRANT),
        ("device_code", device_code.as_str()),
        ("client_id", "grove-cli"),
    ];

    let response = server.post("/token").form(&form).await;
    let body: Value = response.json();
    assert_eq!(body["error"], "authorization_pending");

    let response = server.post("/token").form(&form).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "slow_down");
    assert_eq!(body["interval"], 10);
}
