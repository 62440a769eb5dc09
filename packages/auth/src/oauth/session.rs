// ABOUTME: Session records and their SQLite-backed store
// ABOUTME: Sessions map an opaque id to cached credential material and identity

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::{debug, error};

use crate::error::{AuthError, AuthResult};
use crate::oauth::seal::TokenSealer;

/// Server-side delegation state for one authenticated user. Created once per
/// successful authentication; each record is only ever written by the flow
/// that owns it, so updates are wholesale overwrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub tenants: Vec<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp
    pub expires_at: i64,
}

impl Session {
    /// Check if the session is expired with a 5-minute buffer
    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp();
        let buffer = Duration::minutes(5).num_seconds();
        self.expires_at < now + buffer
    }

    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }
}

/// Session storage over an injected SQLite pool.
#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
    sealer: TokenSealer,
}

impl SessionStore {
    pub fn new(pool: SqlitePool, sealer: TokenSealer) -> Self {
        Self { pool, sealer }
    }

    /// Store a session, overwriting any previous record wholesale.
    pub async fn store(&self, session: &Session) -> AuthResult<()> {
        debug!("Storing session for user: {}", session.user_id);

        let sealed_access = self.sealer.seal(&session.access_token).map_err(|e| {
            error!("Failed to seal access token: {}", e);
            e
        })?;
        let sealed_refresh = match &session.refresh_token {
            Some(rt) => Some(self.sealer.seal(rt)?),
            None => None,
        };
        let tenants = serde_json::to_string(&session.tenants)?;

        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, user_id, email, tenants, access_token, refresh_token,
                expires_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, unixepoch(), unixepoch())
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                email = excluded.email,
                tenants = excluded.tenants,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                updated_at = unixepoch()
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.email)
        .bind(&tenants)
        .bind(&sealed_access)
        .bind(&sealed_refresh)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to store session: {}", e);
            AuthError::Storage(format!("Failed to store session: {}", e))
        })?;

        Ok(())
    }

    /// Get a session by id.
    pub async fn get(&self, id: &str) -> AuthResult<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, email, tenants, access_token, refresh_token, expires_at
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let sealed_access: String = row.try_get("access_token")?;
                let access_token = self.sealer.open(&sealed_access)?;

                let sealed_refresh: Option<String> = row.try_get("refresh_token")?;
                let refresh_token = match sealed_refresh {
                    Some(sealed) => Some(self.sealer.open(&sealed)?),
                    None => None,
                };

                let tenants_json: String = row.try_get("tenants")?;
                let tenants: Vec<String> = serde_json::from_str(&tenants_json)?;

                Ok(Some(Session {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    email: row.try_get("email")?,
                    tenants,
                    access_token,
                    refresh_token,
                    expires_at: row.try_get("expires_at")?,
                }))
            }
            None => Ok(None),
        }
    }

    /// Delete a session (logout).
    pub async fn delete(&self, id: &str) -> AuthResult<()> {
        debug!("Deleting session {}", id);

        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Remove sessions whose expiry has passed. Returns how many were swept.
    pub async fn sweep_expired(&self) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < unixepoch()")
            .execute(&self.pool)
            .await?;

        let swept = result.rows_affected();
        if swept > 0 {
            debug!("Swept {} expired sessions", swept);
        }
        Ok(swept)
    }
}
