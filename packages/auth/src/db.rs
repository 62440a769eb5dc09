// ABOUTME: Schema bootstrap for the auth database
// ABOUTME: Sessions and device codes are simple single-owner key-value-ish tables

use sqlx::SqlitePool;

use crate::error::AuthResult;

/// Create the auth tables when missing. Safe to call on every startup.
pub async fn ensure_schema(pool: &SqlitePool) -> AuthResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            email TEXT NOT NULL,
            tenants TEXT NOT NULL DEFAULT '[]',
            access_token TEXT NOT NULL,
            refresh_token TEXT,
            expires_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL DEFAULT (unixepoch()),
            updated_at INTEGER NOT NULL DEFAULT (unixepoch())
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS device_codes (
            device_code TEXT PRIMARY KEY,
            user_code TEXT NOT NULL UNIQUE,
            client_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            user_id TEXT,
            access_token TEXT,
            interval INTEGER NOT NULL DEFAULT 5,
            expires_at INTEGER NOT NULL,
            last_polled_at INTEGER,
            created_at INTEGER NOT NULL DEFAULT (unixepoch())
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
