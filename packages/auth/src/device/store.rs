// ABOUTME: SQLite-backed store for device authorization codes
// ABOUTME: Approve/deny are compare-and-set; terminal states never flap back

use chrono::Utc;
use rand::Rng;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::device::types::{
    DeviceCodeRecord, DeviceCodeResponse, DeviceCodeStatus, DeviceTokenResponse,
    DEFAULT_POLL_INTERVAL_SECS, DEVICE_CODE_TTL_SECS, DEVICE_TOKEN_TTL_SECS,
};
use crate::error::{AuthError, AuthResult};

/// User codes avoid vowels and lookalike digits so they survive being read
/// out loud.
const USER_CODE_ALPHABET: &[u8] = b"BCDFGHJKLMNPQRSTVWXZ";
const SLOW_DOWN_BUMP_SECS: u64 = 5;

#[derive(Clone)]
pub struct DeviceAuthStore {
    pool: SqlitePool,
}

impl DeviceAuthStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new device authorization and return the client-facing
    /// response. `verification_base` is the public URL of the approval page.
    pub async fn create(
        &self,
        client_id: &str,
        verification_base: &str,
    ) -> AuthResult<DeviceCodeResponse> {
        let device_code = format!("gdc_{}", nanoid::nanoid!(32));
        let user_code = generate_user_code();
        let expires_at = Utc::now().timestamp() + DEVICE_CODE_TTL_SECS;

        sqlx::query(
            r#"
            INSERT INTO device_codes (
                device_code, user_code, client_id, status, interval, expires_at, created_at
            )
            VALUES (?, ?, ?, 'pending', ?, ?, unixepoch())
            "#,
        )
        .bind(&device_code)
        .bind(&user_code)
        .bind(client_id)
        .bind(DEFAULT_POLL_INTERVAL_SECS as i64)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        info!(client_id = %client_id, user_code = %user_code, "Issued device code");

        let verification_uri = format!("{}/device", verification_base.trim_end_matches('/'));
        let verification_uri_complete = format!("{}?user_code={}", verification_uri, user_code);

        Ok(DeviceCodeResponse {
            device_code,
            user_code,
            verification_uri,
            verification_uri_complete,
            expires_in: DEVICE_CODE_TTL_SECS,
            interval: DEFAULT_POLL_INTERVAL_SECS,
        })
    }

    /// One poll from the device. Errors carry the RFC 8628 wire codes;
    /// success returns the token payload, stable across repeated polls.
    pub async fn poll(&self, device_code: &str, client_id: &str) -> AuthResult<DeviceTokenResponse> {
        let record = self
            .get(device_code)
            .await?
            .ok_or_else(|| AuthError::InvalidGrant("unknown device code".to_string()))?;

        if record.client_id != client_id {
            return Err(AuthError::UnknownClient(client_id.to_string()));
        }

        let now = Utc::now().timestamp();

        // Lazy expiry: a pending code past its TTL becomes terminal here.
        if record.status == DeviceCodeStatus::Pending && now >= record.expires_at {
            self.transition(device_code, DeviceCodeStatus::Expired, None, None)
                .await?;
            return Err(AuthError::ExpiredToken);
        }

        match record.status {
            DeviceCodeStatus::Expired => Err(AuthError::ExpiredToken),
            DeviceCodeStatus::Denied => Err(AuthError::AccessDenied),
            DeviceCodeStatus::Authorized => {
                let access_token = record.access_token.ok_or_else(|| {
                    AuthError::Storage("authorized device code has no token".to_string())
                })?;
                Ok(DeviceTokenResponse {
                    access_token,
                    token_type: "Bearer".to_string(),
                    expires_in: DEVICE_TOKEN_TTL_SECS,
                    scope: None,
                })
            }
            DeviceCodeStatus::Pending => {
                if let Some(last) = record.last_polled_at {
                    if now - last < record.interval as i64 {
                        let bumped = record.interval + SLOW_DOWN_BUMP_SECS;
                        sqlx::query(
                            "UPDATE device_codes SET interval = ?, last_polled_at = ? WHERE device_code = ?",
                        )
                        .bind(bumped as i64)
                        .bind(now)
                        .bind(device_code)
                        .execute(&self.pool)
                        .await?;
                        return Err(AuthError::SlowDown { interval: bumped });
                    }
                }
                sqlx::query("UPDATE device_codes SET last_polled_at = ? WHERE device_code = ?")
                    .bind(now)
                    .bind(device_code)
                    .execute(&self.pool)
                    .await?;
                Err(AuthError::AuthorizationPending)
            }
        }
    }

    /// Approve a pending code. The transition is a single conditional
    /// update; a racing second decision observes the already-decided state.
    pub async fn approve(
        &self,
        user_code: &str,
        user_id: &str,
        access_token: &str,
    ) -> AuthResult<DeviceCodeRecord> {
        let result = sqlx::query(
            r#"
            UPDATE device_codes
            SET status = 'authorized', user_id = ?, access_token = ?
            WHERE user_code = ? AND status = 'pending' AND expires_at > unixepoch()
            "#,
        )
        .bind(user_id)
        .bind(access_token)
        .bind(user_code)
        .execute(&self.pool)
        .await?;

        let record = self
            .get_by_user_code(user_code)
            .await?
            .ok_or_else(|| AuthError::InvalidGrant("unknown user code".to_string()))?;

        if result.rows_affected() == 1 {
            info!(user_code = %user_code, "Device code approved");
        } else {
            debug!(user_code = %user_code, status = %record.status, "Approve was a no-op");
        }
        Ok(record)
    }

    /// Deny a pending code. Same compare-and-set shape as `approve`.
    pub async fn deny(&self, user_code: &str) -> AuthResult<DeviceCodeRecord> {
        let result = sqlx::query(
            r#"
            UPDATE device_codes
            SET status = 'denied'
            WHERE user_code = ? AND status = 'pending'
            "#,
        )
        .bind(user_code)
        .execute(&self.pool)
        .await?;

        let record = self
            .get_by_user_code(user_code)
            .await?
            .ok_or_else(|| AuthError::InvalidGrant("unknown user code".to_string()))?;

        if result.rows_affected() == 1 {
            info!(user_code = %user_code, "Device code denied");
        }
        Ok(record)
    }

    /// Expire pending codes past their TTL. Returns how many transitioned.
    pub async fn sweep_expired(&self) -> AuthResult<u64> {
        let result = sqlx::query(
            "UPDATE device_codes SET status = 'expired' WHERE status = 'pending' AND expires_at <= unixepoch()",
        )
        .execute(&self.pool)
        .await?;

        let swept = result.rows_affected();
        if swept > 0 {
            debug!("Expired {} stale device codes", swept);
        }
        Ok(swept)
    }

    pub async fn get(&self, device_code: &str) -> AuthResult<Option<DeviceCodeRecord>> {
        let row = sqlx::query(
            "SELECT device_code, user_code, client_id, status, user_id, access_token, interval, expires_at, last_polled_at FROM device_codes WHERE device_code = ?",
        )
        .bind(device_code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    pub async fn get_by_user_code(&self, user_code: &str) -> AuthResult<Option<DeviceCodeRecord>> {
        let row = sqlx::query(
            "SELECT device_code, user_code, client_id, status, user_id, access_token, interval, expires_at, last_polled_at FROM device_codes WHERE user_code = ?",
        )
        .bind(user_code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    async fn transition(
        &self,
        device_code: &str,
        to: DeviceCodeStatus,
        user_id: Option<&str>,
        access_token: Option<&str>,
    ) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE device_codes
            SET status = ?, user_id = COALESCE(?, user_id), access_token = COALESCE(?, access_token)
            WHERE device_code = ? AND status = 'pending'
            "#,
        )
        .bind(to.to_string())
        .bind(user_id)
        .bind(access_token)
        .bind(device_code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn record_from_row(row: sqlx::sqlite::SqliteRow) -> AuthResult<DeviceCodeRecord> {
    let status: String = row.try_get("status")?;
    let interval: i64 = row.try_get("interval")?;
    Ok(DeviceCodeRecord {
        device_code: row.try_get("device_code")?,
        user_code: row.try_get("user_code")?,
        client_id: row.try_get("client_id")?,
        status: status.parse()?,
        user_id: row.try_get("user_id")?,
        access_token: row.try_get("access_token")?,
        interval: interval.max(0) as u64,
        expires_at: row.try_get("expires_at")?,
        last_polled_at: row.try_get("last_polled_at")?,
    })
}

/// Generate a short human-readable code, `XXXX-XXXX`.
fn generate_user_code() -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(9);
    for i in 0..8 {
        if i == 4 {
            code.push('-');
        }
        let idx = rng.gen_range(0..USER_CODE_ALPHABET.len());
        code.push(USER_CODE_ALPHABET[idx] as char);
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_code_shape() {
        let code = generate_user_code();
        assert_eq!(code.len(), 9);
        assert_eq!(code.chars().nth(4), Some('-'));
        assert!(code
            .chars()
            .filter(|c| *c != '-')
            .all(|c| USER_CODE_ALPHABET.contains(&(c as u8))));
    }
}
