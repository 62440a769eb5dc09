//! Credential storage for the Grove CLI

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::config::{CliError, CliResult};

/// Token information stored locally after a device-flow login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub gateway_url: String,
}

impl StoredCredentials {
    /// Check if the token is expired (with 5 minute buffer)
    pub fn is_expired(&self) -> bool {
        let now = Utc::now();
        let buffer = Duration::minutes(5);
        self.expires_at < now + buffer
    }

    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }
}

/// Manages the credentials file under the user's home directory.
#[derive(Clone)]
pub struct CredentialsFile {
    path: PathBuf,
}

impl CredentialsFile {
    pub fn new() -> CliResult<Self> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not determine home directory".to_string()))?;
        Ok(Self {
            path: home_dir.join(".grove").join("auth.toml"),
        })
    }

    /// Use an explicit path instead of the default location.
    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn load(&self) -> CliResult<Option<StoredCredentials>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await?;
        let credentials: StoredCredentials = toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("Invalid auth configuration: {}", e)))?;
        Ok(Some(credentials))
    }

    pub async fn save(&self, credentials: &StoredCredentials) -> CliResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_content = toml::to_string_pretty(credentials)
            .map_err(|e| CliError::Config(format!("Failed to serialize credentials: {}", e)))?;
        fs::write(&self.path, toml_content).await?;
        Ok(())
    }

    /// Remove stored credentials (logout). Missing file is fine.
    pub async fn clear(&self) -> CliResult<bool> {
        if self.path.exists() {
            fs::remove_file(&self.path).await?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn credentials_expiring_in(minutes: i64) -> StoredCredentials {
        StoredCredentials {
            token: "gst_test".to_string(),
            expires_at: Utc::now() + Duration::minutes(minutes),
            gateway_url: "http://localhost:4101".to_string(),
        }
    }

    #[test]
    fn test_credential_expiry() {
        assert!(credentials_expiring_in(-10).is_expired());
        // Inside the 5-minute buffer counts as expired
        assert!(credentials_expiring_in(3).is_expired());
        assert!(credentials_expiring_in(60).is_valid());
    }

    #[tokio::test]
    async fn test_save_load_clear_round_trip() {
        let dir = TempDir::new().unwrap();
        let file = CredentialsFile::at_path(dir.path().join("auth.toml"));

        assert!(file.load().await.unwrap().is_none());

        let credentials = credentials_expiring_in(60);
        file.save(&credentials).await.unwrap();

        let loaded = file.load().await.unwrap().unwrap();
        assert_eq!(loaded.token, credentials.token);
        assert_eq!(loaded.gateway_url, credentials.gateway_url);

        assert!(file.clear().await.unwrap());
        assert!(!file.clear().await.unwrap());
        assert!(file.load().await.unwrap().is_none());
    }
}
