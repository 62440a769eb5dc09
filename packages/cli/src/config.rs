use std::env;
use std::num::ParseIntError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CliError>;

/// Settings for the `grove serve` command.
#[derive(Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: String,
}

impl ServerConfig {
    pub fn from_env() -> CliResult<Self> {
        let port_str = env::var("GROVE_PORT").unwrap_or_else(|_| "4101".to_string());
        let port = port_str.parse::<u16>()?;
        if port == 0 {
            return Err(CliError::PortOutOfRange(port));
        }

        let database_url = match env::var("GROVE_DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let home_dir = dirs::home_dir().ok_or_else(|| {
                    CliError::Config("Could not determine home directory".to_string())
                })?;
                let db_path = home_dir.join(".grove").join("grove.db");
                if let Some(parent) = db_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                format!("sqlite://{}?mode=rwc", db_path.display())
            }
        };

        Ok(ServerConfig { port, database_url })
    }

    /// Where the CLI reaches the gateway from the client side.
    pub fn gateway_url() -> String {
        env::var("GROVE_GATEWAY_URL").unwrap_or_else(|_| "http://localhost:4101".to_string())
    }

    /// Client id the CLI presents on the device flow.
    pub fn cli_client_id() -> String {
        env::var("GROVE_CLI_CLIENT_ID").unwrap_or_else(|_| "grove-cli".to_string())
    }
}
