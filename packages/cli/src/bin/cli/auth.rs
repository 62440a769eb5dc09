// ABOUTME: CLI commands for signing in to the Grove gateway
// ABOUTME: Device-flow login plus logout and status for the stored credentials

use chrono::{Duration, Utc};
use clap::Subcommand;
use colored::*;
use std::process;

use grove_auth::{AuthError, DeviceFlowClient};
use grove_cli::auth::{CredentialsFile, StoredCredentials};
use grove_cli::config::ServerConfig;

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in using the device flow
    Login {
        /// Gateway base URL (defaults to GROVE_GATEWAY_URL)
        #[arg(long)]
        gateway: Option<String>,

        /// Print the verification URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Remove stored credentials
    Logout,

    /// Show authentication status
    Status,
}

impl AuthCommands {
    pub async fn execute(&self) {
        match self {
            AuthCommands::Login {
                gateway,
                no_browser,
            } => login_command(gateway.as_deref(), *no_browser).await,
            AuthCommands::Logout => logout_command().await,
            AuthCommands::Status => status_command().await,
        }
    }
}

async fn login_command(gateway: Option<&str>, no_browser: bool) {
    let gateway = gateway
        .map(str::to_string)
        .unwrap_or_else(ServerConfig::gateway_url);

    let client = match DeviceFlowClient::new(&gateway, ServerConfig::cli_client_id()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            process::exit(1);
        }
    };

    let grant = match client.request_device_code().await {
        Ok(g) => g,
        Err(AuthError::UnknownClient(id)) => {
            eprintln!(
                "{} The gateway does not recognize client id {}",
                "✗".red().bold(),
                id.bold()
            );
            eprintln!();
            eprintln!("Check GROVE_CLI_CLIENT_ID against the gateway configuration.");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("{} Could not start device login: {}", "✗".red().bold(), e);
            process::exit(1);
        }
    };

    println!("{}", "🔐 Grove device login".bold().cyan());
    println!();
    println!("  Your code:  {}", grant.user_code.bold().yellow());
    println!("  Approve at: {}", grant.verification_uri.cyan());
    println!();

    if no_browser {
        println!("Open the URL above and enter the code to continue.");
    } else if let Err(e) = open::that(&grant.verification_uri_complete) {
        println!("⚠️  Could not open browser automatically: {}", e);
        println!("Please visit the URL above and enter the code.");
    }

    println!("📡 Waiting for approval...");

    let token = match client.wait_for_authorization(&grant).await {
        Ok(t) => t,
        Err(AuthError::AccessDenied) => {
            eprintln!("{} Login was denied.", "✗".red().bold());
            process::exit(1);
        }
        Err(AuthError::ExpiredToken) => {
            eprintln!(
                "{} The code expired before approval. Run {} to try again.",
                "✗".red().bold(),
                "grove auth login".yellow()
            );
            process::exit(1);
        }
        Err(e) => {
            eprintln!("{} Login failed: {}", "✗".red().bold(), e);
            process::exit(1);
        }
    };

    let credentials = StoredCredentials {
        token: token.access_token,
        expires_at: Utc::now() + Duration::seconds(token.expires_in),
        gateway_url: gateway.clone(),
    };

    let file = match CredentialsFile::new() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            process::exit(1);
        }
    };
    if let Err(e) = file.save(&credentials).await {
        eprintln!("{} Failed to store credentials: {}", "✗".red().bold(), e);
        process::exit(1);
    }

    println!();
    println!("{} Signed in to {}", "✓".green().bold(), gateway.cyan());
}

async fn logout_command() {
    let file = match CredentialsFile::new() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            process::exit(1);
        }
    };

    match file.clear().await {
        Ok(true) => println!("{} Signed out", "✓".green().bold()),
        Ok(false) => println!("Not signed in."),
        Err(e) => {
            eprintln!("{} Logout failed: {}", "✗".red().bold(), e);
            process::exit(1);
        }
    }
}

async fn status_command() {
    let file = match CredentialsFile::new() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            process::exit(1);
        }
    };

    println!("{}", "🔐 Grove authentication status".bold().cyan());
    println!();

    match file.load().await {
        Ok(Some(credentials)) => {
            let expires = credentials
                .expires_at
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string();
            if credentials.is_valid() {
                println!("  {} Signed in", "✓".green().bold());
                println!("        Gateway: {}", credentials.gateway_url.cyan());
                println!("        Expires: {}", expires.green());
            } else {
                println!("  {} Session expired", "✗".red().bold());
                println!("        Gateway: {}", credentials.gateway_url.cyan());
                println!("        Expired: {}", expires.red());
                println!();
                println!("Use {} to sign in again", "grove auth login".yellow());
            }
        }
        Ok(None) => {
            println!("  {} {}", "✗".red().bold(), "Not signed in".dimmed());
            println!();
            println!("Use {} to authenticate", "grove auth login".yellow());
        }
        Err(e) => {
            eprintln!("{} Failed to read credentials: {}", "✗".red().bold(), e);
            process::exit(1);
        }
    }
}
