use clap::{Parser, Subcommand};
use colored::*;
use std::process;

mod cli;

use cli::auth::AuthCommands;
use grove_api::{create_router, AppState};
use grove_auth::{db, AuthConfig};
use grove_cli::config::ServerConfig;

#[derive(Parser)]
#[command(name = "grove")]
#[command(about = "Grove CLI - delegated-auth gateway for the Grove platform")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway server
    Serve {
        #[arg(long, default_value = "0", help = "Listen port (0 = GROVE_PORT or 4101)")]
        port: u16,
    },
    /// Manage authentication
    #[command(subcommand)]
    Auth(AuthCommands),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match handle_command(cli.command).await {
        Ok(_) => {}
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

async fn handle_command(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve { port } => serve(port).await,
        Commands::Auth(auth) => {
            auth.execute().await;
            Ok(())
        }
    }
}

async fn serve(port_override: u16) -> Result<(), Box<dyn std::error::Error>> {
    let auth_config = AuthConfig::from_env()?;
    init_tracing(&auth_config);

    let server_config = ServerConfig::from_env()?;
    let port = if port_override != 0 {
        port_override
    } else {
        server_config.port
    };

    let pool = sqlx::SqlitePool::connect(&server_config.database_url).await?;
    db::ensure_schema(&pool).await?;

    let state = AppState::new(pool, auth_config)?;
    spawn_expiry_sweep(&state);
    let app = create_router(state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!(
        "{} Gateway listening on {}",
        "✓".green().bold(),
        addr.cyan()
    );
    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically drop expired sessions and expire stale device codes.
fn spawn_expiry_sweep(state: &AppState) {
    let sessions = state.sessions.clone();
    let devices = state.devices.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            ticker.tick().await;
            if let Err(e) = sessions.sweep_expired().await {
                tracing::warn!("Session sweep failed: {}", e);
            }
            if let Err(e) = devices.sweep_expired().await {
                tracing::warn!("Device code sweep failed: {}", e);
            }
        }
    });
}

fn init_tracing(config: &AuthConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.environment.default_log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
