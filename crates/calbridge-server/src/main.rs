//! calbridge server entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use calbridge_server::{AppState, ServerConfig, ServerError, router};

#[derive(Debug, Parser)]
#[command(name = "calbridge", version, about = "OAuth2 bridge to Google Calendar")]
struct Cli {
    /// Path to the Google Cloud Console credentials JSON file.
    #[arg(long, env = "CALBRIDGE_CREDENTIALS", default_value = "credentials.json")]
    credentials: PathBuf,

    /// Path to the token file. Defaults to
    /// ~/.local/share/calbridge/tokens.json.
    #[arg(long, env = "CALBRIDGE_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:3001")]
    bind: SocketAddr,

    /// OAuth scope to request (repeatable).
    #[arg(long = "scope")]
    scopes: Vec<String>,

    /// Calendar targeted by event operations.
    #[arg(long, default_value = "primary")]
    calendar_id: String,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.debug {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ServerError> {
    let mut config = ServerConfig::new(cli.credentials)
        .with_bind_addr(cli.bind)
        .with_calendar_id(cli.calendar_id);
    if let Some(path) = cli.token_file {
        config = config.with_token_path(path);
    }
    if !cli.scopes.is_empty() {
        config = config.with_scopes(cli.scopes);
    }
    config.validate()?;

    let bind_addr = config.bind_addr;
    let state = AppState::from_config(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => warn!("failed to listen for shutdown signal: {}", err),
    }
}
