use anyhow::Result;
use clap::{Parser, Subcommand};
use reportd::{config::ServerConfig, observability, rest, storage::Storage, AppContext};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "reportd",
    about = "Internal daily-report and monthly-goal tracking daemon",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP API port
    #[arg(long, env = "REPORTD_PORT")]
    port: Option<u16>,

    /// Data directory for config and the SQLite database
    #[arg(long, env = "REPORTD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "REPORTD_LOG")]
    log: Option<String>,

    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "REPORTD_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "REPORTD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the server (default when no subcommand given).
    ///
    /// Examples:
    ///   reportd serve
    ///   reportd
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Arc::new(ServerConfig::new(
        args.port,
        args.data_dir,
        args.log,
        args.bind_address,
    ));

    let _log_guard = observability::setup_logging(
        &config.log,
        args.log_file.as_deref(),
        &config.log_format,
    );

    match args.command {
        Some(Command::Serve) | None => serve(config).await,
    }
}

async fn serve(config: Arc<ServerConfig>) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        "reportd starting"
    );

    let storage = Arc::new(
        Storage::new_with_slow_query(
            &config.data_dir,
            config.observability.slow_query_threshold_ms,
        )
        .await?,
    );

    bootstrap_admin(&config, &storage).await?;

    let ctx = Arc::new(AppContext::new(config, storage));
    rest::start_rest_server(ctx).await
}

/// First-run bootstrap: with an empty user table nobody could ever log
/// in, so seed an admin account using the configured reset password.
async fn bootstrap_admin(config: &ServerConfig, storage: &Storage) -> Result<()> {
    if storage.count_users().await? > 0 {
        return Ok(());
    }
    storage
        .insert_user(
            "admin",
            &config.reset_password,
            "Administrator",
            "",
            "",
            true,
        )
        .await?;
    warn!("user table was empty — seeded 'admin' with the default password; change it");
    Ok(())
}
