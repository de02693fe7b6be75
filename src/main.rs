use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use gymd::config::GymConfig;
use gymd::ipc::event::EventBroadcaster;
use gymd::storage::Storage;
use gymd::AppContext;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gymd", version, about = "Gym membership daemon")]
struct Args {
    /// WebSocket server port
    #[arg(short, long, env = "GYMD_PORT")]
    port: Option<u16>,

    /// Data directory (database, auth token, config.toml)
    #[arg(short, long, env = "GYMD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level filter, e.g. "debug" or "info,gymd=trace"
    #[arg(short, long, env = "GYMD_LOG")]
    log: Option<String>,

    /// Bind address for the WebSocket server
    #[arg(long, env = "GYMD_BIND")]
    bind_address: Option<String>,

    /// Also write logs to daily-rotated files in this directory
    #[arg(long, env = "GYMD_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon (default when no subcommand is given)
    Serve,
    /// Query a running daemon's health endpoint
    Status {
        /// Print the raw JSON health document
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = GymConfig::new(
        args.port,
        args.data_dir.clone(),
        args.log.clone(),
        args.bind_address.clone(),
    );

    match args.command {
        Some(Command::Status { json }) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(status(&config, json))
        }
        Some(Command::Serve) | None => {
            // Keep the file-appender guard alive for the daemon's lifetime.
            let _guard = init_logging(&config, args.log_dir.as_deref());
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_server(config))
        }
    }
}

fn init_logging(
    config: &GymConfig,
    log_dir: Option<&std::path::Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_new(&config.log).unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "gymd.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            if config.log_format == "json" {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .json()
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .with_ansi(false)
                    .init();
            }
            Some(guard)
        }
        None => {
            if config.log_format == "json" {
                tracing_subscriber::fmt().with_env_filter(filter).json().init();
            } else {
                tracing_subscriber::fmt().with_env_filter(filter).init();
            }
            None
        }
    }
}

async fn run_server(config: GymConfig) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        port = config.port,
        "starting gymd"
    );

    let storage = Storage::new_with_slow_query(
        &config.data_dir,
        config.observability.slow_query_threshold_ms,
    )
    .await
    .context("failed to open database")?;

    storage.ensure_default_admin().await?;

    // Auth is the only thing keeping other local processes off the RPC
    // port, so failure to set it up is fatal.
    let auth_token = gymd::ipc::auth::get_or_create_token(&config.data_dir)
        .context("failed to create auth token")?;

    let ctx = AppContext {
        config: Arc::new(config),
        storage: Arc::new(storage),
        broadcaster: EventBroadcaster::new(),
        started_at: Instant::now(),
        auth_token,
    };

    tokio::spawn(gymd::notifications::run(ctx.clone()));
    tokio::spawn(maintenance_loop(ctx.clone()));

    gymd::ipc::run(Arc::new(ctx)).await
}

/// Daily housekeeping: prune old notification-log rows, then VACUUM.
/// First run is delayed an hour so startup stays fast.
async fn maintenance_loop(ctx: AppContext) {
    tokio::time::sleep(Duration::from_secs(60 * 60)).await;
    loop {
        let keep = ctx.config.notification_log_keep_days;
        match ctx.storage.prune_notification_log(keep).await {
            Ok(0) => {}
            Ok(n) => {
                info!(pruned = n, "pruned notification log");
                if let Err(e) = ctx.storage.vacuum().await {
                    warn!("vacuum failed: {e:#}");
                }
            }
            Err(e) => error!("notification log prune failed: {e:#}"),
        }
        tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
    }
}

/// `gymd status` — plain HTTP against the daemon's health endpoint, so it
/// works from shell scripts without a WebSocket client.
async fn status(config: &GymConfig, json: bool) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let addr = format!("127.0.0.1:{}", config.port);
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("gymd is not running on {addr}"))?;

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b)
        .unwrap_or_default();
    let health: serde_json::Value =
        serde_json::from_str(body).context("unexpected health response")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&health)?);
    } else {
        println!("gymd {} on port {}", health["version"].as_str().unwrap_or("?"), config.port);
        println!("  status:  {}", health["status"].as_str().unwrap_or("?"));
        println!("  uptime:  {}s", health["uptime"].as_u64().unwrap_or(0));
        println!("  db ok:   {}", health["dbOk"].as_bool().unwrap_or(false));
    }
    Ok(())
}
