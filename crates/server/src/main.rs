use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use torrentdb_core::{
    load_config, validate_config, Config, ConfigError, SourceIdentity, SourceRegistry,
    SqliteTorrentStore, TorrentStore, UpdateConfig, UpdateEngine,
};
use torrentdb_server::api::create_router;
use torrentdb_server::commands;
use torrentdb_server::state::AppState;

/// Default configuration file, used when no path is given.
const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(author, version, about = "Incremental mirror of torrent tracker listings", long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, env = "TORRENTDB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the JSON API over stored torrents.
    Daemon,
    /// Fetch new items of one source.
    Update {
        /// Registered source name, e.g. `rutor`.
        source: String,
    },
    /// Fetch new items of every registered source.
    UpdateAll {
        /// Configuration file; overrides `--config`.
        #[arg(value_name = "CONFIG")]
        config_path: Option<PathBuf>,
    },
    /// List registered sources.
    Sources,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `TORRENTDB_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("TORRENTDB_LOG_FORMAT").is_ok_and(|format| format == "json") {
        registry.with(fmt_layer.json()).init();
    } else {
        registry.with(fmt_layer).init();
    }
}

/// Returns whether the process should exit successfully.
async fn run(cli: Cli) -> Result<bool> {
    let registry = Arc::new(SourceRegistry::builtin());

    let config_path = match &cli.command {
        Command::UpdateAll {
            config_path: Some(path),
        } => Some(path.clone()),
        _ => cli.config.clone(),
    };

    match cli.command {
        Command::Sources => {
            for name in registry.names() {
                println!("{}", name);
            }
            Ok(true)
        }
        Command::Update { source } => {
            let config = load(config_path.as_deref())?;
            let engine = build_engine(&config, registry)?;
            Ok(commands::update_one(&engine, &source).await)
        }
        Command::UpdateAll { .. } => {
            let config = load(config_path.as_deref())?;
            let engine = build_engine(&config, registry)?;
            Ok(commands::update_every(&engine).await)
        }
        Command::Daemon => {
            let config = load(config_path.as_deref())?;
            serve(config, registry).await?;
            Ok(true)
        }
    }
}

/// Load and validate configuration.
///
/// A missing default file falls back to built-in defaults; a missing file
/// that was asked for explicitly is an error.
fn load(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => match load_config(Path::new(DEFAULT_CONFIG)) {
            Ok(config) => config,
            Err(ConfigError::FileNotFound(_)) => {
                info!("No {} found, using defaults", DEFAULT_CONFIG);
                Config::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to load {}", DEFAULT_CONFIG));
            }
        },
    };

    validate_config(&config).context("Configuration validation failed")?;
    info!("Database path: {:?}", config.database.path);
    Ok(config)
}

fn open_store(config: &Config) -> Result<Arc<dyn TorrentStore>> {
    let store = SqliteTorrentStore::new(&config.database.path)
        .with_context(|| format!("Failed to open database {:?}", config.database.path))?;
    Ok(Arc::new(store))
}

fn build_engine(config: &Config, registry: Arc<SourceRegistry>) -> Result<UpdateEngine> {
    let store = open_store(config)?;

    // Ctrl+C aborts the run without committing anything.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Shutdown requested, aborting update");
        let _ = shutdown_tx.send(true);
    });

    Ok(UpdateEngine::new(registry, store, UpdateConfig::from_config(config))
        .with_shutdown(shutdown_rx))
}

async fn serve(config: Config, registry: Arc<SourceRegistry>) -> Result<()> {
    let store = open_store(&config)?;

    let options = UpdateConfig::from_config(&config).source_options;
    let mut sources: Vec<SourceIdentity> = Vec::new();
    for name in registry.names() {
        match registry.open(&name, &options) {
            Ok(source) => sources.push(source.identity()),
            Err(e) => warn!("Source {} unavailable for stats: {}", name, e),
        }
    }

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, store, sources));
    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
