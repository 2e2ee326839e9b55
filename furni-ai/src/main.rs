//! furni-ai - furniture design analysis service
//!
//! `serve` runs the HTTP API (uploads, analyses, supplier quotes, SSE).
//! `analyze` uploads one local image, waits for its analysis and prints the
//! result as JSON.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use furni_common::config::{self, RootFolder, TomlConfig};
use furni_common::events::EventBus;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use furni_ai::models::ImageUpload;
use furni_ai::services::{FlowiseClient, PollSettings, UploadRequest};
use furni_ai::{AppState, ServiceConfig};

#[derive(Parser, Debug)]
#[command(name = "furni-ai")]
#[command(about = "Furniture design upload and analysis service")]
#[command(version)]
struct Cli {
    /// Root folder holding the database and stored images
    #[arg(short, long, global = true, env = "FURNICRAFT_ROOT_FOLDER")]
    root_folder: Option<String>,

    /// Path to config.toml
    #[arg(short, long, global = true, env = "FURNICRAFT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Overrides [server] port
        #[arg(short, long, env = "FURNICRAFT_PORT")]
        port: Option<u16>,
    },
    /// Analyze one image file and print the result
    Analyze {
        /// Image to upload
        image: PathBuf,
        /// Design title
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(config::default_config_path);
    let toml_config = match &config_path {
        Some(path) => config::load_toml_config(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => TomlConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml_config.logging.level)),
        )
        .init();

    info!(
        "Starting FurniCraft analysis service (furni-ai) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root = RootFolder::new(config::resolve_root_folder(
        cli.root_folder.as_deref(),
        &toml_config,
    ));
    root.ensure_directories()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Root folder: {}", root.path().display());

    let db_path = root.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = furni_ai::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let flowise = match furni_ai::config::resolve_flowise_url(&db_pool, &toml_config).await? {
        Some(url) => Some(FlowiseClient::new(
            url,
            furni_ai::config::resolve_flowise_api_key(&toml_config),
            Duration::from_secs(toml_config.flowise.timeout_secs),
        )?),
        None => None,
    };

    let service_config = ServiceConfig {
        images_root: root.images_path(),
        public_base_url: furni_ai::config::resolve_public_base_url(&toml_config),
        poll: PollSettings::from(toml_config.polling),
        question: toml_config.flowise.question.clone(),
    };

    let event_bus = EventBus::new(100);
    let state = AppState::new(db_pool, event_bus, flowise, service_config);

    match cli.command {
        Command::Serve { port } => serve(state, &toml_config, port).await,
        Command::Analyze {
            image,
            title,
            description,
        } => analyze(state, image, title, description).await,
    }
}

async fn serve(state: AppState, toml_config: &TomlConfig, port: Option<u16>) -> Result<()> {
    let mut server = toml_config.server.clone();
    if let Some(port) = port {
        server.port = port;
    }
    let bind_address = server.bind_address();

    let app = furni_ai::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let cancelled = state.cancel_all().await;
    if cancelled > 0 {
        warn!(cancelled, "Cancelled analyses still running at shutdown");
    }
    info!("Server shutdown complete");
    Ok(())
}

async fn analyze(
    state: AppState,
    image: PathBuf,
    title: String,
    description: Option<String>,
) -> Result<()> {
    let bytes = tokio::fs::read(&image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;
    let file_name = image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let request = UploadRequest {
        title,
        description,
        image: ImageUpload::new(file_name, None, bytes),
    };

    let cancel = CancellationToken::new();
    let submitted = state.orchestrator.submit(request, cancel.clone()).await?;
    info!(design_id = %submitted.design.id, "Design submitted, waiting for analysis");

    let poll_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        poll_cancel.cancel();
    });

    let result = state
        .poller
        .wait_for_analysis(submitted.design.id, &cancel)
        .await;

    match result {
        Ok(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        Err(e) => {
            // Surface the analysis failure itself when there is one
            cancel.cancel();
            match submitted.handle.await {
                Ok(Err(analysis_error)) => {
                    error!(code = analysis_error.code(), "Analysis failed: {}", analysis_error);
                    Err(analysis_error.into())
                }
                _ => Err(e.into()),
            }
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
