//! DARWIS TAXII server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taxii_core::ServerConfig;
use taxii_memory::MemoryBackend;
use taxii_server::background::BackgroundTasks;
use taxii_server::build_router;
use taxii_server::state::AppState;

#[derive(Parser)]
#[command(name = "taxii-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve,
    /// Inspect or manage a persisted JSON dataset file.
    Dataset {
        #[command(subcommand)]
        action: DatasetAction,
    },
}

#[derive(Subcommand)]
enum DatasetAction {
    /// Load a dataset and print a summary of its contents.
    Load {
        /// Path to the dataset JSON file.
        path: PathBuf,
    },
    /// Load a dataset and rewrite it as pretty-printed JSON at `output`.
    Save {
        /// Path to the source dataset JSON file.
        path: PathBuf,
        /// Path to write the re-serialized dataset to.
        output: PathBuf,
    },
    /// Load a dataset, reporting any structural errors.
    Validate {
        /// Path to the dataset JSON file.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve => serve().await,
        Commands::Dataset { action } => dataset(action),
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    info!("starting DARWIS TAXII server");

    let config = Arc::new(ServerConfig::load()?);
    info!(bind = %config.bind_address, port = config.port, "configuration loaded");

    let (discovery, api_roots) = match &config.dataset_path {
        Some(path) => taxii_memory::persistence::load(path)?,
        None => (None, std::collections::BTreeMap::new()),
    };
    let backend = Arc::new(MemoryBackend::new(discovery, api_roots));
    info!("dataset loaded");

    let tasks = BackgroundTasks::spawn(backend.clone(), config.clone());

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port).parse()?;
    let app = build_router(AppState { backend, config });

    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, "server listening");

    axum::serve(listener, app).await?;

    if let Some(tasks) = tasks {
        tasks.shutdown().await;
    }

    Ok(())
}

fn dataset(action: DatasetAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DatasetAction::Load { path } => {
            let (discovery, api_roots) = taxii_memory::persistence::load(&path)?;
            let collection_count: usize = api_roots.values().map(|r| r.collections.len()).sum();
            let object_count: usize = api_roots.values().flat_map(|r| r.collections.values()).map(|c| c.objects.len()).sum();
            println!(
                "discovery: {}\napi roots: {}\ncollections: {collection_count}\nobjects: {object_count}",
                if discovery.is_some() { "present" } else { "absent" },
                api_roots.len(),
            );
            Ok(())
        }
        DatasetAction::Save { path, output } => {
            let (discovery, api_roots) = taxii_memory::persistence::load(&path)?;
            taxii_memory::persistence::save(&output, discovery.as_ref(), &api_roots)?;
            println!("wrote {}", output.display());
            Ok(())
        }
        DatasetAction::Validate { path } => {
            taxii_memory::persistence::load(&path)?;
            println!("{} is valid", path.display());
            Ok(())
        }
    }
}
