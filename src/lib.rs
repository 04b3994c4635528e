pub mod classifier;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod learning;
pub mod models;
pub mod pointer;
pub mod protocol;
pub mod segmentation;
pub mod server;
pub mod settings;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use classifier::{ClassifierConfig, SymbolClassifier};
use config::{AppConfig, Args};
use db::Database;
use learning::OnlineTeacher;
use pointer::{PointerDriver, SystemPointer};
use settings::SettingsStore;

/// Everything a request handler can reach. Clones share the same state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub classifier: Arc<SymbolClassifier>,
    pub settings: Arc<SettingsStore>,
    pub teacher: OnlineTeacher,
    pub pointer: Arc<dyn PointerDriver>,
}

impl AppState {
    /// Open the database under `config.data_dir`, load settings and
    /// rebuild the exemplar store from every stored drawing.
    pub async fn open(config: &AppConfig, pointer: Arc<dyn PointerDriver>) -> Result<Self> {
        let db_path = config.db_path();
        let db = Database::new(db_path.clone())
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;

        let settings = Arc::new(SettingsStore::load(db.clone()).await?);

        let classifier = Arc::new(SymbolClassifier::new(ClassifierConfig {
            neighbors: config.neighbors,
            ..ClassifierConfig::default()
        }));
        let drawings = db.all_drawings().await?;
        let loaded = classifier
            .load(
                drawings
                    .into_iter()
                    .map(|drawing| (drawing.id, drawing.label, drawing.strokes)),
            )
            .map_err(|err| anyhow::anyhow!("failed to load exemplars: {err}"))?;
        let stats = classifier
            .stats()
            .map_err(|err| anyhow::anyhow!("failed to read exemplar stats: {err}"))?;
        info!(
            "Loaded {loaded} exemplars across {} labels (k={})",
            stats.label_count, config.neighbors
        );

        let teacher = OnlineTeacher::new(db.clone(), Arc::clone(&classifier));

        Ok(Self {
            db,
            classifier,
            settings,
            teacher,
            pointer,
        })
    }
}

/// Bind, serve and block until Ctrl-C.
pub fn run(args: Args) -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("trackpad-math starting up...");

    let config = AppConfig::from_env(args)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async move {
        let state = AppState::open(&config, Arc::new(SystemPointer)).await?;
        let listener = TcpListener::bind(config.bind_addr()?)
            .await
            .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, shutting down");
                    signal_token.cancel();
                }
                Err(err) => warn!("failed to listen for Ctrl-C: {err}"),
            }
        });

        server::serve(listener, state, shutdown).await
    })
}
