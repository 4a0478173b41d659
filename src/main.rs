use explorer_cache::{
    api::Server,
    config::Config,
    source::{EntitySource, RpcSource},
    state::CacheStore,
    sync::BestBlockWatcher,
};
use std::sync::Arc;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// The main entry point for the explorer cache service.
///
/// Loads configuration, builds the cache store and the entity source,
/// starts the best-block watcher in the background and then serves the API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;
    info!("Explorer cache starting with config: {:?}", config);

    // One store for the whole process, handed to every component that needs it.
    let store = CacheStore::new();
    let source: Arc<dyn EntitySource> = Arc::new(RpcSource::new(&config.source)?);

    let watcher = BestBlockWatcher::new(config.sync.clone(), store.clone(), Arc::clone(&source));
    tokio::spawn(async move {
        if let Err(e) = watcher.start().await {
            tracing::error!("Best block watcher error: {:?}", e);
        }
    });
    info!("Best block watcher started");

    let server = Server::new(config.api, store, source);
    server.start().await?;

    Ok(())
}
