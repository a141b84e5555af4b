use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

use farmstay_booking::adapters::cache::memory_cache::MemoryCache;
use farmstay_booking::adapters::identity::RepositoryIdentity;
use farmstay_booking::adapters::memory::store::{InMemoryStore, SeedData};
use farmstay_booking::config::load_config;
use farmstay_booking::mcp::server::FarmstayMcpServer;
use farmstay_booking::ports::clock::SystemClock;
use farmstay_booking::ports::repository::Repositories;
use farmstay_booking::service::Services;

fn find_config_path() -> PathBuf {
    let candidates = [
        PathBuf::from("config.yaml"),
        binary_dir().join("config.yaml"),
    ];

    for path in &candidates {
        if path.exists() {
            return path.clone();
        }
    }

    candidates[0].clone()
}

fn binary_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting farmstay-booking server");

    let config_path = find_config_path();
    let config = load_config(&config_path)?;

    let store = match &config.store.seed_path {
        Some(path) => {
            let seed = SeedData::from_json_file(path)?;
            tracing::info!(
                path = %path.display(),
                users = seed.users.len(),
                properties = seed.properties.len(),
                bookings = seed.bookings.len(),
                "Loaded seed data"
            );
            InMemoryStore::with_seed(seed)
        }
        None => {
            tracing::info!("No seed_path configured, starting with an empty store");
            InMemoryStore::new()
        }
    };
    let store = Arc::new(store);

    let repos = Repositories::from_store(Arc::clone(&store));
    let cache = Arc::new(MemoryCache::new(config.cache.max_entries));
    let services = Services::new(repos.clone(), cache, Arc::new(SystemClock), &config);
    let identity = Arc::new(RepositoryIdentity::new(repos.users));

    let server = FarmstayMcpServer::new(services, identity);

    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
