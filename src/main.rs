use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docserver::api_router::create_router;
use docserver::auth::session::SessionManager;
use docserver::bootstrap;
use docserver::config::{AppConfig, StorageBackend};
use docserver::shared::state::AppState;
use docserver::storage::database::{create_pool, DbStorage};
use docserver::storage::memory::MemStorage;
use docserver::storage::Storage;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let storage: Arc<dyn Storage> = match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database)?;
            let storage = DbStorage::new(pool);
            storage.run_migrations()?;
            info!("using postgres storage");
            Arc::new(storage)
        }
        StorageBackend::Memory => {
            info!("using in-memory storage");
            Arc::new(MemStorage::new())
        }
    };

    bootstrap::ensure_admin(storage.as_ref(), &config.admin).await?;
    if config.storage_backend == StorageBackend::Memory {
        bootstrap::seed_demo_data(storage.as_ref()).await?;
    }

    let sessions = Arc::new(SessionManager::new(config.session.ttl_hours));
    {
        let sessions = Arc::clone(&sessions);
        let interval = Duration::from_secs(config.session.prune_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                sessions.prune_expired().await;
            }
        });
    }

    if docserver::embedded_ui::has_embedded_ui() {
        info!("embedded UI enabled");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState { storage, sessions });
    let router = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, router).await?;
    Ok(())
}
