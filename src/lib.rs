pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod merge_queues;
pub mod model;
pub mod render;
pub mod search;
pub mod store;
pub mod worker;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{RevisionError, RevisionResult};

// Export all model types
pub use model::*;

// Export store types
pub use store::{MemoryStore, PostgresStore, Store};

use std::sync::Arc;

use crate::api::handlers::AppContext;
use crate::config::{AppConfig, SearchBackend, StoreBackend};
use crate::merge_queues::MergeQueueRegistry;
use crate::search::{HttpSearchIndex, MemorySearchIndex, NullSearchIndex, SearchIndex};
use crate::worker::{post_commit_channel, PostCommitWorker};

/// Router with its state attached, plus the worker that must be spawned to
/// run post-commit side effects.
pub fn build_app<S: Store + 'static>(
    store: S,
    search: Arc<dyn SearchIndex>,
) -> (axum::Router, PostCommitWorker) {
    let (post_commit, worker) = post_commit_channel(search);
    let context = Arc::new(AppContext {
        store,
        merge_queues: MergeQueueRegistry::new(),
        post_commit,
    });
    let app = crate::api::routes::create_router::<S>().with_state(context);
    (app, worker)
}

pub fn search_index(config: &AppConfig) -> anyhow::Result<Arc<dyn SearchIndex>> {
    let index: Arc<dyn SearchIndex> = match config.search.backend {
        SearchBackend::None => Arc::new(NullSearchIndex),
        SearchBackend::Memory => Arc::new(MemorySearchIndex::new()),
        SearchBackend::Http => {
            let url = config
                .search
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("search.url is required for the http backend"))?;
            Arc::new(HttpSearchIndex::new(url, config.search.index.clone()))
        }
    };
    Ok(index)
}

async fn serve_with<S: Store + 'static>(
    store: S,
    search: Arc<dyn SearchIndex>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    use tokio::net::TcpListener;

    let (app, worker) = build_app(store, search);
    tokio::spawn(worker.run());

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Entity revision server running on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Start the server with the configured store and search backends
pub async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    let search = search_index(config)?;

    match config.store.backend {
        StoreBackend::Postgres => {
            let database_url = config.database_url()?;
            log::info!("Connecting to PostgreSQL...");
            let store = PostgresStore::new(&database_url, config.max_connections()).await?;
            log::info!("Running database migrations...");
            store.migrate().await?;
            serve_with(store, search, config).await
        }
        StoreBackend::Memory => {
            log::warn!("Using the in-memory store; nothing will be persisted");
            serve_with(MemoryStore::new(), search, config).await
        }
    }
}
