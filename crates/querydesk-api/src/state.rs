//! Application state wiring all services together.
//!
//! The orchestrator and session service are generic over the
//! collaborator traits; AppState pins them to the concrete infra
//! implementations (SQLite storage, Gemini capabilities).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use secrecy::SecretString;

use querydesk_core::orchestrator::SessionOrchestrator;
use querydesk_core::turn::service::SessionService;
use querydesk_infra::config::{load_router_config, resolve_data_dir};
use querydesk_infra::gemini::{GeminiClient, GeminiEmbedder};
use querydesk_infra::sqlite::{
    DatabasePool, SqliteDocumentStore, SqliteSqlExecutor, SqliteTurnRepository,
};
use querydesk_types::config::RouterConfig;

/// Concrete type aliases for the service generics pinned to infra
/// implementations.
pub type ConcreteOrchestrator = SessionOrchestrator<
    GeminiClient,
    SqliteTurnRepository,
    SqliteDocumentStore,
    GeminiEmbedder,
    SqliteSqlExecutor,
>;

pub type ConcreteSessionService = SessionService<SqliteTurnRepository>;

/// Shared application state holding the orchestrator and services.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub sessions: Arc<ConcreteSessionService>,
    pub config: Arc<RouterConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to the
    /// database, wire capabilities and services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = Arc::new(load_router_config(&data_dir).await);

        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("querydesk.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        let raw_key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY must be set")?;
        let provider = Arc::new(GeminiClient::new(
            SecretString::from(raw_key.clone()),
            config.model.clone(),
        ));
        let embedder = Arc::new(GeminiEmbedder::new(
            SecretString::from(raw_key),
            config.embedding_model.clone(),
            config.embedding_dimension,
            config.max_embed_chars,
        ));

        let turns = Arc::new(SqliteTurnRepository::new(db_pool.clone()));
        let store = Arc::new(SqliteDocumentStore::new(db_pool.clone()));
        let executor = Arc::new(SqliteSqlExecutor::new(db_pool.clone()));

        let orchestrator = Arc::new(SessionOrchestrator::new(
            provider,
            turns,
            store,
            embedder,
            executor,
            config.clone(),
        ));

        // The session service owns its own repository handle; the pools
        // underneath are shared.
        let sessions = Arc::new(SessionService::new(SqliteTurnRepository::new(
            db_pool.clone(),
        )));

        Ok(Self {
            orchestrator,
            sessions,
            config,
            data_dir,
            db_pool,
        })
    }
}
