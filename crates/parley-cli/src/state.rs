//! Application state wiring all services together.
//!
//! AppState owns the storage pools and the shared in-process services. Core
//! services are generic over their ports; the type aliases below pin them to
//! the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use parley_core::catalog::ReferenceCatalog;
use parley_core::metrics::PipelineCounters;
use parley_core::pipeline::InteractionOrchestrator;
use parley_core::session::{KeyedLocks, SessionStore};
use parley_core::sweeper::InactivitySweeper;
use parley_infra::assistant::HttpAssistantClient;
use parley_infra::config::{data_dir, load_config, whatsapp_access_token};
use parley_infra::ephemeral::AnyEphemeralStore;
use parley_infra::sqlite::archive::SqliteArchiveRepository;
use parley_infra::sqlite::catalog::SqliteCatalogRepository;
use parley_infra::sqlite::pool::{DURABLE_DB_FILE, DatabasePool, EPHEMERAL_DB_FILE, database_url};
use parley_infra::whatsapp::WhatsAppSender;
use parley_types::config::ServiceConfig;

pub type Sessions = SessionStore<AnyEphemeralStore>;

pub type Sweeper = InactivitySweeper<AnyEphemeralStore, SqliteArchiveRepository>;

pub type Orchestrator = InteractionOrchestrator<AnyEphemeralStore, HttpAssistantClient, WhatsAppSender>;

/// Shared application state used by every command.
pub struct AppState {
    pub config: ServiceConfig,
    pub data_dir: PathBuf,
    pub durable: DatabasePool,
    ephemeral_pool: Option<DatabasePool>,
    pub sessions: Arc<Sessions>,
    pub catalog: Arc<ReferenceCatalog>,
    pub counters: Arc<PipelineCounters>,
    pub locks: KeyedLocks,
}

impl AppState {
    /// Load config, open both databases and load the interest catalog.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config = load_config(&data_dir).await?;

        let durable = DatabasePool::durable(&database_url(&data_dir, DURABLE_DB_FILE), &config.database)
            .await
            .context("failed to open durable database")?;

        let (ephemeral, ephemeral_pool) = AnyEphemeralStore::open(
            &config.ephemeral,
            &database_url(&data_dir, EPHEMERAL_DB_FILE),
        )
        .await
        .context("failed to open ephemeral store")?;

        let catalog = Arc::new(ReferenceCatalog::new());
        catalog
            .reload(&SqliteCatalogRepository::new(durable.clone()))
            .await
            .context("failed to load interest catalog")?;

        Ok(Self {
            config,
            data_dir,
            durable,
            ephemeral_pool,
            sessions: Arc::new(SessionStore::new(ephemeral)),
            catalog,
            counters: Arc::new(PipelineCounters::new()),
            locks: KeyedLocks::new(),
        })
    }

    pub fn archive_repo(&self) -> SqliteArchiveRepository {
        SqliteArchiveRepository::new(self.durable.clone())
    }

    pub fn catalog_repo(&self) -> SqliteCatalogRepository {
        SqliteCatalogRepository::new(self.durable.clone())
    }

    pub fn sweeper(&self) -> Sweeper {
        InactivitySweeper::new(
            Arc::clone(&self.sessions),
            self.archive_repo(),
            self.locks.clone(),
            Arc::clone(&self.counters),
            &self.config.sweeper,
        )
    }

    /// Build the orchestrator. Fails if the collaborator settings are missing.
    pub fn orchestrator(&self) -> anyhow::Result<Orchestrator> {
        let assistant = HttpAssistantClient::from_config(&self.config.assistant)?;
        let sender = WhatsAppSender::from_config(&self.config.whatsapp, whatsapp_access_token())?;
        Ok(InteractionOrchestrator::new(
            Arc::clone(&self.sessions),
            Arc::clone(&self.catalog),
            assistant,
            sender,
            self.locks.clone(),
            Arc::clone(&self.counters),
            self.config.pipeline.clone(),
        ))
    }

    /// Close both database pools.
    pub async fn close(&self) {
        if let Some(pool) = &self.ephemeral_pool {
            pool.close().await;
        }
        self.durable.close().await;
    }
}
