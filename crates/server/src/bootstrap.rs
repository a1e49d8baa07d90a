use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use stockroom_agent::llm::LlmError;
use stockroom_agent::prompt::PromptError;
use stockroom_agent::{
    AgentRuntime, MemoryLimits, OpenAiCompatibleClient, ReasoningEngine, RuntimeSettings,
    SessionMemoryStore, ToolCatalog,
};
use stockroom_core::config::AppConfig;
use stockroom_core::inventory::InventoryOperations;
use stockroom_db::{connect_with_config, migrations, DbPool, SqlInventoryStore};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("reasoning client setup failed: {0}")]
    Reasoner(#[from] LlmError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let reasoner: Arc<dyn ReasoningEngine> = Arc::new(OpenAiCompatibleClient::from_config(&config)?);
    info!(
        event_name = "system.bootstrap.reasoner_ready",
        correlation_id = "bootstrap",
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        base_url = %config.llm_base_url(),
        "reasoning client configured"
    );

    let operations = InventoryOperations::new(Arc::new(SqlInventoryStore::new(db_pool.clone())));
    let runtime = build_runtime(&config, operations, reasoner)?;

    Ok(Application { config, db_pool, runtime })
}

pub fn build_runtime(
    config: &AppConfig,
    operations: InventoryOperations,
    reasoner: Arc<dyn ReasoningEngine>,
) -> Result<Arc<AgentRuntime>, PromptError> {
    let memory = Arc::new(SessionMemoryStore::new(MemoryLimits::from(&config.memory)));
    let catalog = Arc::new(ToolCatalog::inventory(operations, memory));
    Ok(Arc::new(AgentRuntime::new(reasoner, catalog, RuntimeSettings::from(&config.agent))?))
}

/// Periodically drops sessions that have been idle longer than their TTL.
pub fn spawn_memory_sweeper(memory: Arc<SessionMemoryStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = memory.evict_idle(Utc::now()).await;
            let sessions = memory.len().await;
            debug!(
                event_name = "system.memory.sweep",
                evicted,
                sessions,
                "memory sweep finished"
            );
        }
    })
}
