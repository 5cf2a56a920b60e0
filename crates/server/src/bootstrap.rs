use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use washline_agent::{DialogueEngine, EngineOptions, LlmError, OpenAiChatClient, ToolDeps, TurnHandler};
use washline_core::config::{AppConfig, ConfigError, LoadOptions};
use washline_core::domain::conversation::TenantId;
use washline_core::flows::HeuristicStateClassifier;
use washline_db::repositories::{
    ConversationRepository, SqlAppointmentRepository, SqlCatalogRepository,
    SqlConversationRepository, SqlCustomerRepository,
};
use washline_db::{connect_with_settings, migrations, DbPool};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub conversations: Arc<dyn ConversationRepository>,
    pub turn_handler: Arc<dyn TurnHandler>,
    pub tenant_id: TenantId,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client construction failed: {0}")]
    Llm(#[source] LlmError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
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

    let conversations: Arc<dyn ConversationRepository> =
        Arc::new(SqlConversationRepository::new(db_pool.clone()));
    let tool_deps = ToolDeps {
        customers: Arc::new(SqlCustomerRepository::new(db_pool.clone())),
        catalog: Arc::new(SqlCatalogRepository::new(db_pool.clone())),
        appointments: Arc::new(SqlAppointmentRepository::new(db_pool.clone())),
    };

    let llm = Arc::new(OpenAiChatClient::new(&config.llm).map_err(BootstrapError::Llm)?);
    let turn_handler: Arc<dyn TurnHandler> = Arc::new(DialogueEngine::new(
        llm,
        tool_deps,
        conversations.clone(),
        Arc::new(HeuristicStateClassifier::new()),
        EngineOptions { temperature: config.llm.temperature, max_tokens: config.llm.max_tokens },
    ));

    let tenant_id = TenantId(config.tenant.default_tenant_id.clone());

    Ok(Application { config, db_pool, conversations, turn_handler, tenant_id })
}
