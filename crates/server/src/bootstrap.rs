use std::sync::Arc;

use anyhow::Result;
use axum::Router;

use leadly_agent::{default_executor, OpenAiCompatClient, Orchestrator, SpeechToText};
use leadly_agent::executor::Executor;
use leadly_comms::WebhookMessageSender;
use leadly_core::config::AppConfig;
use leadly_core::TracingAuditSink;
use leadly_db::repositories::{
    SqlCommunicationRepository, SqlLeadRepository, SqlPendingMessageRepository,
};
use leadly_db::{connect_with_settings, migrations, DbPool};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub executor: Arc<Executor>,
    pub transcriber: Option<Arc<dyn SpeechToText>>,
    pub db_pool: DbPool,
}

pub struct App {
    pub config: AppConfig,
    pub router: Router,
}

pub fn routes(state: AppState) -> Router {
    crate::command::routes().merge(crate::health::routes()).with_state(state)
}

pub async fn bootstrap(config: AppConfig) -> Result<App> {
    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await?;
    migrations::run_pending(&db_pool).await?;

    let llm = Arc::new(OpenAiCompatClient::new(&config.llm)?);
    let orchestrator = Arc::new(Orchestrator::with_temperature(llm, config.llm.temperature));

    let sender = Arc::new(WebhookMessageSender::new(config.messaging.clone())?);
    let executor = Arc::new(default_executor(
        Arc::new(SqlLeadRepository::new(db_pool.clone())),
        Arc::new(SqlCommunicationRepository::new(db_pool.clone())),
        Arc::new(SqlPendingMessageRepository::new(db_pool.clone())),
        sender,
        Arc::new(TracingAuditSink),
    ));

    // Speech-to-text is an external collaborator; no provider is wired in
    // by default, so audio commands return 503 until one is.
    let state = AppState { orchestrator, executor, transcriber: None, db_pool };

    Ok(App { router: routes(state), config })
}
