use crate::config::AppConfig;
use crate::db::executor::QueryExecutor;
use crate::db::introspect::SchemaDescription;
use crate::llm::LlmManager;

/// Shared application state, built once in `main` and handed to every
/// request as an `Arc`. The schema snapshot is read-only; the executor
/// and LLM manager are internally safe for concurrent use.
pub struct AppState {
    pub config: AppConfig,
    pub executor: QueryExecutor,
    pub schema: SchemaDescription,
    pub llm: LlmManager,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        executor: QueryExecutor,
        schema: SchemaDescription,
        llm: LlmManager,
    ) -> Self {
        Self {
            config,
            executor,
            schema,
            llm,
            startup_time: chrono::Utc::now(),
        }
    }
}
