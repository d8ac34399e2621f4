use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use nl_query::config::{AppConfig, CliArgs};
use nl_query::db::executor::QueryExecutor;
use nl_query::db::introspect::{self, SchemaDescription};
use nl_query::db::pool::build_pool;
use nl_query::llm::LlmManager;
use nl_query::util::logging::init_tracing;
use nl_query::web;
use nl_query::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Opening DuckDB database at {}", config.database.path);
    let pool = match build_pool(&config.database) {
        Ok(pool) => Some(pool),
        Err(e) => {
            // Degraded mode: the service stays up and answers every query
            // with a database-unavailable error.
            error!("Database connection error: {}", e);
            warn!("Continuing without a database connection");
            None
        }
    };

    // One-time schema snapshot for model context
    let schema = match &pool {
        Some(pool) => {
            introspect::introspect_schema(pool.clone(), config.database.schema_name.clone()).await
        }
        None => SchemaDescription::unavailable(),
    };

    // Initialize LLM manager
    info!("Initializing LLM manager with backend: {}", config.llm.backend);
    let llm_manager = LlmManager::new(&config.llm)?;

    let executor = QueryExecutor::new(
        pool,
        Duration::from_secs(config.database.query_timeout_secs),
    );

    let app_state = Arc::new(AppState::new(config.clone(), executor, schema, llm_manager));

    // Start the web server
    info!(
        "Starting nl-query server on {}:{}",
        config.web.host, config.web.port
    );
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(std::io::Error::other(e.to_string()).into());
        }
    }

    Ok(())
}
