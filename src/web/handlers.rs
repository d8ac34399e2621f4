use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::pipeline::{self, ResponsePayload};
use crate::web::state::AppState;

const MIN_QUERY_LEN: usize = 5;

#[derive(Debug, Deserialize)]
pub struct SqlQueryRequest {
    pub query: Option<String>,
    #[serde(default)]
    pub explain_results: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub database_available: bool,
    pub schema_table_count: usize,
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

/// `POST /api/sql-query`, the natural-language query endpoint.
pub async fn sql_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SqlQueryRequest>,
) -> Result<Json<ResponsePayload>, (StatusCode, Json<ErrorBody>)> {
    let Some(question) = payload.query.as_deref() else {
        return Err(bad_request("Missing query parameter in request body"));
    };
    if question.len() < MIN_QUERY_LEN {
        return Err(bad_request("Query must be at least 5 characters long"));
    }

    info!("NL query: {}", question);
    let response = pipeline::handle_query(&state, question, payload.explain_results).await;
    Ok(Json(response))
}

/// `GET /api/status`
pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        database_available: state.executor.has_database(),
        schema_table_count: state.schema.tables.len(),
    })
}
