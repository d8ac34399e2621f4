use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::db::normalize::Record;
use crate::web::state::AppState;

/// Wire shape of every answer, success or failure.
///
/// `result` is JSON null only when execution never started (database
/// unavailable, generation failed); when execution was attempted and
/// failed it is an empty array. Clients branch on `error` alone.
#[derive(Debug, Serialize)]
pub struct ResponsePayload {
    pub natural_language_query: String,
    pub sql_query: Option<String>,
    pub result: Option<Vec<Record>>,
    pub row_count: usize,
    pub column_names: Vec<String>,
    pub processing_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponsePayload {
    fn early_failure(question: &str, error: String, processing_time: f64) -> Self {
        Self {
            natural_language_query: question.to_string(),
            sql_query: None,
            result: None,
            row_count: 0,
            column_names: Vec::new(),
            processing_time,
            explanation: None,
            error: Some(error),
        }
    }
}

/// Runs the full question → SQL → rows pipeline for one request.
///
/// Every exit path yields a fully-shaped payload; stage failures are
/// converted to the `error` field, never propagated.
pub async fn handle_query(state: &AppState, question: &str, want_explanation: bool) -> ResponsePayload {
    let started = Instant::now();

    if !state.executor.has_database() {
        return ResponsePayload::early_failure(
            question,
            "Database connection not available".to_string(),
            started.elapsed().as_secs_f64(),
        );
    }

    let schema_text = state.schema.to_prompt_text();
    let sql = match state
        .llm
        .generate_sql(question, &schema_text, chrono::Utc::now())
        .await
    {
        Ok(sql) => sql,
        Err(e) => {
            warn!("SQL generation failed: {}", e);
            return ResponsePayload::early_failure(
                question,
                format!("Failed to process query: {}", e),
                started.elapsed().as_secs_f64(),
            );
        }
    };
    info!("Generated SQL query: {}", sql);

    let outcome = state.executor.execute(&sql).await;
    if let Some(error) = &outcome.error {
        warn!("Error in query execution: {}", error);
    }

    let mut payload = ResponsePayload {
        natural_language_query: question.to_string(),
        sql_query: Some(outcome.sql_query),
        result: Some(outcome.records),
        row_count: outcome.row_count,
        column_names: outcome.column_names,
        processing_time: started.elapsed().as_secs_f64(),
        explanation: None,
        error: outcome.error,
    };

    if want_explanation && payload.error.is_none() {
        if let (Some(sql), Some(records)) = (&payload.sql_query, &payload.result) {
            match state
                .llm
                .explain_results(question, sql, records, payload.row_count)
                .await
            {
                Ok(text) => payload.explanation = Some(text),
                Err(e) => warn!("Explanation generation failed: {}", e),
            }
        }
    }

    payload
}
