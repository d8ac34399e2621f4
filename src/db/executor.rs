use std::time::Duration;

use duckdb::types::Value;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::db::normalize::{normalize_value, Record};
use crate::db::pool::DbPool;
use crate::safety;

/// Outcome of one execution attempt, fully materialized.
///
/// An empty result set carries no column names, even though the statement
/// has a well-defined projection; callers needing column metadata for
/// zero-row results must issue a DESCRIBE.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub sql_query: String,
    pub records: Vec<Record>,
    pub column_names: Vec<String>,
    pub row_count: usize,
    pub error: Option<String>,
}

impl QueryResult {
    fn failed(sql: &str, message: String) -> Self {
        Self {
            sql_query: sql.to_string(),
            records: Vec::new(),
            column_names: Vec::new(),
            row_count: 0,
            error: Some(message),
        }
    }
}

/// Runs validated SQL against the pool with a hard time bound.
pub struct QueryExecutor {
    pool: Option<DbPool>,
    query_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(pool: Option<DbPool>, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    pub fn has_database(&self) -> bool {
        self.pool.is_some()
    }

    /// Gates, executes, and normalizes one statement.
    ///
    /// Never fails the caller: every failure mode is folded into the
    /// result's `error` field so the response shape stays stable.
    pub async fn execute(&self, sql: &str) -> QueryResult {
        let Some(pool) = &self.pool else {
            return QueryResult::failed(sql, "Database connection not available".to_string());
        };

        if !safety::is_safe(sql) {
            warn!("Rejected non-read statement: {}", sql);
            return QueryResult::failed(sql, "Only read operations are allowed".to_string());
        }

        let pool = pool.clone();
        let statement = sql.to_string();
        let task = tokio::task::spawn_blocking(move || run_query(&pool, &statement));

        match timeout(self.query_timeout, task).await {
            Ok(Ok(Ok(result))) => {
                info!("Query returned {} rows", result.row_count);
                result
            }
            Ok(Ok(Err(e))) => {
                error!("Error executing SQL query: {}", e);
                QueryResult::failed(sql, format!("Error executing SQL query: {}", e))
            }
            Ok(Err(join_err)) => {
                error!("Query task failed: {}", join_err);
                QueryResult::failed(sql, format!("Error executing SQL query: {}", join_err))
            }
            Err(_) => QueryResult::failed(
                sql,
                format!(
                    "Error executing SQL query: timed out after {}s",
                    self.query_timeout.as_secs()
                ),
            ),
        }
    }
}

fn run_query(
    pool: &DbPool,
    sql: &str,
) -> Result<QueryResult, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(sql)?;

    let column_count = stmt.column_count();
    let mut column_names = Vec::with_capacity(column_count);
    for i in 0..column_count {
        column_names.push(stmt.column_name(i)?.to_string());
    }

    let mut records: Vec<Record> = Vec::new();
    {
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (i, name) in column_names.iter().enumerate() {
                let value: Value = row.get(i)?;
                record.insert(name.clone(), normalize_value(value));
            }
            records.push(record);
        }
    }

    // Zero-row results report no column metadata (see QueryResult docs).
    if records.is_empty() {
        column_names.clear();
    }

    let row_count = records.len();
    Ok(QueryResult {
        sql_query: sql.to_string(),
        records,
        column_names,
        row_count,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use r2d2::Pool;
    use serde_json::json;

    use crate::db::pool::DuckDbConnectionManager;

    fn seeded_pool() -> DbPool {
        let manager = DuckDbConnectionManager::new(":memory:".to_string());
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        {
            let conn = pool.get().unwrap();
            conn.execute_batch(
                "CREATE TABLE orders (id INTEGER, amount DECIMAL(10,2), note VARCHAR);
                 INSERT INTO orders VALUES (1, 12.50, 'first'), (2, 99.99, NULL);",
            )
            .unwrap();
        }
        pool
    }

    fn executor(pool: Option<DbPool>) -> QueryExecutor {
        QueryExecutor::new(pool, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn executes_select_and_normalizes_rows() {
        let result = executor(Some(seeded_pool()))
            .execute("SELECT id, amount, note FROM orders ORDER BY id")
            .await;

        assert!(result.error.is_none());
        assert_eq!(result.row_count, 2);
        assert_eq!(result.column_names, vec!["id", "amount", "note"]);
        assert_eq!(result.records[0]["id"], json!(1));
        assert_eq!(result.records[0]["amount"], json!(12.5));
        assert_eq!(result.records[0]["note"], json!("first"));
        assert_eq!(result.records[1]["note"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn rejects_writes_without_touching_the_database() {
        let pool = seeded_pool();
        let result = executor(Some(pool.clone())).execute("DELETE FROM orders").await;

        assert_eq!(result.error.as_deref(), Some("Only read operations are allowed"));
        assert!(result.records.is_empty());
        assert_eq!(result.row_count, 0);

        let conn = pool.get().unwrap();
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 2);
    }

    #[tokio::test]
    async fn missing_pool_reports_database_unavailable() {
        let result = executor(None).execute("SELECT 1").await;
        assert_eq!(
            result.error.as_deref(),
            Some("Database connection not available")
        );
    }

    #[tokio::test]
    async fn empty_result_sets_report_no_columns() {
        let result = executor(Some(seeded_pool()))
            .execute("SELECT * FROM orders WHERE id > 100")
            .await;

        assert!(result.error.is_none());
        assert_eq!(result.row_count, 0);
        assert!(result.records.is_empty());
        assert!(result.column_names.is_empty());
    }

    #[tokio::test]
    async fn driver_errors_become_error_results() {
        let result = executor(Some(seeded_pool()))
            .execute("SELECT * FROM no_such_table")
            .await;

        let error = result.error.expect("driver error expected");
        assert!(error.starts_with("Error executing SQL query:"));
        assert!(result.records.is_empty());
    }
}
