use duckdb::Connection;
use tracing::{error, info};

use crate::db::pool::DbPool;

/// One column: name plus declared data type, as reported by the catalog.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// One table and its columns, in ordinal order.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Snapshot of the database catalog, taken once at startup.
///
/// The snapshot is never refreshed while the process runs; queries
/// generated after a DDL change see the old catalog until restart.
#[derive(Debug, Clone)]
pub struct SchemaDescription {
    pub tables: Vec<TableInfo>,
    available: bool,
}

impl SchemaDescription {
    pub fn new(tables: Vec<TableInfo>) -> Self {
        Self {
            tables,
            available: true,
        }
    }

    /// Sentinel for a catalog that could not be read. The pipeline keeps
    /// serving requests, just without schema context in the prompt.
    pub fn unavailable() -> Self {
        Self {
            tables: Vec::new(),
            available: false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Renders the catalog in the block format the model is prompted with.
    pub fn to_prompt_text(&self) -> String {
        if !self.available {
            return "Database schema could not be retrieved.".to_string();
        }
        if self.tables.is_empty() {
            return "The database contains no tables.".to_string();
        }

        let blocks: Vec<String> = self
            .tables
            .iter()
            .map(|table| {
                let columns: Vec<String> = table
                    .columns
                    .iter()
                    .map(|c| format!("{} ({})", c.name, c.data_type))
                    .collect();
                format!("Table: {}\nColumns: {}\n", table.name, columns.join(", "))
            })
            .collect();
        blocks.join("\n")
    }
}

/// Reads table and column metadata for `schema_name` from
/// `information_schema`. Failures are logged and collapse to the
/// unavailable sentinel.
pub async fn introspect_schema(pool: DbPool, schema_name: String) -> SchemaDescription {
    let outcome = tokio::task::spawn_blocking(move || -> Result<Vec<TableInfo>, Box<dyn std::error::Error + Send + Sync>> {
        let conn = pool.get()?;
        load_tables(&conn, &schema_name)
    })
    .await;

    match outcome {
        Ok(Ok(tables)) => {
            info!("Retrieved database schema with {} tables", tables.len());
            SchemaDescription::new(tables)
        }
        Ok(Err(e)) => {
            error!("Error retrieving database schema: {}", e);
            SchemaDescription::unavailable()
        }
        Err(e) => {
            error!("Schema introspection task failed: {}", e);
            SchemaDescription::unavailable()
        }
    }
}

fn load_tables(
    conn: &Connection,
    schema_name: &str,
) -> Result<Vec<TableInfo>, Box<dyn std::error::Error + Send + Sync>> {
    let mut tables_stmt = conn.prepare(
        "SELECT table_name FROM information_schema.tables
         WHERE table_schema = ? ORDER BY table_name",
    )?;
    let table_names: Vec<String> = tables_stmt
        .query_map([schema_name], |row| row.get::<_, String>(0))?
        .filter_map(Result::ok)
        .collect();

    let mut tables = Vec::with_capacity(table_names.len());
    for table_name in table_names {
        let mut columns_stmt = conn.prepare(
            "SELECT column_name, data_type FROM information_schema.columns
             WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
        )?;
        let columns: Vec<ColumnInfo> = columns_stmt
            .query_map([schema_name, table_name.as_str()], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                })
            })?
            .filter_map(Result::ok)
            .collect();

        tables.push(TableInfo {
            name: table_name,
            columns,
        });
    }

    Ok(tables)
}
