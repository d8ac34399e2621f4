use duckdb::Connection;
use r2d2::{ManageConnection, Pool};

use crate::config::DatabaseConfig;

pub type DbPool = Pool<DuckDbConnectionManager>;

pub struct DuckDbConnectionManager {
    path: String,
}

impl DuckDbConnectionManager {
    pub fn new(path: String) -> Self {
        Self { path }
    }
}

impl ManageConnection for DuckDbConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        Connection::open(&self.path)
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.query_row("SELECT 1", [], |_| Ok(()))
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Builds the connection pool, verifying an initial connection in the
/// process. A failure here leaves the service in degraded mode rather
/// than aborting startup.
pub fn build_pool(config: &DatabaseConfig) -> Result<DbPool, r2d2::Error> {
    let manager = DuckDbConnectionManager::new(config.path.clone());
    Pool::builder()
        .max_size(config.pool_size as u32)
        .build(manager)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_opens_and_validates_in_memory_database() {
        let manager = DuckDbConnectionManager::new(":memory:".to_string());
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        let conn = pool.get().unwrap();
        let one: i32 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
        assert_eq!(one, 1);
    }
}
