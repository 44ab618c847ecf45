//! Reader connections cloned from the writer's connection.

use std::sync::{Arc, Mutex};

use duckdb::Connection;

use crate::storage::StorageError;

/// Source of read connections.
///
/// Holds a prototype connection and hands out clones. Clones share the
/// underlying database instance with the writer, so a committed transaction
/// is fully visible to readers and a half-applied migration never is.
pub struct ReadPool {
    proto: Mutex<Connection>,
}

impl ReadPool {
    /// Create a new read pool from a cloneable connection.
    ///
    /// Note: Schema is expected to be initialized by the writer actor before
    /// this is called.
    pub fn new(conn: Connection) -> Arc<Self> {
        Arc::new(Self {
            proto: Mutex::new(conn),
        })
    }

    /// Clone a connection for one read operation.
    pub fn get(&self) -> Result<Connection, StorageError> {
        let proto = self
            .proto
            .lock()
            .map_err(|_| StorageError::Internal("read pool mutex poisoned".to_string()))?;
        Ok(proto.try_clone()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::init_schema;
    use tempfile::tempdir;

    #[test]
    fn test_pool_hands_out_working_connections() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let conn = Connection::open(&db_path).unwrap();
        init_schema(&conn).unwrap();

        let pool = ReadPool::new(conn);
        let reader = pool.get().unwrap();

        let count: i64 = reader
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'presence'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_pool_clones_share_instance() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("shared.db");

        let conn = Connection::open(&db_path).unwrap();
        init_schema(&conn).unwrap();

        let pool = ReadPool::new(conn);
        let a = pool.get().unwrap();
        let b = pool.get().unwrap();

        a.execute(
            "INSERT INTO presence (client_id, country_code) VALUES (?, ?)",
            duckdb::params!["123e4567-e89b-12d3-a456-426614174000", "US"],
        )
        .unwrap();

        let count: i64 = b
            .query_row("SELECT COUNT(*) FROM presence", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
