//! Database schema definitions and day-column migration.

use duckdb::Connection;

use crate::storage::StorageError;
use crate::storage::types::Day;

/// SQL statement for creating the presence table.
///
/// One row per client ever seen. Day columns are not part of the base DDL;
/// they are added lazily by [`ensure_day_column`] the first time any client
/// is seen on a new day.
pub const PRESENCE_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS presence (
    client_id    VARCHAR PRIMARY KEY,
    country_code VARCHAR NOT NULL
);
"#;

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(PRESENCE_TABLE_DDL)?;

    tracing::info!("Database schema initialized");
    Ok(())
}

/// Add the boolean presence column for `day` if it is not already present.
///
/// Additive-only and idempotent: re-running for an existing day is a no-op,
/// and existing rows pick up `false` through the column default. The column
/// identifier comes from [`Day::column_name`], never from free text.
pub fn ensure_day_column(conn: &Connection, day: &Day) -> Result<(), StorageError> {
    conn.execute_batch(&format!(
        "ALTER TABLE presence ADD COLUMN IF NOT EXISTS \"{}\" BOOLEAN DEFAULT false;",
        day.column_name()
    ))?;
    Ok(())
}

/// Whether the presence column for `day` exists.
///
/// Queries distinguish "column absent" (valid empty result) from backend
/// failure with this check.
pub fn day_column_exists(conn: &Connection, day: &Day) -> Result<bool, StorageError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM information_schema.columns
         WHERE table_name = 'presence' AND column_name = ?",
        duckdb::params![day.column_name()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_initialization() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'presence'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_schema_initialization_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn test_ensure_day_column_creates_and_repeats() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let day = Day::parse("2020-10-25").unwrap();
        assert!(!day_column_exists(&conn, &day).unwrap());

        ensure_day_column(&conn, &day).unwrap();
        assert!(day_column_exists(&conn, &day).unwrap());

        // Second migration for the same day is a no-op, not an error.
        ensure_day_column(&conn, &day).unwrap();
        assert!(day_column_exists(&conn, &day).unwrap());
    }

    #[test]
    fn test_day_column_defaults_existing_rows_to_false() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO presence (client_id, country_code) VALUES (?, ?)",
            duckdb::params!["123e4567-e89b-12d3-a456-426614174000", "US"],
        )
        .unwrap();

        let day = Day::parse("2021-01-01").unwrap();
        ensure_day_column(&conn, &day).unwrap();

        let seen: bool = conn
            .query_row(
                &format!("SELECT \"{}\" FROM presence", day.column_name()),
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!seen);
    }
}
