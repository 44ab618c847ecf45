//! Writer actor with dedicated connection and MPSC channel.
//!
//! Single-writer pattern: one thread owns the write connection and processes
//! commands via MPSC. Because every write drains through this thread, the
//! day-column migration and the row upsert are serialized across all
//! concurrent callers without an explicit lock.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use duckdb::Connection;
use tokio::sync::oneshot;

use crate::storage::StorageError;
use crate::storage::schema::{ensure_day_column, init_schema};
use crate::storage::types::Sighting;

/// Commands sent to the writer actor.
#[derive(Debug)]
pub enum Command {
    /// Mark a client present on a day; replies after the transaction commits.
    Record {
        sighting: Sighting,
        reply: oneshot::Sender<Result<(), StorageError>>,
    },
    /// Force WAL checkpoint.
    Checkpoint,
    /// Graceful shutdown.
    Shutdown,
}

/// Database writer actor.
pub struct DbActor {
    conn: Connection,
    rx: Receiver<Command>,
    last_checkpoint: Instant,
    checkpoint_interval: Duration,
}

impl DbActor {
    /// Spawn the writer actor thread.
    ///
    /// Returns a tuple of:
    /// - `JoinHandle<()>`: Handle to the actor thread
    /// - `SyncSender<Command>`: Channel sender for commands
    /// - `Connection`: A cloneable connection for creating reader connections via `try_clone()`
    pub fn spawn(
        db_path: &Path,
        channel_capacity: usize,
        checkpoint_interval: Duration,
    ) -> Result<(JoinHandle<()>, SyncSender<Command>, Connection), StorageError> {
        let (tx, rx) = mpsc::sync_channel(channel_capacity);
        let conn = Connection::open(db_path)?;
        init_schema(&conn)?;

        // Connections from try_clone() share the same underlying database
        // instance, so readers see committed writes without waiting for a
        // WAL checkpoint.
        let reader_conn = conn.try_clone()?;

        let mut actor = DbActor {
            conn,
            rx,
            last_checkpoint: Instant::now(),
            checkpoint_interval,
        };
        let handle = thread::spawn(move || actor.run());

        Ok((handle, tx, reader_conn))
    }

    fn run(&mut self) {
        tracing::info!("DbActor started");

        loop {
            let deadline = self.last_checkpoint + self.checkpoint_interval;
            let timeout = deadline.saturating_duration_since(Instant::now());

            match self.rx.recv_timeout(timeout) {
                Ok(cmd) => {
                    if self.handle_command(cmd) {
                        break; // Shutdown requested
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    // Timeout: checkpoint overdue
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("Channel disconnected, shutting down");
                    break;
                }
            }

            if self.last_checkpoint.elapsed() >= self.checkpoint_interval {
                if let Err(e) = self.checkpoint() {
                    tracing::error!(error = %e, "Periodic checkpoint failed");
                }
                self.last_checkpoint = Instant::now();
            }
        }

        tracing::info!("DbActor stopped");
    }

    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Record { sighting, reply } => {
                let result = self.record(&sighting);
                if let Err(ref e) = result {
                    tracing::error!(error = %e, client = %sighting.id, "Record failed");
                }
                // Caller may have gone away; the write already committed or not.
                let _ = reply.send(result);
            }
            Command::Checkpoint => {
                if let Err(e) = self.checkpoint() {
                    tracing::error!(error = %e, "Checkpoint failed");
                }
            }
            Command::Shutdown => {
                tracing::info!("DbActor shutting down");
                let _ = self.checkpoint();
                return true;
            }
        }
        false
    }

    /// Apply one sighting in a single transaction:
    ///
    /// 1. ensure the day column exists (idempotent, additive-only),
    /// 2. insert the row if the client is new (first country wins),
    /// 3. set the presence flag for that day.
    ///
    /// The commit happens before the caller sees success; a failed step
    /// leaves no partial effect visible to readers.
    fn record(&mut self, sighting: &Sighting) -> Result<(), StorageError> {
        let column = sighting.day.column_name();
        let tx = self.conn.transaction()?;

        ensure_day_column(&tx, &sighting.day)?;
        tx.execute(
            "INSERT INTO presence (client_id, country_code) VALUES (?, ?)
             ON CONFLICT (client_id) DO NOTHING",
            duckdb::params![sighting.id.as_str(), sighting.country],
        )?;
        tx.execute(
            &format!("UPDATE presence SET \"{column}\" = true WHERE client_id = ?"),
            duckdb::params![sighting.id.as_str()],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn checkpoint(&self) -> Result<(), StorageError> {
        self.conn.execute_batch("CHECKPOINT;")?;
        tracing::debug!("WAL checkpoint completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::{ClientId, Day};
    use tempfile::tempdir;

    fn sighting(id: &str, country: &str, day: &str) -> Sighting {
        Sighting::new(
            ClientId::parse(id).unwrap(),
            country,
            Day::parse(day).unwrap(),
        )
    }

    fn send_record(tx: &SyncSender<Command>, s: Sighting) -> Result<(), StorageError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(Command::Record {
            sighting: s,
            reply: reply_tx,
        })
        .unwrap();
        reply_rx.blocking_recv().unwrap()
    }

    #[test]
    fn test_actor_lifecycle() {
        let dir = tempdir().unwrap();
        let (handle, tx, _reader_conn) =
            DbActor::spawn(&dir.path().join("test.db"), 100, Duration::from_secs(1)).unwrap();
        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_record_commits_before_reply() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("record.db");
        let (handle, tx, reader_conn) =
            DbActor::spawn(&db_path, 100, Duration::from_secs(1)).unwrap();

        send_record(
            &tx,
            sighting("123e4567-e89b-12d3-a456-426614174000", "US", "2020-10-25"),
        )
        .unwrap();

        // The reply arrived, so the commit is already visible to readers.
        let seen: bool = reader_conn
            .query_row(
                "SELECT day_2020_10_25 FROM presence WHERE client_id = ?",
                duckdb::params!["123e4567-e89b-12d3-a456-426614174000"],
                |row| row.get(0),
            )
            .unwrap();
        assert!(seen);

        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_record_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("idem.db");
        let (handle, tx, reader_conn) =
            DbActor::spawn(&db_path, 100, Duration::from_secs(1)).unwrap();

        let s = sighting("123e4567-e89b-12d3-a456-426614174000", "US", "2020-10-25");
        send_record(&tx, s.clone()).unwrap();
        send_record(&tx, s).unwrap();

        let count: i64 = reader_conn
            .query_row("SELECT COUNT(*) FROM presence", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_first_country_wins() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("country.db");
        let (handle, tx, reader_conn) =
            DbActor::spawn(&db_path, 100, Duration::from_secs(1)).unwrap();

        send_record(
            &tx,
            sighting("123e4567-e89b-12d3-a456-426614174000", "US", "2020-10-25"),
        )
        .unwrap();
        send_record(
            &tx,
            sighting("123e4567-e89b-12d3-a456-426614174000", "DE", "2020-10-26"),
        )
        .unwrap();

        let country: String = reader_conn
            .query_row(
                "SELECT country_code FROM presence WHERE client_id = ?",
                duckdb::params!["123e4567-e89b-12d3-a456-426614174000"],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(country, "US");

        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_new_day_column_for_existing_rows() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("newday.db");
        let (handle, tx, reader_conn) =
            DbActor::spawn(&db_path, 100, Duration::from_secs(1)).unwrap();

        send_record(
            &tx,
            sighting("123e4567-e89b-12d3-a456-426614174000", "US", "2020-10-25"),
        )
        .unwrap();
        send_record(
            &tx,
            sighting("ffffffff-ffff-ffff-ffff-ffffffffffff", "DE", "2020-10-26"),
        )
        .unwrap();

        // The earlier client defaults to false on the later day's column.
        let seen: bool = reader_conn
            .query_row(
                "SELECT day_2020_10_26 FROM presence WHERE client_id = ?",
                duckdb::params!["123e4567-e89b-12d3-a456-426614174000"],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!seen);

        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();
    }
}
