//! User-facing storage facades.
//!
//! Provides ergonomic APIs for storage operations:
//! - `PresenceWriter`: Records sightings through the writer actor
//! - `PresenceReader`: Presence-by-day queries on pooled reader connections
//! - `StorageAdmin`: Checkpoint and shutdown

use std::sync::Arc;
use std::sync::mpsc::SyncSender;

use tokio::sync::oneshot;

use crate::storage::StorageError;
use crate::storage::actor::Command;
use crate::storage::pool::ReadPool;
use crate::storage::schema::day_column_exists;
use crate::storage::types::{CountryFilter, Day, Sighting};

// =============================================================================
// Writer
// =============================================================================

/// Writer facade; commands travel over the actor channel.
#[derive(Clone)]
pub struct PresenceWriter {
    tx: SyncSender<Command>,
}

impl std::fmt::Debug for PresenceWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceWriter").finish_non_exhaustive()
    }
}

impl PresenceWriter {
    pub(crate) fn new(tx: SyncSender<Command>) -> Self {
        Self { tx }
    }

    /// Mark the client present on the given day.
    ///
    /// Resolves once the transaction has committed, so a success is durable.
    /// A full command channel surfaces as `ChannelSend` instead of blocking
    /// the caller.
    pub async fn record(&self, sighting: Sighting) -> Result<(), StorageError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .try_send(Command::Record {
                sighting,
                reply: reply_tx,
            })
            .map_err(|_| StorageError::ChannelSend)?;
        reply_rx.await.map_err(|_| StorageError::ChannelSend)?
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Reader facade for presence-by-day queries.
#[derive(Clone)]
pub struct PresenceReader {
    pool: Arc<ReadPool>,
}

impl std::fmt::Debug for PresenceReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceReader").finish_non_exhaustive()
    }
}

impl PresenceReader {
    pub(crate) fn new(pool: Arc<ReadPool>) -> Self {
        Self { pool }
    }

    /// All client ids seen on `day`, optionally filtered by country.
    ///
    /// A day that has never been written is a valid empty result, not an
    /// error; only backend failures surface as `Err`. Result order is
    /// whatever the scan yields; callers get set semantics.
    pub fn query(
        &self,
        day: &Day,
        country: Option<&CountryFilter>,
    ) -> Result<Vec<String>, StorageError> {
        let conn = self.pool.get()?;

        if !day_column_exists(&conn, day)? {
            return Ok(Vec::new());
        }

        // Only the validated day-column identifier is interpolated; the
        // country value is always bound as a parameter.
        let mut sql = format!(
            "SELECT client_id FROM presence WHERE \"{}\" = true",
            day.column_name()
        );
        let mut params: Vec<Box<dyn duckdb::ToSql>> = Vec::new();

        if let Some(cc) = country {
            sql.push_str(" AND country_code = ?");
            params.push(Box::new(cc.as_str().to_string()));
        }

        let param_refs: Vec<&dyn duckdb::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), |row| row.get::<_, String>(0))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::from)
    }
}

// =============================================================================
// Admin
// =============================================================================

/// Storage administration.
#[derive(Clone)]
pub struct StorageAdmin {
    tx: SyncSender<Command>,
}

impl std::fmt::Debug for StorageAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAdmin").finish_non_exhaustive()
    }
}

impl StorageAdmin {
    pub(crate) fn new(tx: SyncSender<Command>) -> Self {
        Self { tx }
    }

    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.tx
            .try_send(Command::Checkpoint)
            .map_err(|_| StorageError::ChannelSend)
    }

    pub fn shutdown(&self) -> Result<(), StorageError> {
        self.tx
            .try_send(Command::Shutdown)
            .map_err(|_| StorageError::ChannelSend)
    }
}
