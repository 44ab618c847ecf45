//! Storage builder and handles.
//!
//! Provides a builder pattern for constructing the storage layer
//! and a handles struct for accessing all storage facades.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::storage::StorageError;
use crate::storage::actor::DbActor;
use crate::storage::pool::ReadPool;
use crate::storage::{PresenceReader, PresenceWriter, StorageAdmin};

/// Default channel capacity for writer commands.
///
/// Each record is one command with a waiting caller, so this bounds the
/// number of in-flight writes before callers see backpressure.
const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// Default WAL checkpoint interval.
const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(5);

/// Builder for constructing the storage layer.
pub struct StorageBuilder {
    db_path: PathBuf,
    channel_capacity: usize,
    checkpoint_interval: Duration,
}

impl StorageBuilder {
    /// Create a new storage builder.
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }

    /// Set the channel capacity for writer commands.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the WAL checkpoint interval.
    pub fn checkpoint_interval(mut self, interval: Duration) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Build the storage layer and return handles.
    pub fn build(self) -> Result<StorageHandles, StorageError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = self.db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Internal(format!(
                    "Failed to create database directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        // Spawn writer actor - returns a cloneable connection for readers
        let (actor_handle, tx, reader_conn) = DbActor::spawn(
            &self.db_path,
            self.channel_capacity,
            self.checkpoint_interval,
        )?;

        // Readers share the writer's database instance through the cloned
        // connection, so committed writes are visible immediately.
        let pool = ReadPool::new(reader_conn);

        Ok(StorageHandles {
            writer: PresenceWriter::new(tx.clone()),
            reader: PresenceReader::new(Arc::clone(&pool)),
            admin: StorageAdmin::new(tx),
            actor_handle: Some(actor_handle),
        })
    }
}

/// Handles to all storage layer facades.
pub struct StorageHandles {
    /// Facade for recording sightings.
    pub writer: PresenceWriter,
    /// Facade for presence queries.
    pub reader: PresenceReader,
    /// Facade for storage administration.
    pub admin: StorageAdmin,
    /// Internal actor handle for graceful shutdown.
    actor_handle: Option<JoinHandle<()>>,
}

impl StorageHandles {
    /// Gracefully shutdown the storage layer.
    ///
    /// Sends shutdown command to the writer actor and waits for it to finish.
    pub fn shutdown(mut self) -> Result<(), StorageError> {
        self.admin.shutdown()?;

        if let Some(handle) = self.actor_handle.take() {
            handle
                .join()
                .map_err(|_| StorageError::Internal("Failed to join actor thread".to_string()))?;
        }

        Ok(())
    }
}

impl Drop for StorageHandles {
    fn drop(&mut self) {
        // Try graceful shutdown if not already done
        if self.actor_handle.is_some() {
            let _ = self.admin.shutdown();
            if let Some(handle) = self.actor_handle.take() {
                let _ = handle.join();
            }
        }
    }
}
