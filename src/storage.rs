//! Storage Layer
//!
//! DuckDB-backed presence table with async read/write separation:
//! - **Writer**: One actor thread owns the write connection; every record
//!   command runs day-column migration + upsert in a single transaction, so
//!   concurrent writers are serialized by construction
//! - **Reader**: Connections cloned from the writer's for concurrent reads
//!
//! # Components
//!
//! - [`PresenceWriter`]: Records sightings; resolves after the commit
//! - [`PresenceReader`]: Presence-by-day queries with optional country filter
//! - [`StorageAdmin`]: Checkpoint and shutdown
//! - [`StorageBuilder`] / [`StorageHandles`]: Initialization and lifecycle management

mod actor;
mod builder;
mod error;
mod facades;
mod pool;
mod schema;
pub mod types;

pub use builder::{StorageBuilder, StorageHandles};
pub use error::{FormatError, StorageError};
pub use facades::{PresenceReader, PresenceWriter, StorageAdmin};
pub use types::{ClientId, CountryFilter, Day, Sighting};
