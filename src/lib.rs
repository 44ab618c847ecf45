//! Tally - Unique-Visitor Presence Collector
//!
//! Records that a client UUID was seen on a GMT calendar day, tagged with a
//! country code derived from the client's network address, and answers
//! "which UUIDs were seen on day D" with an optional country filter.
//!
//! # Architecture
//!
//! - **Storage**: DuckDB-backed presence table; one boolean column per
//!   observed day, added lazily. A single writer actor serializes every
//!   migration+upsert; readers run concurrently on cloned connections.
//! - **Server**: Axum request surface (`/collect`, `/uniques`, health probes)
//! - **Geo**: Client-address country lookup behind a trait
//! - **Config**: YAML configuration with CLI/env overrides
//!
//! # Example
//!
//! ```rust,ignore
//! use tally::{Day, Sighting, StorageBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tally::StorageError> {
//!     let handles = StorageBuilder::new("./tally.db").build()?;
//!
//!     let id = tally::ClientId::parse("123e4567-e89b-12d3-a456-426614174000")?;
//!     handles
//!         .writer
//!         .record(Sighting::new(id, "US", Day::today_utc()))
//!         .await?;
//!
//!     let seen = handles.reader.query(&Day::today_utc(), None)?;
//!     println!("{} uniques today", seen.len());
//!
//!     handles.shutdown()
//! }
//! ```

pub mod config;
pub mod geo;
pub mod server;
pub mod storage;

pub use storage::{
    ClientId, CountryFilter, Day, FormatError, PresenceReader, PresenceWriter, Sighting,
    StorageBuilder, StorageError, StorageHandles,
};
