//! Storage-specific error types.
//!
//! Lexical validation failures ([`FormatError`]) are kept distinct from
//! backend failures so callers can tell "bad input" apart from "backend
//! down". A zero-row query is neither; it is an `Ok` empty result.

use thiserror::Error;

/// A value failed lexical validation before reaching storage.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// Client id is not hexadecimal in 8-4-4-4-12 form.
    #[error("client id must be hexadecimal in 8-4-4-4-12 form")]
    ClientId,

    /// Day is not in YYYY-MM-DD form.
    #[error("day must be in YYYY-MM-DD form")]
    Day,

    /// Country filter is not exactly two uppercase letters.
    #[error("country code must be two uppercase letters")]
    CountryFilter,
}

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Input failed validation; no storage call was made.
    #[error("invalid format: {0}")]
    InvalidFormat(#[from] FormatError),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    /// Writer actor is gone or its channel is full.
    #[error("failed to send command to writer actor")]
    ChannelSend,

    /// Internal error (e.g., thread join failure).
    #[error("internal error: {0}")]
    Internal(String),
}
