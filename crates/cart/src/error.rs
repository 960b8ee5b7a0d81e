//! Error types for the collaborator seams.
//!
//! The engine itself never returns these to UI callers - every failure
//! path degrades to a smaller-but-consistent cart state. They exist so
//! storage and catalog implementations have a typed way to report
//! failures, which the engine logs and absorbs.

use thiserror::Error;

/// Errors a [`CartStorage`](crate::CartStorage) backend can report.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store rejected or failed the operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The backing store is not available at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors a [`ProductLookup`](crate::ProductLookup) backend can report.
///
/// A product that simply no longer exists is not an error - lookups
/// return `Ok(None)` for that case.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The catalog could not be reached.
    #[error("catalog unreachable: {0}")]
    Unreachable(String),

    /// The catalog answered with a record the client could not read.
    #[error("malformed catalog record: {0}")]
    Malformed(String),
}
