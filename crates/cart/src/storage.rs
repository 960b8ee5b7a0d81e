//! Durable key-value storage seam.
//!
//! The cart persists only its minimal entry list, serialized as JSON under
//! an identity-scoped key. The storage backend is an external collaborator
//! (browser local storage, a file, a test double); the engine tolerates
//! any of its failures by degrading to an empty or unpersisted cart.

use std::collections::HashMap;
use std::sync::Mutex;

use green_canopy_core::CartEntry;
use tracing::{debug, warn};

use crate::error::StorageError;

/// Trait for durable key-value storage backends.
///
/// Synchronous from the caller's perspective, scoped per origin by the
/// embedder. Implementations must be cheap to call repeatedly - the
/// engine writes on every mutation.
pub trait CartStorage: Send + Sync {
    /// Read the raw payload stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous payload.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: CartStorage + ?Sized> CartStorage for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// In-memory storage backend.
///
/// Useful for tests and for embedders without durable storage. Contents
/// live for the lifetime of the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Load the persisted entry list under `key`.
///
/// Absent, unreadable, or corrupt payloads all degrade to an empty cart;
/// the caller never sees a storage error. Entries that violate the cart
/// invariants (zero quantity, duplicate product) are dropped on load.
pub(crate) fn load_entries(storage: &impl CartStorage, key: &str) -> Vec<CartEntry> {
    let payload = match storage.get(key) {
        Ok(Some(payload)) => payload,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(key, error = %e, "cart storage read failed, starting with empty cart");
            return Vec::new();
        }
    };

    let parsed: Vec<CartEntry> = match serde_json::from_str(&payload) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(key, error = %e, "corrupt cart payload, starting with empty cart");
            return Vec::new();
        }
    };

    sanitize(parsed, key)
}

/// Persist the entry list under `key` as JSON.
///
/// Write failures are logged and swallowed; the in-memory state stays
/// authoritative for the rest of the session.
pub(crate) fn save_entries(storage: &impl CartStorage, key: &str, entries: &[CartEntry]) {
    let payload = match serde_json::to_string(entries) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(key, error = %e, "failed to serialize cart entries");
            return;
        }
    };

    if let Err(e) = storage.set(key, &payload) {
        warn!(key, error = %e, "cart storage write failed, keeping in-memory state");
    }
}

/// Drop entries that violate the cart invariants.
fn sanitize(parsed: Vec<CartEntry>, key: &str) -> Vec<CartEntry> {
    let mut seen = std::collections::HashSet::new();
    let mut entries = Vec::with_capacity(parsed.len());
    for entry in parsed {
        if entry.quantity < 1 {
            debug!(key, product_id = %entry.product_id, "dropping zero-quantity entry on load");
            continue;
        }
        if !seen.insert(entry.product_id) {
            debug!(key, product_id = %entry.product_id, "dropping duplicate entry on load");
            continue;
        }
        entries.push(entry);
    }
    entries
}
