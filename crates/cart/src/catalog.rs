//! Product detail resolution and the session-scoped snapshot cache.
//!
//! The cart stores only product IDs; full records are resolved through the
//! [`ProductLookup`] seam and cached per session. A product that fails to
//! resolve is cached as a discontinued placeholder so repeated renders
//! never turn into fetch storms - every ID referenced by the cart ends up
//! with *some* cache entry.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;
use green_canopy_core::{CartEntry, ProductId, ProductSnapshot};
use tracing::{debug, warn};

use crate::error::LookupError;

/// Trait for catalog backends that resolve product records.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    /// Fetch one product by ID.
    ///
    /// `Ok(None)` means the product no longer exists; it is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`LookupError`] if the catalog cannot be queried.
    async fn fetch_product_by_id(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductSnapshot>, LookupError>;
}

#[async_trait]
impl<T: ProductLookup + ?Sized> ProductLookup for std::sync::Arc<T> {
    async fn fetch_product_by_id(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductSnapshot>, LookupError> {
        (**self).fetch_product_by_id(id).await
    }
}

/// Session-scoped cache of resolved product snapshots.
///
/// Never persisted - rebuilt from the catalog each session. The epoch
/// counter distinguishes fetch batches across identity switches so a
/// stale batch can be recognized and discarded at commit time.
#[derive(Debug, Default)]
pub(crate) struct SnapshotCache {
    snapshots: HashMap<ProductId, ProductSnapshot>,
    epoch: u64,
}

impl SnapshotCache {
    /// The snapshot cached for `id`, if any.
    pub(crate) fn get(&self, id: ProductId) -> Option<&ProductSnapshot> {
        self.snapshots.get(&id)
    }

    /// Insert or replace a snapshot wholesale.
    pub(crate) fn insert(&mut self, snapshot: ProductSnapshot) {
        self.snapshots.insert(snapshot.id, snapshot);
    }

    /// Cart IDs with no cache entry yet.
    ///
    /// Cached IDs are never returned, including discontinued placeholders;
    /// a cached outcome is final for the session.
    pub(crate) fn missing_from(&self, entries: &[CartEntry]) -> Vec<ProductId> {
        entries
            .iter()
            .map(|entry| entry.product_id)
            .filter(|id| !self.snapshots.contains_key(id))
            .collect()
    }

    /// Merge a resolved batch into the cache as one atomic update.
    pub(crate) fn merge_batch(&mut self, batch: Vec<ProductSnapshot>) {
        for snapshot in batch {
            self.insert(snapshot);
        }
    }

    /// Clear all snapshots and advance the epoch.
    ///
    /// Called on identity switch; any batch begun under the old epoch is
    /// thereby superseded.
    pub(crate) fn reset(&mut self) {
        self.snapshots.clear();
        self.epoch += 1;
    }

    /// The current epoch.
    pub(crate) const fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Fetch `ids` concurrently, resolving each one independently.
///
/// A slow or failing ID never blocks the others. Failures and missing
/// products yield a discontinued placeholder, so the returned batch always
/// covers every requested ID.
pub(crate) async fn fetch_batch<L: ProductLookup>(
    lookup: &L,
    ids: Vec<ProductId>,
) -> Vec<ProductSnapshot> {
    let fetches = ids.into_iter().map(|id| async move {
        match lookup.fetch_product_by_id(id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!(product_id = %id, "product gone, caching discontinued placeholder");
                ProductSnapshot::discontinued(id)
            }
            Err(e) => {
                warn!(product_id = %id, error = %e, "product fetch failed, caching discontinued placeholder");
                ProductSnapshot::discontinued(id)
            }
        }
    });

    join_all(fetches).await
}
