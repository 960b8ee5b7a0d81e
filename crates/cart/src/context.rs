//! The cart context - the public engine object.
//!
//! `CartContext` is an explicit, cheaply-cloneable state object injected by
//! the embedder; there are no ambient singletons. UI layers call the
//! mutation operations, drive [`CartContext::resolve_details`] after entry
//! changes, and observe state through the derived getters or through
//! subscription callbacks.
//!
//! All state lives under one lock that is never held across an `await`.
//! The detail fetch runs lock-free between a begin step (collect missing
//! IDs plus the cache epoch) and a commit step (merge, reconcile, persist);
//! a batch whose epoch no longer matches is discarded wholesale.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use green_canopy_core::{CartEntry, IdentityState, Price, ProductId, ProductSnapshot};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::catalog::{ProductLookup, SnapshotCache, fetch_batch};
use crate::reconcile::clamp_to_stock;
use crate::storage::{CartStorage, load_entries, save_entries};

/// A cart entry merged with its resolved product snapshot.
///
/// Entries whose snapshot has not resolved yet are omitted from the view
/// entirely - "loading" rather than "broken".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    /// The resolved product details.
    pub product: ProductSnapshot,
    /// Requested quantity.
    pub quantity: u32,
}

impl CartItem {
    /// Price for this line (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// State-change notifications delivered to subscribers.
///
/// Events carry no payload; subscribers pull fresh views from the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartEvent {
    /// The identity (and therefore the whole cart key space) changed.
    IdentityChanged,
    /// The entry list changed - a mutation or a reconciliation write.
    EntriesChanged,
    /// A detail fetch batch settled into the cache.
    DetailsResolved,
}

/// Handle returned by [`CartContext::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(CartEvent) + Send + Sync>;

/// The cart reconciliation engine.
///
/// Cheaply cloneable via `Arc`; all clones share one cart state. Generic
/// over its two external collaborators: a [`CartStorage`] backend for the
/// durable entry list and a [`ProductLookup`] backend for detail
/// resolution.
///
/// A freshly created context has an unresolved identity and suspends every
/// operation until [`CartContext::set_identity`] reports what the identity
/// provider resolved.
pub struct CartContext<S, L> {
    inner: Arc<CartContextInner<S, L>>,
}

impl<S, L> Clone for CartContext<S, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CartContextInner<S, L> {
    storage: S,
    lookup: L,
    state: RwLock<CartState>,
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
    next_subscription: AtomicU64,
}

#[derive(Default)]
struct CartState {
    identity: IdentityState,
    entries: Vec<CartEntry>,
    cache: SnapshotCache,
    loading_details: bool,
}

impl<S: CartStorage, L: ProductLookup> CartContext<S, L> {
    /// Create a new cart context with an unresolved identity.
    #[must_use]
    pub fn new(storage: S, lookup: L) -> Self {
        Self {
            inner: Arc::new(CartContextInner {
                storage,
                lookup,
                state: RwLock::new(CartState::default()),
                subscribers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
            }),
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Switch to the identity the provider resolved.
    ///
    /// Swaps to that identity's key space, loads its persisted entries
    /// (absent or corrupt payloads load as empty), clears the snapshot
    /// cache, and advances the epoch so any in-flight detail batch is
    /// discarded at commit. Carts are never merged across identities.
    #[instrument(skip(self))]
    pub async fn set_identity(&self, identity: IdentityState) {
        let mut state = self.inner.state.write().await;
        if state.identity == identity {
            return;
        }

        state.identity = identity;
        state.cache.reset();
        state.entries = match identity.storage_key() {
            Some(key) => load_entries(&self.inner.storage, &key),
            None => Vec::new(),
        };
        // The cache is empty, so every loaded entry is missing details.
        state.loading_details = !state.entries.is_empty();
        drop(state);

        self.notify(CartEvent::IdentityChanged);
    }

    /// The current identity state.
    pub async fn identity(&self) -> IdentityState {
        self.inner.state.read().await.identity
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of `product` to the cart.
    ///
    /// An existing entry increments; a new entry is inserted. The quantity
    /// clamps to the product's stock when the product is purchasable;
    /// discontinued and zero-stock products keep the requested quantity
    /// and are excluded from the total instead. The passed snapshot seeds
    /// the detail cache immediately so the UI never shows a loading gap
    /// for a product the user just picked.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(&self, product: &ProductSnapshot, quantity: u32) {
        if quantity < 1 {
            return;
        }
        let mut state = self.inner.state.write().await;
        if !state.identity.is_resolved() {
            debug!("identity unresolved, ignoring add_to_cart");
            return;
        }

        state.cache.insert(product.clone());

        let desired = state
            .entries
            .iter()
            .find(|e| e.product_id == product.id)
            .map_or(quantity, |e| e.quantity.saturating_add(quantity));
        let clamped = if product.is_purchasable() {
            desired.min(product.stock)
        } else {
            desired
        };

        if let Some(entry) = state
            .entries
            .iter_mut()
            .find(|e| e.product_id == product.id)
        {
            entry.quantity = clamped;
        } else {
            state.entries.push(CartEntry::new(product.id, clamped));
        }

        // The seed changed the cache, so reconcile the whole cart against it.
        let state_ref = &mut *state;
        clamp_to_stock(&mut state_ref.entries, &state_ref.cache);

        self.persist(&state);
        drop(state);
        self.notify(CartEvent::EntriesChanged);
    }

    /// Remove the entry for `product_id`, if present.
    ///
    /// Idempotent: removing an absent product is a no-op.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, product_id: ProductId) {
        let mut state = self.inner.state.write().await;
        if !state.identity.is_resolved() {
            debug!("identity unresolved, ignoring remove_from_cart");
            return;
        }

        let before = state.entries.len();
        state.entries.retain(|e| e.product_id != product_id);
        if state.entries.len() == before {
            return;
        }

        self.persist(&state);
        drop(state);
        self.notify(CartEvent::EntriesChanged);
    }

    /// Set the quantity for an existing entry.
    ///
    /// No-op when `quantity` is zero or the product is not in the cart.
    /// Clamps to the known stock when a purchasable snapshot is cached;
    /// unbounded when stock is unknown.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, product_id: ProductId, quantity: u32) {
        if quantity < 1 {
            return;
        }
        let mut state = self.inner.state.write().await;
        if !state.identity.is_resolved() {
            debug!("identity unresolved, ignoring update_quantity");
            return;
        }

        let max_stock = state
            .cache
            .get(product_id)
            .filter(|s| s.is_purchasable())
            .map(|s| s.stock);
        let clamped = max_stock.map_or(quantity, |stock| quantity.min(stock));

        let Some(entry) = state
            .entries
            .iter_mut()
            .find(|e| e.product_id == product_id)
        else {
            return;
        };
        if entry.quantity == clamped {
            return;
        }
        entry.quantity = clamped;

        self.persist(&state);
        drop(state);
        self.notify(CartEvent::EntriesChanged);
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) {
        let mut state = self.inner.state.write().await;
        if !state.identity.is_resolved() {
            debug!("identity unresolved, ignoring clear_cart");
            return;
        }
        if state.entries.is_empty() {
            return;
        }

        state.entries.clear();
        self.persist(&state);
        drop(state);
        self.notify(CartEvent::EntriesChanged);
    }

    // =========================================================================
    // Detail resolution
    // =========================================================================

    /// Resolve product details for every cart entry missing from the cache.
    ///
    /// Fetches all missing IDs concurrently, each one independently; the
    /// settled batch merges into the cache atomically and the stock
    /// reconciler runs against the fresh data. Already-cached IDs -
    /// including discontinued placeholders - are never re-fetched.
    ///
    /// A batch begun before an identity switch is discarded wholesale when
    /// it settles: its epoch no longer matches the cache.
    #[instrument(skip(self))]
    pub async fn resolve_details(&self) {
        let (missing, epoch) = {
            let mut state = self.inner.state.write().await;
            if !state.identity.is_resolved() {
                return;
            }
            let missing = state.cache.missing_from(&state.entries);
            if missing.is_empty() {
                state.loading_details = false;
                return;
            }
            state.loading_details = true;
            (missing, state.cache.epoch())
        };

        // Lock released while the batch is in flight.
        let batch = fetch_batch(&self.inner.lookup, missing).await;

        let entries_changed = {
            let mut state = self.inner.state.write().await;
            if state.cache.epoch() != epoch {
                warn!(
                    batch_epoch = epoch,
                    current_epoch = state.cache.epoch(),
                    "discarding stale detail batch after identity switch"
                );
                return;
            }

            state.cache.merge_batch(batch);
            let state_ref = &mut *state;
            state_ref.loading_details = !state_ref.cache.missing_from(&state_ref.entries).is_empty();
            let changed = clamp_to_stock(&mut state_ref.entries, &state_ref.cache);
            if changed {
                self.persist(state_ref);
            }
            changed
        };

        self.notify(CartEvent::DetailsResolved);
        if entries_changed {
            self.notify(CartEvent::EntriesChanged);
        }
    }

    /// Whether a detail fetch batch is outstanding.
    ///
    /// True from the moment missing IDs are detected until their batch
    /// settles; UI layers gate spinners on this.
    pub async fn is_loading_details(&self) -> bool {
        self.inner.state.read().await.loading_details
    }

    // =========================================================================
    // Derived views
    // =========================================================================

    /// The merged cart view: every entry with a resolved snapshot.
    ///
    /// Never longer than the entry list; equal in length once all detail
    /// fetches have settled.
    pub async fn cart_items(&self) -> Vec<CartItem> {
        let state = self.inner.state.read().await;
        state
            .entries
            .iter()
            .filter_map(|e| {
                state.cache.get(e.product_id).map(|snapshot| CartItem {
                    product: snapshot.clone(),
                    quantity: e.quantity,
                })
            })
            .collect()
    }

    /// Monetary subtotal over purchasable entries.
    ///
    /// Discontinued and zero-stock entries are excluded, as are entries
    /// whose details have not resolved yet.
    pub async fn cart_total(&self) -> Price {
        let state = self.inner.state.read().await;
        state
            .entries
            .iter()
            .filter_map(|e| state.cache.get(e.product_id).map(|s| (s, e.quantity)))
            .filter(|(snapshot, _)| snapshot.is_purchasable())
            .map(|(snapshot, quantity)| snapshot.price.times(quantity))
            .sum()
    }

    /// Sum of raw quantities over *all* entries, available or not.
    ///
    /// Deliberately asymmetric with [`CartContext::cart_total`]: the badge
    /// count includes items the user cannot currently purchase.
    pub async fn cart_count(&self) -> u32 {
        let state = self.inner.state.read().await;
        state.entries.iter().map(|e| e.quantity).sum()
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    fn persist(&self, state: &CartState) {
        if let Some(key) = state.identity.storage_key() {
            save_entries(&self.inner.storage, &key, &state.entries);
        }
    }

    fn notify(&self, event: CartEvent) {
        let callbacks: Vec<Callback> = {
            let subscribers = self
                .inner
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        // Callbacks run outside every lock so they may call back in.
        for callback in callbacks {
            callback(event);
        }
    }
}

impl<S, L> CartContext<S, L> {
    /// Register a callback for cart state changes.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(CartEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a previously registered callback.
    ///
    /// Returns whether the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }
}
