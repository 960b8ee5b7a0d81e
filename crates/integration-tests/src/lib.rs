//! Test support for Green Canopy integration tests.
//!
//! The cart engine's two collaborators get controllable doubles here:
//!
//! - [`FakeCatalog`] - an in-memory [`ProductLookup`] with per-ID failure
//!   injection, a fetch counter, and a gate that holds fetches in flight
//!   so tests can interleave identity switches with detail resolution
//! - [`CountingStorage`] - a [`CartStorage`] wrapper that counts writes,
//!   for asserting the engine's write-amplification discipline
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p green-canopy-integration-tests
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use green_canopy_cart::{CartStorage, LookupError, MemoryStorage, ProductLookup, StorageError};
use green_canopy_core::{Price, ProductId, ProductSnapshot};
use tokio::sync::watch;

/// Build a purchasable product snapshot for tests.
#[must_use]
pub fn product(id: i32, name: &str, cents: i64, stock: u32) -> ProductSnapshot {
    ProductSnapshot {
        id: ProductId::new(id),
        name: name.to_string(),
        description: format!("{name} description"),
        price: Price::from_cents(cents),
        stock,
        picture: None,
        is_discontinued: false,
    }
}

/// In-memory catalog double.
///
/// Fetches can be held in flight by closing the gate; they proceed once
/// the gate reopens. The fetch counter increments when a fetch *starts*,
/// so tests can wait for a batch to be in flight before interleaving
/// other operations.
pub struct FakeCatalog {
    products: Mutex<HashMap<ProductId, ProductSnapshot>>,
    fail_ids: Mutex<HashSet<ProductId>>,
    fetches: AtomicUsize,
    gate: watch::Sender<bool>,
}

impl Default for FakeCatalog {
    fn default() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            products: Mutex::new(HashMap::new()),
            fail_ids: Mutex::new(HashSet::new()),
            fetches: AtomicUsize::new(0),
            gate,
        }
    }
}

impl FakeCatalog {
    /// Create a catalog stocked with the given products.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = ProductSnapshot>) -> Self {
        let catalog = Self::default();
        for p in products {
            catalog.insert(p);
        }
        catalog
    }

    /// Add or replace a product.
    pub fn insert(&self, product: ProductSnapshot) {
        self.products
            .lock()
            .expect("products lock")
            .insert(product.id, product);
    }

    /// Make every fetch for `id` fail with a network error.
    pub fn fail_on(&self, id: ProductId) {
        self.fail_ids.lock().expect("fail_ids lock").insert(id);
    }

    /// Hold all subsequent fetches in flight.
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    /// Release held fetches.
    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    /// How many fetches have started.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` fetches have started.
    pub async fn wait_for_fetches(&self, n: usize) {
        while self.fetch_count() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl ProductLookup for FakeCatalog {
    async fn fetch_product_by_id(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductSnapshot>, LookupError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        // wait_for checks the current value first, so an open gate never blocks.
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        if self.fail_ids.lock().expect("fail_ids lock").contains(&id) {
            return Err(LookupError::Unreachable(
                "simulated network failure".to_string(),
            ));
        }
        Ok(self.products.lock().expect("products lock").get(&id).cloned())
    }
}

/// Storage wrapper that counts writes.
#[derive(Debug, Default)]
pub struct CountingStorage {
    inner: MemoryStorage,
    writes: AtomicUsize,
}

impl CountingStorage {
    /// Create an empty counting store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many writes have been performed.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Read a raw payload directly, bypassing the counter.
    ///
    /// # Errors
    ///
    /// Propagates the underlying [`StorageError`].
    pub fn raw_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    /// Seed a raw payload directly, bypassing the counter.
    ///
    /// # Errors
    ///
    /// Propagates the underlying [`StorageError`].
    pub fn seed(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value)
    }
}

impl CartStorage for CountingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }
}
