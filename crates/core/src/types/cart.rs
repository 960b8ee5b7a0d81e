//! Cart entry domain type.

use serde::{Deserialize, Serialize};

use crate::types::id::ProductId;

/// A `{product, quantity}` pair, the durable unit of the cart.
///
/// This is the only persisted cart representation - product details are
/// always re-derived from the catalog and never written to storage.
///
/// Invariants: `quantity >= 1`, and a cart holds at most one entry per
/// product (adding again increments the existing entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    /// Product this entry refers to.
    pub product_id: ProductId,
    /// Requested quantity, at least 1.
    pub quantity: u32,
}

impl CartEntry {
    /// Create a new cart entry.
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}
