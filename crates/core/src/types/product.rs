//! Product snapshot domain type.
//!
//! A snapshot is a possibly-stale copy of a product record as the catalog
//! last reported it. Snapshots are replaced wholesale on re-resolution,
//! never mutated in place.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::id::ProductId;
use crate::types::price::Price;

/// A cached copy of a product's resolved details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Product description.
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Units currently in stock.
    pub stock: u32,
    /// Optional product image.
    pub picture: Option<Url>,
    /// Whether the product has been discontinued (or could not be resolved).
    pub is_discontinued: bool,
}

impl ProductSnapshot {
    /// Synthetic placeholder for a product that could not be resolved.
    ///
    /// Cached in place of the real record so repeated renders don't
    /// re-fetch a product that is deleted or unreachable.
    #[must_use]
    pub fn discontinued(id: ProductId) -> Self {
        Self {
            id,
            name: String::new(),
            description: String::new(),
            price: Price::zero(),
            stock: 0,
            picture: None,
            is_discontinued: true,
        }
    }

    /// Whether the product can currently be purchased.
    ///
    /// Discontinued and zero-stock products stay in the cart but are
    /// excluded from the monetary total.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        !self.is_discontinued && self.stock > 0
    }
}
