//! Stock reconciliation pass.
//!
//! Runs whenever the snapshot cache changes (never as a reaction to its own
//! entry writes) and clamps stored quantities to the stock the cache
//! reports. Idempotent by construction: a clamped quantity is `<= stock`,
//! so the next pass finds nothing to do.

use green_canopy_core::CartEntry;
use tracing::debug;

use crate::catalog::SnapshotCache;

/// Clamp entry quantities to the stock known for their products.
///
/// Entries whose snapshot is unresolved, discontinued, or out of stock are
/// left untouched - exclusion from the total handles those; removal stays
/// a user action. Returns whether any entry changed, so the caller can
/// persist once per pass instead of per entry.
pub(crate) fn clamp_to_stock(entries: &mut [CartEntry], cache: &SnapshotCache) -> bool {
    let mut changed = false;

    for entry in entries {
        let Some(snapshot) = cache.get(entry.product_id) else {
            continue;
        };
        if !snapshot.is_purchasable() {
            continue;
        }
        if entry.quantity > snapshot.stock {
            debug!(
                product_id = %entry.product_id,
                requested = entry.quantity,
                stock = snapshot.stock,
                "clamping cart quantity to available stock"
            );
            entry.quantity = snapshot.stock;
            changed = true;
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use green_canopy_core::{Price, ProductId, ProductSnapshot};

    use super::*;

    fn snapshot(id: i32, stock: u32) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            name: format!("product {id}"),
            description: String::new(),
            price: Price::from_cents(1000),
            stock,
            picture: None,
            is_discontinued: false,
        }
    }

    #[test]
    fn test_clamps_above_stock() {
        let mut cache = SnapshotCache::default();
        cache.insert(snapshot(1, 2));
        let mut entries = vec![CartEntry::new(ProductId::new(1), 3)];

        assert!(clamp_to_stock(&mut entries, &cache));
        assert_eq!(entries, vec![CartEntry::new(ProductId::new(1), 2)]);
    }

    #[test]
    fn test_idempotent() {
        let mut cache = SnapshotCache::default();
        cache.insert(snapshot(1, 2));
        let mut entries = vec![CartEntry::new(ProductId::new(1), 5)];

        assert!(clamp_to_stock(&mut entries, &cache));
        let after_first = entries.clone();

        // Second pass finds nothing to do and reports no change.
        assert!(!clamp_to_stock(&mut entries, &cache));
        assert_eq!(entries, after_first);
    }

    #[test]
    fn test_unavailable_entries_untouched() {
        let mut cache = SnapshotCache::default();
        cache.insert(snapshot(1, 0));
        cache.insert(ProductSnapshot::discontinued(ProductId::new(2)));
        let mut entries = vec![
            CartEntry::new(ProductId::new(1), 4),
            CartEntry::new(ProductId::new(2), 2),
            // No snapshot resolved for id 3 yet.
            CartEntry::new(ProductId::new(3), 7),
        ];
        let before = entries.clone();

        assert!(!clamp_to_stock(&mut entries, &cache));
        assert_eq!(entries, before);
    }

    #[test]
    fn test_at_stock_reports_no_change() {
        let mut cache = SnapshotCache::default();
        cache.insert(snapshot(1, 3));
        let mut entries = vec![CartEntry::new(ProductId::new(1), 3)];

        assert!(!clamp_to_stock(&mut entries, &cache));
    }
}
