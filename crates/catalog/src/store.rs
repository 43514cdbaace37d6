//! Catalog store abstraction.

use async_trait::async_trait;
use common::{ItemId, UserId};

use crate::error::Result;
use crate::item::{CatalogItem, ItemUpdate, NewItem};
use crate::query::{NearbyItem, NearbyQuery};

/// Persistence boundary for catalog items.
///
/// Implementations must make `adjust_stock` a linearizable conditional
/// update: two concurrent decrements whose combined quantity exceeds the
/// available stock can never both succeed, and a decrement composes with a
/// concurrent increment without losing either write.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Creates an item for a seller after validating its attributes.
    async fn create(&self, seller_id: UserId, attrs: NewItem) -> Result<CatalogItem>;

    /// Applies a partial update. Fails with `Forbidden` if the acting
    /// seller does not own the item. Cannot change stock.
    async fn update(&self, seller_id: UserId, id: ItemId, attrs: ItemUpdate)
    -> Result<CatalogItem>;

    /// Fetches one item by id regardless of visibility.
    async fn get_by_id(&self, id: ItemId) -> Result<CatalogItem>;

    /// Lists a seller's items, visible or not.
    async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<CatalogItem>>;

    /// Returns visible, in-stock items within the query radius, filtered
    /// and ordered by ascending distance. Unmatched filters yield an empty
    /// list, never an error.
    async fn list_nearby(&self, query: NearbyQuery) -> Result<Vec<NearbyItem>>;

    /// Atomically adjusts stock by `delta` (positive or negative) and
    /// returns the new quantity. Fails with `InsufficientStock` when the
    /// result would be negative, leaving the counter untouched.
    async fn adjust_stock(&self, id: ItemId, delta: i64) -> Result<u32>;
}
