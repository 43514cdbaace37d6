use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{ItemId, UserId};
use tokio::sync::RwLock;

use crate::error::{CatalogError, Result};
use crate::geo::{GeoGrid, haversine_km};
use crate::item::{CatalogItem, ItemUpdate, NewItem};
use crate::query::{NearbyItem, NearbyQuery, sort_by_distance};
use crate::store::CatalogStore;

#[derive(Debug, Default)]
struct CatalogState {
    items: HashMap<ItemId, CatalogItem>,
    grid: GeoGrid,
}

/// In-memory catalog store.
///
/// Backs tests and single-node deployments with the same interface as the
/// PostgreSQL implementation. The stock check-and-adjust runs inside a
/// single write-lock critical section, which makes per-item stock
/// mutations linearizable.
#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalogStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of items held.
    pub async fn item_count(&self) -> usize {
        self.state.read().await.items.len()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn create(&self, seller_id: UserId, attrs: NewItem) -> Result<CatalogItem> {
        attrs.validate()?;
        let item = attrs.into_item(seller_id, Utc::now());

        let mut state = self.state.write().await;
        state.grid.insert(item.id, item.location);
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update(
        &self,
        seller_id: UserId,
        id: ItemId,
        attrs: ItemUpdate,
    ) -> Result<CatalogItem> {
        attrs.validate()?;

        let mut state = self.state.write().await;
        let item = state
            .items
            .get_mut(&id)
            .ok_or(CatalogError::NotFound { item_id: id })?;

        if item.seller_id != seller_id {
            return Err(CatalogError::Forbidden {
                item_id: id,
                seller_id,
            });
        }

        let relocated = attrs.location;
        attrs.apply_to(item, Utc::now());
        let updated = item.clone();

        if let Some(location) = relocated {
            state.grid.insert(id, location);
        }
        Ok(updated)
    }

    async fn get_by_id(&self, id: ItemId) -> Result<CatalogItem> {
        let state = self.state.read().await;
        state
            .items
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound { item_id: id })
    }

    async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<CatalogItem>> {
        let state = self.state.read().await;
        let mut items: Vec<_> = state
            .items
            .values()
            .filter(|item| item.seller_id == seller_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn list_nearby(&self, query: NearbyQuery) -> Result<Vec<NearbyItem>> {
        query.origin.validate()?;

        let state = self.state.read().await;
        let mut results = Vec::new();
        for id in state.grid.candidates(query.origin, query.radius_km) {
            let Some(item) = state.items.get(&id) else {
                continue;
            };
            if !query.matches(item) {
                continue;
            }
            let distance_km = haversine_km(query.origin, item.location);
            if distance_km <= query.radius_km {
                results.push(NearbyItem {
                    item: item.clone(),
                    distance_km,
                });
            }
        }
        sort_by_distance(&mut results);
        Ok(results)
    }

    async fn adjust_stock(&self, id: ItemId, delta: i64) -> Result<u32> {
        let mut state = self.state.write().await;
        let item = state
            .items
            .get_mut(&id)
            .ok_or(CatalogError::NotFound { item_id: id })?;

        let new_quantity = item.stock_quantity as i64 + delta;
        if new_quantity < 0 {
            return Err(CatalogError::InsufficientStock {
                item_id: id,
                requested: delta.unsigned_abs() as u32,
                available: item.stock_quantity,
            });
        }

        item.stock_quantity = new_quantity as u32;
        item.updated_at = Utc::now();
        Ok(item.stock_quantity)
    }
}
