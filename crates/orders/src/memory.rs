use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, UserId};
use tokio::sync::RwLock;

use crate::error::{OrderError, Result};
use crate::order::Order;
use crate::status::OrderStatus;
use crate::store::OrderStore;

/// In-memory order store for testing and single-node deployments.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders held.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Order> {
        let orders = self.orders.read().await;
        orders
            .get(&id)
            .cloned()
            .ok_or(OrderError::NotFound { order_id: id })
    }

    async fn update_if_status(&self, order: Order, expected: OrderStatus) -> Result<()> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(&order.id)
            .ok_or(OrderError::NotFound { order_id: order.id })?;

        if stored.status != expected {
            return Err(OrderError::ConcurrentModification { order_id: order.id });
        }

        *stored = order;
        Ok(())
    }

    async fn list_for_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut result: Vec<_> = orders
            .values()
            .filter(|order| order.buyer_id == buyer_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut result: Vec<_> = orders
            .values()
            .filter(|order| order.has_seller(seller_id))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{DeliveryAddress, PaymentProvider, PaymentRecord};
    use catalog::GeoPoint;
    use chrono::Utc;
    use common::Money;

    fn order(buyer_id: UserId) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(),
            buyer_id,
            lines: vec![],
            total_amount: Money::zero(),
            delivery_charge: Money::zero(),
            delivery_address: DeliveryAddress {
                line1: "1 Farm Lane".to_string(),
                city: "Abeokuta".to_string(),
                postal_code: None,
                location: GeoPoint::new(7.15, 3.35).unwrap(),
            },
            status: OrderStatus::Pending,
            payment: PaymentRecord::pending(PaymentProvider::CashOnDelivery),
            notes: None,
            cancellation_reason: None,
            estimated_delivery: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = InMemoryOrderStore::new();
        let o = order(UserId::new());
        store.insert(o.clone()).await.unwrap();

        let fetched = store.get_by_id(o.id).await.unwrap();
        assert_eq!(fetched, o);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = InMemoryOrderStore::new();
        let result = store.get_by_id(OrderId::new()).await;
        assert!(matches!(result, Err(OrderError::NotFound { .. })));
    }

    #[tokio::test]
    async fn conditional_update_applies_on_matching_status() {
        let store = InMemoryOrderStore::new();
        let mut o = order(UserId::new());
        store.insert(o.clone()).await.unwrap();

        o.status = OrderStatus::Paid;
        store
            .update_if_status(o.clone(), OrderStatus::Pending)
            .await
            .unwrap();

        assert_eq!(
            store.get_by_id(o.id).await.unwrap().status,
            OrderStatus::Paid
        );
    }

    #[tokio::test]
    async fn conditional_update_rejects_on_stale_status() {
        let store = InMemoryOrderStore::new();
        let mut o = order(UserId::new());
        store.insert(o.clone()).await.unwrap();

        o.status = OrderStatus::Paid;
        let result = store.update_if_status(o, OrderStatus::Paid).await;
        assert!(matches!(
            result,
            Err(OrderError::ConcurrentModification { .. })
        ));
    }

    #[tokio::test]
    async fn list_for_buyer_newest_first() {
        let store = InMemoryOrderStore::new();
        let buyer = UserId::new();

        let mut first = order(buyer);
        first.created_at = Utc::now() - chrono::Duration::minutes(5);
        let second = order(buyer);
        store.insert(first.clone()).await.unwrap();
        store.insert(second.clone()).await.unwrap();
        store.insert(order(UserId::new())).await.unwrap();

        let listed = store.list_for_buyer(buyer).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }
}
