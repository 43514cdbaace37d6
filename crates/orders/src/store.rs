//! Order store abstraction.

use async_trait::async_trait;
use common::{OrderId, UserId};

use crate::error::Result;
use crate::order::Order;
use crate::status::OrderStatus;

/// Persistence boundary for orders.
///
/// Orders are inserted once and thereafter mutated only through
/// `update_if_status`, a conditional write keyed on the currently stored
/// status. That makes status transitions first-writer-wins: two concurrent
/// transitions from the same status can never both apply.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order.
    async fn insert(&self, order: Order) -> Result<()>;

    /// Fetches one order by id.
    async fn get_by_id(&self, id: OrderId) -> Result<Order>;

    /// Persists a mutated order only if the stored status still equals
    /// `expected`. Fails with `ConcurrentModification` otherwise.
    async fn update_if_status(&self, order: Order, expected: OrderStatus) -> Result<()>;

    /// Lists a buyer's orders, newest first.
    async fn list_for_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>>;

    /// Lists orders containing at least one line owned by the seller,
    /// newest first.
    async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<Order>>;
}
