use catalog::CatalogError;
use common::{ItemId, OrderId};
use reconciler::ReconcilerError;
use thiserror::Error;

use crate::status::OrderStatus;

/// Result type for order operations.
pub type Result<T> = std::result::Result<T, OrderError>;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order does not exist.
    #[error("order not found: {order_id}")]
    NotFound { order_id: OrderId },

    /// The acting principal may not perform this operation on the order.
    #[error("not permitted to {action} order {order_id}")]
    Forbidden {
        order_id: OrderId,
        action: &'static str,
    },

    /// An order must contain at least one line.
    #[error("order has no lines")]
    EmptyOrder,

    /// Requested quantity is zero.
    #[error("invalid quantity for item {item_id}: must be at least 1")]
    InvalidQuantity { item_id: ItemId },

    /// The item is missing or hidden from sale.
    #[error("item unavailable: {item_id}")]
    ItemUnavailable { item_id: ItemId },

    /// Requested quantity is below the item's minimum order.
    #[error("item {item_id} requires a minimum order of {minimum}, requested {requested}")]
    BelowMinimumOrder {
        item_id: ItemId,
        minimum: u32,
        requested: u32,
    },

    /// Not enough stock for a line, either up front or after losing a
    /// reservation race. Retryable with an adjusted quantity.
    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: u32,
        available: u32,
    },

    /// Illegal order-status change.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    /// The order changed underneath a conditional update. Safe to retry.
    #[error("order {order_id} was modified concurrently; retry")]
    ConcurrentModification { order_id: OrderId },

    /// Catalog error outside the translated cases above.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Reconciler error outside the translated cases above.
    #[error(transparent)]
    Reconciler(#[from] ReconcilerError),

    /// Database error from the PostgreSQL backend.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
