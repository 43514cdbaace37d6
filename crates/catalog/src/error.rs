use common::{ItemId, UserId};
use thiserror::Error;

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Item does not exist.
    #[error("item not found: {item_id}")]
    NotFound { item_id: ItemId },

    /// The acting seller does not own the item.
    #[error("seller {seller_id} does not own item {item_id}")]
    Forbidden { item_id: ItemId, seller_id: UserId },

    /// A stock decrement would take the counter below zero.
    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: u32,
        available: u32,
    },

    /// Coordinates outside valid bounds.
    #[error("invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    /// Negative price.
    #[error("invalid price: {cents} cents (must not be negative)")]
    InvalidPrice { cents: i64 },

    /// A field failed validation.
    #[error("invalid {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    /// Database error from the PostgreSQL backend.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CatalogError {
    /// Returns true for errors the caller can fix by correcting input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CatalogError::InvalidCoordinates { .. }
                | CatalogError::InvalidPrice { .. }
                | CatalogError::InvalidField { .. }
        )
    }
}
