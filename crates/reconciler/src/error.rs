use catalog::CatalogError;
use common::ItemId;
use thiserror::Error;

/// Result type for reconciler operations.
pub type Result<T> = std::result::Result<T, ReconcilerError>;

/// Errors that can occur while reserving or releasing stock.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// A line could not be reserved because stock ran out.
    ///
    /// Any decrements already taken for the same reservation were rolled
    /// back before this surfaced.
    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: u32,
        available: u32,
    },

    /// A referenced item does not exist.
    #[error("item unavailable: {item_id}")]
    ItemUnavailable { item_id: ItemId },

    /// A reservation failed and its rollback could not fully complete.
    ///
    /// Safe to retry: no partial reservation is held by the caller.
    #[error("reservation conflict on item {item_id}; rollback incomplete, retry the order")]
    Conflict { item_id: ItemId },

    /// Catalog storage error.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
