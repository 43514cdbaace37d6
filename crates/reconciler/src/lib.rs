//! Inventory reconciler: the consistency boundary between the order ledger
//! and the catalog store.
//!
//! All order-driven stock mutation flows through this crate. A reservation
//! is an explicit saga over the catalog's atomic conditional decrement:
//! each line is taken in sequence, and the first failure triggers
//! compensating increments for every line already taken, so no partial
//! reservation ever survives a failed attempt even though the underlying
//! store offers no multi-row transaction.

mod error;

use catalog::{CatalogError, CatalogStore};
use common::ItemId;

pub use error::{ReconcilerError, Result};

/// One line of a reservation: an item and the quantity to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationLine {
    pub item_id: ItemId,
    pub quantity: u32,
}

impl ReservationLine {
    /// Creates a reservation line.
    pub fn new(item_id: ItemId, quantity: u32) -> Self {
        Self { item_id, quantity }
    }
}

/// Mediates stock mutation between orders and the catalog.
#[derive(Debug, Clone)]
pub struct InventoryReconciler<C> {
    catalog: C,
}

impl<C: CatalogStore> InventoryReconciler<C> {
    /// Creates a reconciler over a catalog store.
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Reserves stock for every line, all-or-nothing.
    ///
    /// Lines are decremented in order; if any decrement fails, every
    /// decrement already applied in this call is compensated before the
    /// error is returned. Per-item linearizability comes from the
    /// catalog's conditional `adjust_stock`; this method adds the
    /// cross-line atomicity the caller observes.
    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn reserve_for_order(&self, lines: &[ReservationLine]) -> Result<()> {
        metrics::counter!("reservations_total").increment(1);

        let mut taken: Vec<ReservationLine> = Vec::with_capacity(lines.len());
        for line in lines {
            match self
                .catalog
                .adjust_stock(line.item_id, -(line.quantity as i64))
                .await
            {
                Ok(_) => taken.push(*line),
                Err(err) => {
                    metrics::counter!("reservation_failures_total").increment(1);
                    let rolled_back = self.rollback(&taken).await;
                    if !rolled_back {
                        return Err(ReconcilerError::Conflict {
                            item_id: line.item_id,
                        });
                    }
                    return Err(match err {
                        CatalogError::InsufficientStock {
                            item_id,
                            requested,
                            available,
                        } => {
                            tracing::info!(
                                %item_id, requested, available,
                                "reservation lost the race for stock"
                            );
                            ReconcilerError::InsufficientStock {
                                item_id,
                                requested,
                                available,
                            }
                        }
                        CatalogError::NotFound { item_id } => {
                            ReconcilerError::ItemUnavailable { item_id }
                        }
                        other => other.into(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Releases previously reserved stock, used on cancellation.
    ///
    /// Increments each line; a line whose item no longer exists is logged
    /// and skipped so the order's historical record stays intact.
    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn release_for_order(&self, lines: &[ReservationLine]) -> Result<()> {
        for line in lines {
            match self
                .catalog
                .adjust_stock(line.item_id, line.quantity as i64)
                .await
            {
                Ok(_) => {}
                Err(CatalogError::NotFound { item_id }) => {
                    tracing::warn!(%item_id, "released line references a missing item; skipping");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Compensates the decrements taken so far, in reverse order.
    ///
    /// Returns false if any compensating increment failed, in which case
    /// the reservation surfaces as a conflict rather than a clean
    /// insufficient-stock result.
    async fn rollback(&self, taken: &[ReservationLine]) -> bool {
        let mut complete = true;
        for line in taken.iter().rev() {
            if let Err(err) = self
                .catalog
                .adjust_stock(line.item_id, line.quantity as i64)
                .await
            {
                tracing::error!(
                    item_id = %line.item_id,
                    quantity = line.quantity,
                    error = %err,
                    "compensating increment failed during reservation rollback"
                );
                complete = false;
            }
        }
        complete
    }
}
