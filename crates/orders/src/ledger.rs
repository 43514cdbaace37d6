//! Order ledger service: converts validated cart snapshots into durable,
//! price-frozen orders and drives the status state machine.

use chrono::{Duration, Utc};
use common::{Principal, Role, policy};

use catalog::{CatalogError, CatalogStore};
use reconciler::{InventoryReconciler, ReconcilerError, ReservationLine};

use crate::error::{OrderError, Result};
use crate::order::{Order, OrderDraft, OrderLine, PaymentRecord, PaymentStatus};
use crate::status::OrderStatus;
use crate::store::OrderStore;

/// Days added to the creation time for the delivery estimate.
const ESTIMATED_DELIVERY_DAYS: i64 = 2;

/// The order ledger.
///
/// Owns order lifecycle end to end: creation is an all-or-nothing
/// reservation saga against the catalog, and every later mutation is a
/// validated state-machine transition persisted with a conditional write.
pub struct OrderLedger<C, S> {
    catalog: C,
    store: S,
    reconciler: InventoryReconciler<C>,
}

impl<C, S> OrderLedger<C, S>
where
    C: CatalogStore + Clone,
    S: OrderStore,
{
    /// Creates a ledger over a catalog store and an order store.
    pub fn new(catalog: C, store: S) -> Self {
        let reconciler = InventoryReconciler::new(catalog.clone());
        Self {
            catalog,
            store,
            reconciler,
        }
    }

    /// Creates an order from a cart snapshot.
    ///
    /// Validates every line against the live catalog, freezes
    /// title/unit/price, reserves stock for all lines atomically (from the
    /// caller's view), and persists the order in `Pending`. Any failure
    /// aborts the whole order; no partial order or reservation survives.
    #[tracing::instrument(skip(self, draft), fields(buyer_id = %buyer.id, line_count = draft.lines.len()))]
    pub async fn create_order(&self, buyer: Principal, draft: OrderDraft) -> Result<Order> {
        metrics::counter!("orders_create_attempts_total").increment(1);
        let started = std::time::Instant::now();

        if draft.lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        draft.delivery_address.location.validate().map_err(OrderError::Catalog)?;

        // Validate and freeze each line against the live item. The frozen
        // price is the price at checkout, not whatever the client's cart
        // cached earlier.
        let mut lines = Vec::with_capacity(draft.lines.len());
        let mut reservations = Vec::with_capacity(draft.lines.len());
        for requested in &draft.lines {
            if requested.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    item_id: requested.item_id,
                });
            }

            let item = match self.catalog.get_by_id(requested.item_id).await {
                Ok(item) => item,
                Err(CatalogError::NotFound { item_id }) => {
                    return Err(OrderError::ItemUnavailable { item_id });
                }
                Err(other) => return Err(other.into()),
            };

            if !item.visible {
                return Err(OrderError::ItemUnavailable { item_id: item.id });
            }
            if requested.quantity < item.min_order {
                return Err(OrderError::BelowMinimumOrder {
                    item_id: item.id,
                    minimum: item.min_order,
                    requested: requested.quantity,
                });
            }
            if item.stock_quantity < requested.quantity {
                return Err(OrderError::InsufficientStock {
                    item_id: item.id,
                    requested: requested.quantity,
                    available: item.stock_quantity,
                });
            }

            lines.push(OrderLine::freeze(&item, requested.quantity));
            reservations.push(ReservationLine::new(item.id, requested.quantity));
        }

        // Authoritative stock check: the conditional decrement decides who
        // wins a concurrent race, not the read above.
        self.reconciler
            .reserve_for_order(&reservations)
            .await
            .map_err(translate_reservation_error)?;

        let subtotal: common::Money = lines.iter().map(OrderLine::line_total).sum();
        let delivery_charge = policy::delivery_fee(subtotal);
        let now = Utc::now();
        let order = Order {
            id: common::OrderId::new(),
            buyer_id: buyer.id,
            lines,
            total_amount: subtotal + delivery_charge,
            delivery_charge,
            delivery_address: draft.delivery_address,
            status: OrderStatus::Pending,
            payment: PaymentRecord::pending(draft.payment_provider),
            notes: draft.notes,
            cancellation_reason: None,
            estimated_delivery: Some(now + Duration::days(ESTIMATED_DELIVERY_DAYS)),
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.store.insert(order.clone()).await {
            // The reservation must not outlive a failed order write.
            if let Err(release_err) = self.reconciler.release_for_order(&reservations).await {
                tracing::error!(
                    order_id = %order.id,
                    error = %release_err,
                    "failed to release reservation after order persist failure"
                );
            }
            return Err(err);
        }

        metrics::counter!("orders_created_total").increment(1);
        metrics::histogram!("order_creation_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(order_id = %order.id, total = %order.total_amount, "order created");

        Ok(order)
    }

    /// Fetches an order, restricted to its buyer, a seller with a line in
    /// it, or an admin.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, order_id: common::OrderId, principal: Principal) -> Result<Order> {
        let order = self.store.get_by_id(order_id).await?;
        let allowed = principal.is_admin()
            || order.buyer_id == principal.id
            || order.has_seller(principal.id);
        if !allowed {
            return Err(OrderError::Forbidden {
                order_id,
                action: "view",
            });
        }
        Ok(order)
    }

    /// Lists the principal's own orders as a buyer, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_buyer(&self, principal: Principal) -> Result<Vec<Order>> {
        self.store.list_for_buyer(principal.id).await
    }

    /// Lists orders containing the principal's items as a seller,
    /// newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_seller(&self, principal: Principal) -> Result<Vec<Order>> {
        self.store.list_for_seller(principal.id).await
    }

    /// Applies a validated status transition.
    ///
    /// Transition legality is checked against the state machine first;
    /// the actor's role and relationship to the order second. A request
    /// for `Cancelled` routes through [`OrderLedger::cancel`] so stock
    /// restoration and idempotency apply.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: common::OrderId,
        next: OrderStatus,
        principal: Principal,
    ) -> Result<Order> {
        if next == OrderStatus::Cancelled {
            return self.cancel(order_id, None, principal).await;
        }

        let order = self.store.get_by_id(order_id).await?;

        if !order.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: next,
            });
        }
        authorize_transition(&order, next, principal)?;

        let previous = order.status;
        let mut updated = order;
        updated.status = next;
        updated.updated_at = Utc::now();
        if next == OrderStatus::Paid {
            // Manual capture by an admin; the normal path is the payment
            // collaborator callback.
            updated.payment.status = PaymentStatus::Completed;
            updated.payment.paid_at = Some(updated.updated_at);
        }

        self.store.update_if_status(updated.clone(), previous).await?;
        tracing::info!(%order_id, from = %previous, to = %next, "order status updated");
        Ok(updated)
    }

    /// Cancels an order from `Pending` or `Paid`, restoring stock for
    /// every line.
    ///
    /// Idempotent: cancelling an already-cancelled order is a no-op
    /// success and does not release stock a second time.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        order_id: common::OrderId,
        reason: Option<String>,
        principal: Principal,
    ) -> Result<Order> {
        let order = self.store.get_by_id(order_id).await?;

        let allowed = principal.is_admin() || order.buyer_id == principal.id;
        if !allowed {
            return Err(OrderError::Forbidden {
                order_id,
                action: "cancel",
            });
        }

        if order.status == OrderStatus::Cancelled {
            return Ok(order);
        }
        if !order.status.can_cancel() {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }

        let previous = order.status;
        let mut updated = order;
        updated.status = OrderStatus::Cancelled;
        updated.cancellation_reason = reason;
        updated.updated_at = Utc::now();

        match self.store.update_if_status(updated.clone(), previous).await {
            Ok(()) => {}
            Err(OrderError::ConcurrentModification { .. }) => {
                // Lost the race; if the winner was another cancel this is
                // the idempotent no-op case and stock is already released.
                let current = self.store.get_by_id(order_id).await?;
                if current.status == OrderStatus::Cancelled {
                    return Ok(current);
                }
                return Err(OrderError::ConcurrentModification { order_id });
            }
            Err(other) => return Err(other),
        }

        // The status flip claimed the cancellation, so the release below
        // runs exactly once per order.
        let reservations: Vec<ReservationLine> = updated
            .lines
            .iter()
            .map(|line| ReservationLine::new(line.item_id, line.quantity))
            .collect();
        self.reconciler.release_for_order(&reservations).await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_id, from = %previous, "order cancelled");
        Ok(updated)
    }

    /// Records a payment provider result delivered by the payment
    /// collaborator's callback.
    ///
    /// A completed capture of a `Pending` order transitions it to `Paid`.
    /// Re-delivery of a completed result is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn record_payment_result(
        &self,
        order_id: common::OrderId,
        provider_payment_id: String,
        status: PaymentStatus,
    ) -> Result<Order> {
        let order = self.store.get_by_id(order_id).await?;

        if order.payment.status == PaymentStatus::Completed {
            return Ok(order);
        }

        let previous = order.status;
        let mut updated = order;
        updated.payment.provider_payment_id = Some(provider_payment_id);
        updated.payment.status = status;
        updated.updated_at = Utc::now();

        if status == PaymentStatus::Completed {
            if previous == OrderStatus::Pending {
                updated.status = OrderStatus::Paid;
                updated.payment.paid_at = Some(updated.updated_at);
            } else {
                tracing::warn!(
                    %order_id, order_status = %previous,
                    "payment captured for an order no longer pending"
                );
            }
        }

        self.store.update_if_status(updated.clone(), previous).await?;
        tracing::info!(%order_id, payment_status = ?status, "payment result recorded");
        Ok(updated)
    }
}

/// Checks the actor's authority over a legal transition.
fn authorize_transition(order: &Order, next: OrderStatus, principal: Principal) -> Result<()> {
    let allowed = match next {
        // Manual capture is an admin-only override.
        OrderStatus::Paid => principal.is_admin(),
        // Fulfillment advances belong to the owning seller or an admin.
        OrderStatus::Preparing | OrderStatus::OutForDelivery | OrderStatus::Delivered => {
            principal.is_admin()
                || (principal.role == Role::Farmer && order.has_seller(principal.id))
        }
        // Cancellation is handled by `cancel`; nothing returns to Pending.
        OrderStatus::Cancelled | OrderStatus::Pending => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(OrderError::Forbidden {
            order_id: order.id,
            action: "advance status",
        })
    }
}

/// Attaches order-creation context to reservation failures.
fn translate_reservation_error(err: ReconcilerError) -> OrderError {
    match err {
        ReconcilerError::InsufficientStock {
            item_id,
            requested,
            available,
        } => OrderError::InsufficientStock {
            item_id,
            requested,
            available,
        },
        ReconcilerError::ItemUnavailable { item_id } => OrderError::ItemUnavailable { item_id },
        other => other.into(),
    }
}
