use async_trait::async_trait;
use common::{Money, OrderId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{OrderError, Result};
use crate::order::{DeliveryAddress, Order, OrderLine, PaymentRecord};
use crate::status::OrderStatus;
use crate::store::OrderStore;

/// PostgreSQL-backed order store.
///
/// Line snapshots, the delivery address, and the payment record are stored
/// as JSONB documents; the status lives in its own column so conditional
/// updates can key on it.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status_raw: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_raw).ok_or_else(|| {
            OrderError::Serialization(serde_json::Error::io(std::io::Error::other(format!(
                "unknown order status {status_raw:?}"
            ))))
        })?;

        let lines: Vec<OrderLine> = serde_json::from_value(row.try_get("lines")?)?;
        let delivery_address: DeliveryAddress =
            serde_json::from_value(row.try_get("delivery_address")?)?;
        let payment: PaymentRecord = serde_json::from_value(row.try_get("payment")?)?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            buyer_id: UserId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
            lines,
            total_amount: Money::from_cents(row.try_get("total_cents")?),
            delivery_charge: Money::from_cents(row.try_get("delivery_charge_cents")?),
            delivery_address,
            status,
            payment,
            notes: row.try_get("notes")?,
            cancellation_reason: row.try_get("cancellation_reason")?,
            estimated_delivery: row.try_get("estimated_delivery")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const ORDER_COLUMNS: &str = "id, buyer_id, lines, total_cents, delivery_charge_cents, \
     delivery_address, status, payment, notes, cancellation_reason, estimated_delivery, \
     created_at, updated_at";

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert(&self, order: Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders
                (id, buyer_id, lines, total_cents, delivery_charge_cents, delivery_address,
                 status, payment, notes, cancellation_reason, estimated_delivery,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.buyer_id.as_uuid())
        .bind(serde_json::to_value(&order.lines)?)
        .bind(order.total_amount.cents())
        .bind(order.delivery_charge.cents())
        .bind(serde_json::to_value(&order.delivery_address)?)
        .bind(order.status.as_str())
        .bind(serde_json::to_value(&order.payment)?)
        .bind(&order.notes)
        .bind(&order.cancellation_reason)
        .bind(order.estimated_delivery)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Order> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(OrderError::NotFound { order_id: id })?;

        Self::row_to_order(row)
    }

    async fn update_if_status(&self, order: Order, expected: OrderStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET lines = $3, total_cents = $4, delivery_charge_cents = $5,
                delivery_address = $6, status = $7, payment = $8, notes = $9,
                cancellation_reason = $10, estimated_delivery = $11, updated_at = $12
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(expected.as_str())
        .bind(serde_json::to_value(&order.lines)?)
        .bind(order.total_amount.cents())
        .bind(order.delivery_charge.cents())
        .bind(serde_json::to_value(&order.delivery_address)?)
        .bind(order.status.as_str())
        .bind(serde_json::to_value(&order.payment)?)
        .bind(&order.notes)
        .bind(&order.cancellation_reason)
        .bind(order.estimated_delivery)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM orders WHERE id = $1")
                .bind(order.id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

            return Err(match exists {
                Some(_) => OrderError::ConcurrentModification { order_id: order.id },
                None => OrderError::NotFound { order_id: order.id },
            });
        }
        Ok(())
    }

    async fn list_for_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(buyer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE lines @> $1 ORDER BY created_at DESC"
        ))
        .bind(serde_json::json!([{ "seller_id": seller_id.as_uuid() }]))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}
