//! Order checkout, lookup, and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use catalog::{CatalogStore, GeoPoint};
use common::OrderId;
use orders::{
    DeliveryAddress, Order, OrderDraft, OrderStatus, OrderStore, PaymentProvider, PaymentStatus,
    RequestedLine,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthPrincipal;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub lines: Vec<OrderLineRequest>,
    pub delivery_address: AddressRequest,
    pub payment_provider: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct OrderLineRequest {
    pub item_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct AddressRequest {
    pub line1: String,
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
pub struct ListParams {
    /// `buyer` (default) or `seller`.
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct PaymentResultRequest {
    pub provider_payment_id: String,
    /// `completed` or `failed`.
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub buyer_id: String,
    pub status: String,
    pub lines: Vec<OrderLineResponse>,
    pub total_cents: i64,
    pub delivery_charge_cents: i64,
    pub delivery_address: AddressResponse,
    pub payment: PaymentResponse,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub estimated_delivery: Option<String>,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub item_id: String,
    pub seller_id: String,
    pub title: String,
    pub quantity: u32,
    pub unit: String,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct AddressResponse {
    pub line1: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub provider: String,
    pub provider_payment_id: Option<String>,
    pub status: String,
    pub paid_at: Option<String>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            buyer_id: order.buyer_id.to_string(),
            status: order.status.as_str().to_string(),
            lines: order
                .lines
                .iter()
                .map(|line| OrderLineResponse {
                    item_id: line.item_id.to_string(),
                    seller_id: line.seller_id.to_string(),
                    title: line.title.clone(),
                    quantity: line.quantity,
                    unit: line.unit.as_str().to_string(),
                    unit_price_cents: line.unit_price.cents(),
                    line_total_cents: line.line_total().cents(),
                })
                .collect(),
            total_cents: order.total_amount.cents(),
            delivery_charge_cents: order.delivery_charge.cents(),
            delivery_address: AddressResponse {
                line1: order.delivery_address.line1,
                city: order.delivery_address.city,
                postal_code: order.delivery_address.postal_code,
                latitude: order.delivery_address.location.latitude,
                longitude: order.delivery_address.location.longitude,
            },
            payment: PaymentResponse {
                provider: order.payment.provider.as_str().to_string(),
                provider_payment_id: order.payment.provider_payment_id,
                status: match order.payment.status {
                    PaymentStatus::Pending => "pending",
                    PaymentStatus::Completed => "completed",
                    PaymentStatus::Failed => "failed",
                }
                .to_string(),
                paid_at: order.payment.paid_at.map(|t| t.to_rfc3339()),
            },
            notes: order.notes,
            cancellation_reason: order.cancellation_reason,
            estimated_delivery: order.estimated_delivery.map(|t| t.to_rfc3339()),
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — convert a cart snapshot into a pending order.
#[tracing::instrument(skip(state, req))]
pub async fn create<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError>
where
    C: CatalogStore + Clone + 'static,
    S: OrderStore + 'static,
{
    let payment_provider = PaymentProvider::parse(&req.payment_provider).ok_or_else(|| {
        ApiError::BadRequest(format!("unknown payment provider: {}", req.payment_provider))
    })?;

    let lines = req
        .lines
        .iter()
        .map(|line| {
            Ok(RequestedLine {
                item_id: parse_uuid(&line.item_id, "item id")?.into(),
                quantity: line.quantity,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let draft = OrderDraft {
        lines,
        delivery_address: DeliveryAddress {
            line1: req.delivery_address.line1,
            city: req.delivery_address.city,
            postal_code: req.delivery_address.postal_code,
            location: GeoPoint {
                latitude: req.delivery_address.latitude,
                longitude: req.delivery_address.longitude,
            },
        },
        payment_provider,
        notes: req.notes,
    };

    let order = state.ledger.create_order(principal, draft).await?;
    Ok((axum::http::StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/:id — fetch one order (buyer, seller with a line, or admin).
#[tracing::instrument(skip(state))]
pub async fn get<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    C: CatalogStore + Clone + 'static,
    S: OrderStore + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state.ledger.get(order_id, principal).await?;
    Ok(Json(order.into()))
}

/// GET /orders?role=buyer|seller — list the principal's orders.
#[tracing::instrument(skip(state, params))]
pub async fn list<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    C: CatalogStore + Clone + 'static,
    S: OrderStore + 'static,
{
    let orders = match params.role.as_deref() {
        None | Some("buyer") => state.ledger.list_for_buyer(principal).await?,
        Some("seller") => state.ledger.list_for_seller(principal).await?,
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "unknown role filter: {other} (expected buyer or seller)"
            )));
        }
    };

    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// PATCH /orders/:id/status — validated state-machine transition.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    C: CatalogStore + Clone + 'static,
    S: OrderStore + 'static,
{
    let order_id = parse_order_id(&id)?;
    let next = OrderStatus::parse(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown status: {}", req.status)))?;

    let order = state.ledger.update_status(order_id, next, principal).await?;
    Ok(Json(order.into()))
}

/// POST /orders/:id/cancel — cancel from pending/paid, restoring stock.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    C: CatalogStore + Clone + 'static,
    S: OrderStore + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state.ledger.cancel(order_id, req.reason, principal).await?;
    Ok(Json(order.into()))
}

/// POST /orders/:id/payment — payment collaborator callback recording a
/// provider result.
#[tracing::instrument(skip(state, req))]
pub async fn record_payment<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<String>,
    Json(req): Json<PaymentResultRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    C: CatalogStore + Clone + 'static,
    S: OrderStore + 'static,
{
    let order_id = parse_order_id(&id)?;
    let status = match req.status.as_str() {
        "completed" => PaymentStatus::Completed,
        "failed" => PaymentStatus::Failed,
        other => {
            return Err(ApiError::BadRequest(format!(
                "unknown payment status: {other} (expected completed or failed)"
            )));
        }
    };

    let order = state
        .ledger
        .record_payment_result(order_id, req.provider_payment_id, status)
        .await?;
    Ok(Json(order.into()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    Ok(OrderId::from_uuid(parse_uuid(id, "order id")?))
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| ApiError::BadRequest(format!("invalid {what}: {e}")))
}
