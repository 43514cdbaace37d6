//! Order model: immutable, price-frozen purchase records.

use chrono::{DateTime, Utc};
use common::{ItemId, Money, OrderId, UserId};
use serde::{Deserialize, Serialize};

use catalog::{CatalogItem, GeoPoint, Unit};

use crate::status::OrderStatus;

/// One purchased line within an order.
///
/// Title, unit, and unit price are frozen copies taken from the live item
/// at creation time and are never re-derived afterwards, so the historical
/// record survives later catalog edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub seller_id: UserId,
    pub title: String,
    pub quantity: u32,
    pub unit: Unit,
    pub unit_price: Money,
}

impl OrderLine {
    /// Freezes a line from a live catalog item.
    pub fn freeze(item: &CatalogItem, quantity: u32) -> Self {
        Self {
            item_id: item.id,
            seller_id: item.seller_id,
            title: item.title.clone(),
            quantity,
            unit: item.unit,
            unit_price: item.price_per_unit,
        }
    }

    /// Returns the line total (unit price × quantity).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Structured delivery destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub line1: String,
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub location: GeoPoint,
}

/// Payment provider chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    CashOnDelivery,
    Card,
    MobileMoney,
}

impl PaymentProvider {
    /// Returns the provider name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::CashOnDelivery => "cash_on_delivery",
            PaymentProvider::Card => "card",
            PaymentProvider::MobileMoney => "mobile_money",
        }
    }

    /// Parses a provider from its wire name.
    pub fn parse(s: &str) -> Option<PaymentProvider> {
        match s {
            "cash_on_delivery" => Some(PaymentProvider::CashOnDelivery),
            "card" => Some(PaymentProvider::Card),
            "mobile_money" => Some(PaymentProvider::MobileMoney),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a payment capture attempt as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// Payment sub-record on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub provider: PaymentProvider,
    pub provider_payment_id: Option<String>,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    /// Creates the initial record for a freshly placed order.
    pub fn pending(provider: PaymentProvider) -> Self {
        Self {
            provider,
            provider_payment_id: None,
            status: PaymentStatus::Pending,
            paid_at: None,
        }
    }
}

/// A durable purchase record built from a validated cart snapshot.
///
/// Never deleted; cancellation is a terminal status, not a removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub lines: Vec<OrderLine>,
    /// Always equals the sum of frozen line totals plus the delivery
    /// charge; computed once at creation.
    pub total_amount: Money,
    pub delivery_charge: Money,
    pub delivery_address: DeliveryAddress,
    pub status: OrderStatus,
    pub payment: PaymentRecord,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Sum of the frozen line totals, excluding the delivery charge.
    pub fn lines_subtotal(&self) -> Money {
        self.lines.iter().map(OrderLine::line_total).sum()
    }

    /// Returns true if the given seller owns at least one line.
    pub fn has_seller(&self, seller_id: UserId) -> bool {
        self.lines.iter().any(|line| line.seller_id == seller_id)
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A requested order line as submitted by the client: an item reference
/// and a quantity, nothing more. Prices are never taken from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub item_id: ItemId,
    pub quantity: u32,
}

/// Checkout submission: the cart snapshot the ledger turns into an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub lines: Vec<RequestedLine>,
    pub delivery_address: DeliveryAddress,
    pub payment_provider: PaymentProvider,
    #[serde(default)]
    pub notes: Option<String>,
}
