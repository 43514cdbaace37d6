//! Client-held cart aggregation.
//!
//! A cart is a non-authoritative working set of item references and
//! quantities. Its totals exist for display only: authoritative pricing
//! happens at order creation against live catalog prices, which may differ
//! from what the cart cached when a line was added.

use common::{ItemId, Money, policy};
use serde::{Deserialize, Serialize};

use catalog::{CatalogItem, Unit};

/// Display-only copy of item details captured when a line was added.
///
/// Never authoritative: checkout re-reads the live item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub title: String,
    pub unit: Unit,
    pub unit_price: Money,
}

impl LineSnapshot {
    /// Captures the display fields of a catalog item.
    pub fn of(item: &CatalogItem) -> Self {
        Self {
            title: item.title.clone(),
            unit: item.unit,
            unit_price: item.price_per_unit,
        }
    }
}

/// One cart entry: an item reference and a requested quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: ItemId,
    pub quantity: u32,
    pub snapshot: Option<LineSnapshot>,
}

impl CartLine {
    /// The price the cart currently knows for this line, if any.
    fn known_price(&self) -> Money {
        self.snapshot
            .as_ref()
            .map(|s| s.unit_price)
            .unwrap_or_default()
    }
}

/// Derived display totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub discount: Money,
    pub total: Money,
}

/// A client-owned working set of cart lines.
///
/// Quantities are advisory until checkout, where they are revalidated
/// against live stock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cart lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns true if the cart holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Adds an item, merging quantities when the item is already present.
    ///
    /// A merge keeps the existing snapshot; the caller can refresh it with
    /// [`Cart::refresh_snapshot`] after re-reading the item.
    pub fn add(&mut self, item: &CatalogItem, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.item_id == item.id) {
            line.quantity += quantity;
        } else {
            self.lines.push(CartLine {
                item_id: item.id,
                quantity,
                snapshot: Some(LineSnapshot::of(item)),
            });
        }
    }

    /// Sets a line's quantity. A quantity of zero removes the line.
    pub fn update_quantity(&mut self, item_id: ItemId, quantity: u32) {
        if quantity == 0 {
            self.remove(item_id);
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.item_id == item_id) {
            line.quantity = quantity;
        }
    }

    /// Removes a line.
    pub fn remove(&mut self, item_id: ItemId) {
        self.lines.retain(|l| l.item_id != item_id);
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Replaces a line's display snapshot with fresher item details.
    pub fn refresh_snapshot(&mut self, item: &CatalogItem) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.item_id == item.id) {
            line.snapshot = Some(LineSnapshot::of(item));
        }
    }

    /// Derives display totals from the currently-known prices.
    ///
    /// Delivery is a flat threshold fee and the discount is a fixed rate of
    /// the subtotal, floored to whole cents.
    pub fn summary(&self) -> CartSummary {
        let subtotal: Money = self
            .lines
            .iter()
            .map(|l| l.known_price().multiply(l.quantity))
            .sum();
        let delivery_fee = policy::delivery_fee(subtotal);
        let discount = subtotal.percent(policy::DISCOUNT_RATE_PERCENT);
        CartSummary {
            subtotal,
            delivery_fee,
            discount,
            total: subtotal + delivery_fee - discount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{Category, GeoPoint, NewItem};
    use chrono::Utc;
    use common::UserId;

    fn item(price_units: i64) -> CatalogItem {
        NewItem {
            title: "Basket of Peppers".to_string(),
            description: String::new(),
            category: Category::Vegetables,
            unit: Unit::Kg,
            price_per_unit: Money::from_units(price_units),
            stock_quantity: 50,
            location: GeoPoint::new(6.5, 3.4).unwrap(),
            organic: false,
            tags: vec![],
            min_order: 1,
            delivery_radius_km: 20.0,
            images: vec![],
        }
        .into_item(UserId::new(), Utc::now())
    }

    #[test]
    fn test_empty_cart_summary_is_all_zero() {
        let summary = Cart::new().summary();
        assert_eq!(summary.subtotal, Money::zero());
        assert_eq!(summary.delivery_fee, Money::zero());
        assert_eq!(summary.discount, Money::zero());
        assert_eq!(summary.total, Money::zero());
    }

    #[test]
    fn test_add_and_summary() {
        let mut cart = Cart::new();
        cart.add(&item(10), 3);

        let summary = cart.summary();
        assert_eq!(summary.subtotal, Money::from_units(30));
        assert_eq!(
            summary.delivery_fee,
            Money::from_cents(policy::DELIVERY_FEE_CENTS)
        );
        assert_eq!(
            summary.discount,
            Money::from_units(30).percent(policy::DISCOUNT_RATE_PERCENT)
        );
        assert_eq!(
            summary.total,
            summary.subtotal + summary.delivery_fee - summary.discount
        );
    }

    #[test]
    fn test_add_same_item_merges_quantity() {
        let mut cart = Cart::new();
        let produce = item(10);
        cart.add(&produce, 2);
        cart.add(&produce, 3);

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
    }

    #[test]
    fn test_add_zero_quantity_is_ignored() {
        let mut cart = Cart::new();
        cart.add(&item(10), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_zero_removes_line() {
        let mut cart = Cart::new();
        let produce = item(10);
        cart.add(&produce, 2);
        cart.update_quantity(produce.id, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity() {
        let mut cart = Cart::new();
        let produce = item(10);
        cart.add(&produce, 2);
        cart.update_quantity(produce.id, 7);
        assert_eq!(cart.lines()[0].quantity, 7);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        let a = item(10);
        let b = item(20);
        cart.add(&a, 1);
        cart.add(&b, 1);

        cart.remove(a.id);
        assert_eq!(cart.line_count(), 1);

        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_snapshot_is_display_only_and_refreshable() {
        let mut cart = Cart::new();
        let mut produce = item(10);
        cart.add(&produce, 2);
        assert_eq!(cart.summary().subtotal, Money::from_units(20));

        // Seller changes the price; cart totals are stale until refreshed.
        produce.price_per_unit = Money::from_units(15);
        assert_eq!(cart.summary().subtotal, Money::from_units(20));

        cart.refresh_snapshot(&produce);
        assert_eq!(cart.summary().subtotal, Money::from_units(30));
    }

    #[test]
    fn test_discount_floors_to_whole_cents() {
        let mut cart = Cart::new();
        // 19 cents * 1 → 5% is 0.95 cents, floored to 0.
        let cheap = {
            let mut i = item(0);
            i.price_per_unit = Money::from_cents(19);
            i
        };
        cart.add(&cheap, 1);
        assert_eq!(cart.summary().discount, Money::zero());
    }

    #[test]
    fn test_cart_serialization_roundtrip() {
        let mut cart = Cart::new();
        cart.add(&item(10), 2);
        let json = serde_json::to_string(&cart).unwrap();
        let deserialized: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.lines(), cart.lines());
    }
}
