//! Catalog item model and attribute validation.

use chrono::{DateTime, Utc};
use common::{ItemId, Money, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::geo::GeoPoint;

/// Produce category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Vegetables,
    Fruits,
    Grains,
    Dairy,
    Eggs,
    Honey,
    Herbs,
    Other,
}

impl Category {
    /// Returns the category name as used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Vegetables => "vegetables",
            Category::Fruits => "fruits",
            Category::Grains => "grains",
            Category::Dairy => "dairy",
            Category::Eggs => "eggs",
            Category::Honey => "honey",
            Category::Herbs => "herbs",
            Category::Other => "other",
        }
    }

    /// Parses a category from its wire name.
    pub fn parse(s: &str) -> Option<Category> {
        match s {
            "vegetables" => Some(Category::Vegetables),
            "fruits" => Some(Category::Fruits),
            "grains" => Some(Category::Grains),
            "dairy" => Some(Category::Dairy),
            "eggs" => Some(Category::Eggs),
            "honey" => Some(Category::Honey),
            "herbs" => Some(Category::Herbs),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unit of sale for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Sold by weight (kilogram).
    Kg,
    /// Sold as a tied bunch.
    Bunch,
    /// Sold per piece.
    Piece,
    /// Sold by the dozen.
    Dozen,
    /// Sold by volume (litre).
    Litre,
}

impl Unit {
    /// Returns the unit name as used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Kg => "kg",
            Unit::Bunch => "bunch",
            Unit::Piece => "piece",
            Unit::Dozen => "dozen",
            Unit::Litre => "litre",
        }
    }

    /// Parses a unit from its wire name.
    pub fn parse(s: &str) -> Option<Unit> {
        match s {
            "kg" => Some(Unit::Kg),
            "bunch" => Some(Unit::Bunch),
            "piece" => Some(Unit::Piece),
            "dozen" => Some(Unit::Dozen),
            "litre" => Some(Unit::Litre),
            _ => None,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate review rating.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rating {
    /// Mean of all recorded ratings.
    pub average: f64,
    /// Number of ratings recorded.
    pub count: u32,
}

/// A seller-owned sellable listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub seller_id: UserId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub unit: Unit,
    /// Price per unit; frozen copies of this value live on order lines.
    pub price_per_unit: Money,
    /// Current sellable stock. Mutated only through `adjust_stock`.
    pub stock_quantity: u32,
    pub location: GeoPoint,
    /// Hidden items are excluded from discovery but stay resolvable by id,
    /// preserving historical order integrity instead of hard deletion.
    pub visible: bool,
    pub organic: bool,
    pub tags: Vec<String>,
    /// Minimum quantity a single order line must request.
    pub min_order: u32,
    /// How far the seller will deliver, in kilometres.
    pub delivery_radius_km: f64,
    pub rating: Rating,
    /// Resolved image URLs supplied by the media collaborator.
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Returns true if the item shows up in discovery queries.
    pub fn is_discoverable(&self) -> bool {
        self.visible && self.stock_quantity > 0
    }
}

/// Attributes for creating an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub unit: Unit,
    pub price_per_unit: Money,
    pub stock_quantity: u32,
    pub location: GeoPoint,
    #[serde(default)]
    pub organic: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_min_order")]
    pub min_order: u32,
    pub delivery_radius_km: f64,
    #[serde(default)]
    pub images: Vec<String>,
}

fn default_min_order() -> u32 {
    1
}

impl NewItem {
    /// Validates field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CatalogError::InvalidField {
                field: "title",
                message: "must not be empty".to_string(),
            });
        }
        if self.price_per_unit.is_negative() {
            return Err(CatalogError::InvalidPrice {
                cents: self.price_per_unit.cents(),
            });
        }
        self.location.validate()?;
        if self.min_order == 0 {
            return Err(CatalogError::InvalidField {
                field: "min_order",
                message: "must be at least 1".to_string(),
            });
        }
        validate_radius(self.delivery_radius_km)?;
        Ok(())
    }

    /// Builds a catalog item from validated attributes.
    pub fn into_item(self, seller_id: UserId, now: DateTime<Utc>) -> CatalogItem {
        CatalogItem {
            id: ItemId::new(),
            seller_id,
            title: self.title,
            description: self.description,
            category: self.category,
            unit: self.unit,
            price_per_unit: self.price_per_unit,
            stock_quantity: self.stock_quantity,
            location: self.location,
            visible: true,
            organic: self.organic,
            tags: self.tags,
            min_order: self.min_order,
            delivery_radius_km: self.delivery_radius_km,
            rating: Rating::default(),
            images: self.images,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of an item's attributes.
///
/// Stock is deliberately absent: all stock changes, including seller
/// restocks, go through the store's atomic `adjust_stock` path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub unit: Option<Unit>,
    pub price_per_unit: Option<Money>,
    pub location: Option<GeoPoint>,
    pub visible: Option<bool>,
    pub organic: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub min_order: Option<u32>,
    pub delivery_radius_km: Option<f64>,
    pub images: Option<Vec<String>>,
}

impl ItemUpdate {
    /// Validates the fields that are present.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref title) = self.title
            && title.trim().is_empty()
        {
            return Err(CatalogError::InvalidField {
                field: "title",
                message: "must not be empty".to_string(),
            });
        }
        if let Some(price) = self.price_per_unit
            && price.is_negative()
        {
            return Err(CatalogError::InvalidPrice {
                cents: price.cents(),
            });
        }
        if let Some(location) = self.location {
            location.validate()?;
        }
        if let Some(0) = self.min_order {
            return Err(CatalogError::InvalidField {
                field: "min_order",
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(radius) = self.delivery_radius_km {
            validate_radius(radius)?;
        }
        Ok(())
    }

    /// Applies the present fields to an item and stamps `updated_at`.
    pub fn apply_to(self, item: &mut CatalogItem, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            item.title = title;
        }
        if let Some(description) = self.description {
            item.description = description;
        }
        if let Some(category) = self.category {
            item.category = category;
        }
        if let Some(unit) = self.unit {
            item.unit = unit;
        }
        if let Some(price) = self.price_per_unit {
            item.price_per_unit = price;
        }
        if let Some(location) = self.location {
            item.location = location;
        }
        if let Some(visible) = self.visible {
            item.visible = visible;
        }
        if let Some(organic) = self.organic {
            item.organic = organic;
        }
        if let Some(tags) = self.tags {
            item.tags = tags;
        }
        if let Some(min_order) = self.min_order {
            item.min_order = min_order;
        }
        if let Some(radius) = self.delivery_radius_km {
            item.delivery_radius_km = radius;
        }
        if let Some(images) = self.images {
            item.images = images;
        }
        item.updated_at = now;
    }
}

fn validate_radius(radius_km: f64) -> Result<()> {
    if radius_km.is_finite() && radius_km >= 0.0 {
        Ok(())
    } else {
        Err(CatalogError::InvalidField {
            field: "delivery_radius_km",
            message: format!("{radius_km} is not a non-negative distance"),
        })
    }
}
