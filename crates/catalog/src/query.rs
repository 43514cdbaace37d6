//! Proximity query types.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::item::{CatalogItem, Category};

/// A discovery query: visible, in-stock items within a radius of an origin.
#[derive(Debug, Clone)]
pub struct NearbyQuery {
    pub origin: GeoPoint,
    pub radius_km: f64,
    pub category: Option<Category>,
    pub organic: Option<bool>,
    pub tag: Option<String>,
}

impl NearbyQuery {
    /// Creates a query with no filters.
    pub fn new(origin: GeoPoint, radius_km: f64) -> Self {
        Self {
            origin,
            radius_km,
            category: None,
            organic: None,
            tag: None,
        }
    }

    /// Restricts results to a category.
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Restricts results by organic flag.
    pub fn organic(mut self, organic: bool) -> Self {
        self.organic = Some(organic);
        self
    }

    /// Restricts results to items carrying a tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Returns true if the item passes the non-spatial filters.
    pub fn matches(&self, item: &CatalogItem) -> bool {
        if !item.is_discoverable() {
            return false;
        }
        if let Some(category) = self.category
            && item.category != category
        {
            return false;
        }
        if let Some(organic) = self.organic
            && item.organic != organic
        {
            return false;
        }
        if let Some(ref tag) = self.tag
            && !item.tags.iter().any(|t| t == tag)
        {
            return false;
        }
        true
    }
}

/// A discovery result: an item and its distance from the query origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyItem {
    pub item: CatalogItem,
    pub distance_km: f64,
}

/// Orders results by ascending distance.
pub(crate) fn sort_by_distance(results: &mut [NearbyItem]) {
    results.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{NewItem, Unit};
    use chrono::Utc;
    use common::{Money, UserId};

    fn item(category: Category, organic: bool, tags: &[&str]) -> CatalogItem {
        NewItem {
            title: "Produce".to_string(),
            description: String::new(),
            category,
            unit: Unit::Kg,
            price_per_unit: Money::from_units(10),
            stock_quantity: 3,
            location: GeoPoint::new(0.0, 0.0).unwrap(),
            organic,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            min_order: 1,
            delivery_radius_km: 10.0,
            images: vec![],
        }
        .into_item(UserId::new(), Utc::now())
    }

    #[test]
    fn test_unfiltered_query_matches_discoverable() {
        let query = NearbyQuery::new(GeoPoint::new(0.0, 0.0).unwrap(), 5.0);
        assert!(query.matches(&item(Category::Fruits, false, &[])));
    }

    #[test]
    fn test_hidden_item_never_matches() {
        let query = NearbyQuery::new(GeoPoint::new(0.0, 0.0).unwrap(), 5.0);
        let mut hidden = item(Category::Fruits, false, &[]);
        hidden.visible = false;
        assert!(!query.matches(&hidden));
    }

    #[test]
    fn test_category_filter() {
        let query =
            NearbyQuery::new(GeoPoint::new(0.0, 0.0).unwrap(), 5.0).category(Category::Dairy);
        assert!(!query.matches(&item(Category::Fruits, false, &[])));
        assert!(query.matches(&item(Category::Dairy, false, &[])));
    }

    #[test]
    fn test_organic_filter() {
        let query = NearbyQuery::new(GeoPoint::new(0.0, 0.0).unwrap(), 5.0).organic(true);
        assert!(!query.matches(&item(Category::Fruits, false, &[])));
        assert!(query.matches(&item(Category::Fruits, true, &[])));
    }

    #[test]
    fn test_tag_filter() {
        let query = NearbyQuery::new(GeoPoint::new(0.0, 0.0).unwrap(), 5.0).tag("heirloom");
        assert!(!query.matches(&item(Category::Fruits, false, &["vine"])));
        assert!(query.matches(&item(Category::Fruits, false, &["vine", "heirloom"])));
    }

    #[test]
    fn test_sort_by_distance() {
        let a = NearbyItem {
            item: item(Category::Fruits, false, &[]),
            distance_km: 4.2,
        };
        let b = NearbyItem {
            item: item(Category::Fruits, false, &[]),
            distance_km: 0.7,
        };
        let mut results = vec![a, b];
        sort_by_distance(&mut results);
        assert!(results[0].distance_km < results[1].distance_km);
    }
}
