//! Geographic primitives and the spatial grid index.

use std::collections::{HashMap, HashSet};

use common::ItemId;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate kilometres per degree of latitude.
const KM_PER_DEGREE_LAT: f64 = 111.0;

/// Grid cell edge length in degrees (~28 km of latitude per cell).
const CELL_SIZE_DEG: f64 = 0.25;

/// A latitude/longitude coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point, validating coordinate bounds.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let point = Self {
            latitude,
            longitude,
        };
        point.validate()?;
        Ok(point)
    }

    /// Checks latitude ∈ [-90, 90] and longitude ∈ [-180, 180].
    ///
    /// Points can also arrive through deserialization, so stores re-validate
    /// before persisting.
    pub fn validate(&self) -> Result<()> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lng_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if lat_ok && lng_ok {
            Ok(())
        } else {
            Err(CatalogError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// Great-circle distance between two points in kilometres (haversine).
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Grid cell coordinate.
type Cell = (i32, i32);

fn cell_of(point: GeoPoint) -> Cell {
    (
        (point.latitude / CELL_SIZE_DEG).floor() as i32,
        (point.longitude / CELL_SIZE_DEG).floor() as i32,
    )
}

/// Degree-grid spatial index over item locations.
///
/// Buckets items into fixed-size latitude/longitude cells so a proximity
/// query scans only the cells a radius can reach instead of the whole
/// catalog. Candidate cells still require an exact haversine check.
#[derive(Debug, Default, Clone)]
pub struct GeoGrid {
    cells: HashMap<Cell, HashSet<ItemId>>,
    positions: HashMap<ItemId, Cell>,
}

impl GeoGrid {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes an item at a location, moving it if already indexed.
    pub fn insert(&mut self, id: ItemId, location: GeoPoint) {
        let cell = cell_of(location);
        if let Some(previous) = self.positions.insert(id, cell) {
            if previous == cell {
                return;
            }
            if let Some(members) = self.cells.get_mut(&previous) {
                members.remove(&id);
                if members.is_empty() {
                    self.cells.remove(&previous);
                }
            }
        }
        self.cells.entry(cell).or_default().insert(id);
    }

    /// Removes an item from the index.
    pub fn remove(&mut self, id: ItemId) {
        if let Some(cell) = self.positions.remove(&id)
            && let Some(members) = self.cells.get_mut(&cell)
        {
            members.remove(&id);
            if members.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    /// Returns the ids in every cell a radius around the origin can touch.
    ///
    /// A superset of the true result set; callers filter by exact distance.
    pub fn candidates(&self, origin: GeoPoint, radius_km: f64) -> Vec<ItemId> {
        let d_lat = radius_km / KM_PER_DEGREE_LAT;
        // Longitude degrees shrink with latitude; clamp the divisor so a
        // query near the poles stays finite.
        let lat_cos = origin.latitude.to_radians().cos().max(0.01);
        let d_lng = radius_km / (KM_PER_DEGREE_LAT * lat_cos);

        let (min_lat, max_lat) = (
            ((origin.latitude - d_lat) / CELL_SIZE_DEG).floor() as i32,
            ((origin.latitude + d_lat) / CELL_SIZE_DEG).floor() as i32,
        );
        let (min_lng, max_lng) = (
            ((origin.longitude - d_lng) / CELL_SIZE_DEG).floor() as i32,
            ((origin.longitude + d_lng) / CELL_SIZE_DEG).floor() as i32,
        );

        let mut out = Vec::new();
        for lat in min_lat..=max_lat {
            for lng in min_lng..=max_lng {
                if let Some(members) = self.cells.get(&(lat, lng)) {
                    out.extend(members.iter().copied());
                }
            }
        }
        out
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
