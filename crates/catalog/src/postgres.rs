use async_trait::async_trait;
use chrono::Utc;
use common::{ItemId, Money, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{CatalogError, Result};
use crate::geo::{GeoPoint, haversine_km};
use crate::item::{CatalogItem, Category, ItemUpdate, NewItem, Rating, Unit};
use crate::query::{NearbyItem, NearbyQuery, sort_by_distance};
use crate::store::CatalogStore;

/// Approximate kilometres per degree of latitude, for bounding boxes.
const KM_PER_DEGREE_LAT: f64 = 111.0;

/// PostgreSQL-backed catalog store.
///
/// Stock adjustments run as a single conditional `UPDATE`, so the database
/// itself enforces the no-negative-stock invariant under concurrency.
/// Proximity queries prefilter on an indexed latitude/longitude bounding
/// box and apply the exact haversine distance in process.
#[derive(Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    /// Creates a new PostgreSQL catalog store.
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

    fn row_to_item(row: PgRow) -> Result<CatalogItem> {
        let category_raw: String = row.try_get("category")?;
        let category =
            Category::parse(&category_raw).ok_or_else(|| CatalogError::InvalidField {
                field: "category",
                message: format!("unknown value {category_raw:?}"),
            })?;
        let unit_raw: String = row.try_get("unit")?;
        let unit = Unit::parse(&unit_raw).ok_or_else(|| CatalogError::InvalidField {
            field: "unit",
            message: format!("unknown value {unit_raw:?}"),
        })?;

        let tags: serde_json::Value = row.try_get("tags")?;
        let images: serde_json::Value = row.try_get("images")?;

        Ok(CatalogItem {
            id: ItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            seller_id: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            category,
            unit,
            price_per_unit: Money::from_cents(row.try_get("price_cents")?),
            stock_quantity: row.try_get::<i64, _>("stock_quantity")? as u32,
            location: GeoPoint {
                latitude: row.try_get("latitude")?,
                longitude: row.try_get("longitude")?,
            },
            visible: row.try_get("visible")?,
            organic: row.try_get("organic")?,
            tags: serde_json::from_value(tags).unwrap_or_default(),
            min_order: row.try_get::<i64, _>("min_order")? as u32,
            delivery_radius_km: row.try_get("delivery_radius_km")?,
            rating: Rating {
                average: row.try_get("rating_average")?,
                count: row.try_get::<i64, _>("rating_count")? as u32,
            },
            images: serde_json::from_value(images).unwrap_or_default(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const ITEM_COLUMNS: &str = "id, seller_id, title, description, category, unit, price_cents, \
     stock_quantity, latitude, longitude, visible, organic, tags, min_order, \
     delivery_radius_km, rating_average, rating_count, images, created_at, updated_at";

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn create(&self, seller_id: UserId, attrs: NewItem) -> Result<CatalogItem> {
        attrs.validate()?;
        let item = attrs.into_item(seller_id, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO catalog_items
                (id, seller_id, title, description, category, unit, price_cents,
                 stock_quantity, latitude, longitude, visible, organic, tags, min_order,
                 delivery_radius_km, rating_average, rating_count, images, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.seller_id.as_uuid())
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.category.as_str())
        .bind(item.unit.as_str())
        .bind(item.price_per_unit.cents())
        .bind(item.stock_quantity as i64)
        .bind(item.location.latitude)
        .bind(item.location.longitude)
        .bind(item.visible)
        .bind(item.organic)
        .bind(serde_json::to_value(&item.tags).unwrap_or_default())
        .bind(item.min_order as i64)
        .bind(item.delivery_radius_km)
        .bind(item.rating.average)
        .bind(item.rating.count as i64)
        .bind(serde_json::to_value(&item.images).unwrap_or_default())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(item)
    }

    async fn update(
        &self,
        seller_id: UserId,
        id: ItemId,
        attrs: ItemUpdate,
    ) -> Result<CatalogItem> {
        attrs.validate()?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CatalogError::NotFound { item_id: id })?;

        let mut item = Self::row_to_item(row)?;
        if item.seller_id != seller_id {
            return Err(CatalogError::Forbidden {
                item_id: id,
                seller_id,
            });
        }

        attrs.apply_to(&mut item, Utc::now());

        sqlx::query(
            r#"
            UPDATE catalog_items
            SET title = $2, description = $3, category = $4, unit = $5, price_cents = $6,
                latitude = $7, longitude = $8, visible = $9, organic = $10, tags = $11,
                min_order = $12, delivery_radius_km = $13, images = $14, updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.category.as_str())
        .bind(item.unit.as_str())
        .bind(item.price_per_unit.cents())
        .bind(item.location.latitude)
        .bind(item.location.longitude)
        .bind(item.visible)
        .bind(item.organic)
        .bind(serde_json::to_value(&item.tags).unwrap_or_default())
        .bind(item.min_order as i64)
        .bind(item.delivery_radius_km)
        .bind(serde_json::to_value(&item.images).unwrap_or_default())
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(item)
    }

    async fn get_by_id(&self, id: ItemId) -> Result<CatalogItem> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CatalogError::NotFound { item_id: id })?;

        Self::row_to_item(row)
    }

    async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<CatalogItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE seller_id = $1 ORDER BY created_at DESC"
        ))
        .bind(seller_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn list_nearby(&self, query: NearbyQuery) -> Result<Vec<NearbyItem>> {
        query.origin.validate()?;

        let d_lat = query.radius_km / KM_PER_DEGREE_LAT;
        let lat_cos = query.origin.latitude.to_radians().cos().max(0.01);
        let d_lng = query.radius_km / (KM_PER_DEGREE_LAT * lat_cos);

        let mut sql = format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items \
             WHERE visible AND stock_quantity > 0 \
             AND latitude BETWEEN $1 AND $2 AND longitude BETWEEN $3 AND $4"
        );
        let mut param_count = 4;

        if query.category.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND category = ${param_count}"));
        }
        if query.organic.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND organic = ${param_count}"));
        }
        if query.tag.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND tags @> ${param_count}"));
        }

        let mut q = sqlx::query(&sql)
            .bind(query.origin.latitude - d_lat)
            .bind(query.origin.latitude + d_lat)
            .bind(query.origin.longitude - d_lng)
            .bind(query.origin.longitude + d_lng);

        if let Some(category) = query.category {
            q = q.bind(category.as_str());
        }
        if let Some(organic) = query.organic {
            q = q.bind(organic);
        }
        if let Some(ref tag) = query.tag {
            q = q.bind(serde_json::json!([tag]));
        }

        let rows = q.fetch_all(&self.pool).await?;

        let mut results = Vec::new();
        for row in rows {
            let item = Self::row_to_item(row)?;
            let distance_km = haversine_km(query.origin, item.location);
            if distance_km <= query.radius_km {
                results.push(NearbyItem { item, distance_km });
            }
        }
        sort_by_distance(&mut results);
        Ok(results)
    }

    async fn adjust_stock(&self, id: ItemId, delta: i64) -> Result<u32> {
        // Single conditional UPDATE: the predicate and the write are one
        // atomic statement, so concurrent adjustments serialize in the
        // database without a read-then-write window.
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE catalog_items
            SET stock_quantity = stock_quantity + $2, updated_at = $3
            WHERE id = $1 AND stock_quantity + $2 >= 0
            RETURNING stock_quantity
            "#,
        )
        .bind(id.as_uuid())
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(quantity) => Ok(quantity as u32),
            None => {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT stock_quantity FROM catalog_items WHERE id = $1")
                        .bind(id.as_uuid())
                        .fetch_optional(&self.pool)
                        .await?;

                match available {
                    Some(available) => Err(CatalogError::InsufficientStock {
                        item_id: id,
                        requested: delta.unsigned_abs() as u32,
                        available: available as u32,
                    }),
                    None => Err(CatalogError::NotFound { item_id: id }),
                }
            }
        }
    }
}
