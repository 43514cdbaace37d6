//! Catalog item discovery and seller management endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use catalog::{
    CatalogItem, CatalogStore, Category, GeoPoint, ItemUpdate, NearbyQuery, NewItem, Unit,
};
use common::{ItemId, Money, Role};
use orders::OrderStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthPrincipal;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct NearbyParams {
    pub lat: f64,
    pub lng: f64,
    #[serde(alias = "radius")]
    pub radius_km: f64,
    pub category: Option<String>,
    pub organic: Option<bool>,
    pub tag: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub unit: String,
    pub price_cents: i64,
    pub stock_quantity: u32,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub organic: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub min_order: Option<u32>,
    pub delivery_radius_km: f64,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Deserialize, Default)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub price_cents: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub visible: Option<bool>,
    pub organic: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub min_order: Option<u32>,
    pub delivery_radius_km: Option<f64>,
    pub images: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct StockAdjustRequest {
    pub delta: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub seller_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub unit: String,
    pub price_cents: i64,
    pub stock_quantity: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub visible: bool,
    pub organic: bool,
    pub tags: Vec<String>,
    pub min_order: u32,
    pub delivery_radius_km: f64,
    pub rating_average: f64,
    pub rating_count: u32,
    pub images: Vec<String>,
}

impl From<CatalogItem> for ItemResponse {
    fn from(item: CatalogItem) -> Self {
        Self {
            id: item.id.to_string(),
            seller_id: item.seller_id.to_string(),
            title: item.title,
            description: item.description,
            category: item.category.as_str().to_string(),
            unit: item.unit.as_str().to_string(),
            price_cents: item.price_per_unit.cents(),
            stock_quantity: item.stock_quantity,
            latitude: item.location.latitude,
            longitude: item.location.longitude,
            visible: item.visible,
            organic: item.organic,
            tags: item.tags,
            min_order: item.min_order,
            delivery_radius_km: item.delivery_radius_km,
            rating_average: item.rating.average,
            rating_count: item.rating.count,
            images: item.images,
        }
    }
}

#[derive(Serialize)]
pub struct NearbyItemResponse {
    pub distance_km: f64,
    #[serde(flatten)]
    pub item: ItemResponse,
}

#[derive(Serialize)]
pub struct StockResponse {
    pub id: String,
    pub stock_quantity: u32,
}

// -- Handlers --

/// GET /items — proximity discovery with optional filters.
#[tracing::instrument(skip(state, params))]
pub async fn list_nearby<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<Vec<NearbyItemResponse>>, ApiError>
where
    C: CatalogStore + Clone + 'static,
    S: OrderStore + 'static,
{
    let origin = GeoPoint {
        latitude: params.lat,
        longitude: params.lng,
    };
    let mut query = NearbyQuery::new(origin, params.radius_km);

    if let Some(ref raw) = params.category {
        let category = Category::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown category: {raw}")))?;
        query = query.category(category);
    }
    if let Some(organic) = params.organic {
        query = query.organic(organic);
    }
    if let Some(ref tag) = params.tag {
        query = query.tag(tag.clone());
    }

    let results = state.catalog.list_nearby(query).await?;
    Ok(Json(
        results
            .into_iter()
            .map(|nearby| NearbyItemResponse {
                distance_km: nearby.distance_km,
                item: nearby.item.into(),
            })
            .collect(),
    ))
}

/// GET /items/:id — fetch one item regardless of visibility.
#[tracing::instrument(skip(state))]
pub async fn get<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError>
where
    C: CatalogStore + Clone + 'static,
    S: OrderStore + 'static,
{
    let id = parse_item_id(&id)?;
    let item = state.catalog.get_by_id(id).await?;
    Ok(Json(item.into()))
}

/// POST /items — create a listing (sellers only).
#[tracing::instrument(skip(state, req))]
pub async fn create<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(req): Json<CreateItemRequest>,
) -> Result<(axum::http::StatusCode, Json<ItemResponse>), ApiError>
where
    C: CatalogStore + Clone + 'static,
    S: OrderStore + 'static,
{
    require_farmer(principal.role)?;

    let attrs = NewItem {
        title: req.title,
        description: req.description,
        category: parse_category(&req.category)?,
        unit: parse_unit(&req.unit)?,
        price_per_unit: Money::from_cents(req.price_cents),
        stock_quantity: req.stock_quantity,
        location: GeoPoint {
            latitude: req.latitude,
            longitude: req.longitude,
        },
        organic: req.organic,
        tags: req.tags,
        min_order: req.min_order.unwrap_or(1),
        delivery_radius_km: req.delivery_radius_km,
        images: req.images,
    };

    let item = state.catalog.create(principal.id, attrs).await?;
    Ok((axum::http::StatusCode::CREATED, Json(item.into())))
}

/// PUT /items/:id — partial update by the owning seller.
#[tracing::instrument(skip(state, req))]
pub async fn update<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, ApiError>
where
    C: CatalogStore + Clone + 'static,
    S: OrderStore + 'static,
{
    require_farmer(principal.role)?;
    let id = parse_item_id(&id)?;

    let location = match (req.latitude, req.longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint {
            latitude,
            longitude,
        }),
        (None, None) => None,
        _ => {
            return Err(ApiError::BadRequest(
                "latitude and longitude must be provided together".to_string(),
            ));
        }
    };

    let attrs = ItemUpdate {
        title: req.title,
        description: req.description,
        category: req.category.as_deref().map(parse_category).transpose()?,
        unit: req.unit.as_deref().map(parse_unit).transpose()?,
        price_per_unit: req.price_cents.map(Money::from_cents),
        location,
        visible: req.visible,
        organic: req.organic,
        tags: req.tags,
        min_order: req.min_order,
        delivery_radius_km: req.delivery_radius_km,
        images: req.images,
    };

    let item = state.catalog.update(principal.id, id, attrs).await?;
    Ok(Json(item.into()))
}

/// POST /items/:id/stock — restock (or write off) through the shared
/// atomic stock primitive.
#[tracing::instrument(skip(state, req))]
pub async fn adjust_stock<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    Json(req): Json<StockAdjustRequest>,
) -> Result<Json<StockResponse>, ApiError>
where
    C: CatalogStore + Clone + 'static,
    S: OrderStore + 'static,
{
    let id = parse_item_id(&id)?;

    let item = state.catalog.get_by_id(id).await?;
    let allowed = principal.is_admin()
        || (principal.role == Role::Farmer && item.seller_id == principal.id);
    if !allowed {
        return Err(ApiError::Forbidden(
            "only the owning seller may adjust stock".to_string(),
        ));
    }

    let stock_quantity = state.catalog.adjust_stock(id, req.delta).await?;
    Ok(Json(StockResponse {
        id: id.to_string(),
        stock_quantity,
    }))
}

/// GET /my/items — the authenticated seller's own listings.
#[tracing::instrument(skip(state))]
pub async fn my_items<C, S>(
    State(state): State<Arc<AppState<C, S>>>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<ItemResponse>>, ApiError>
where
    C: CatalogStore + Clone + 'static,
    S: OrderStore + 'static,
{
    require_farmer(principal.role)?;
    let items = state.catalog.list_for_seller(principal.id).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

fn require_farmer(role: Role) -> Result<(), ApiError> {
    if role == Role::Farmer {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "only sellers may manage items".to_string(),
        ))
    }
}

fn parse_category(raw: &str) -> Result<Category, ApiError> {
    Category::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("unknown category: {raw}")))
}

fn parse_unit(raw: &str) -> Result<Unit, ApiError> {
    Unit::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("unknown unit: {raw}")))
}

fn parse_item_id(id: &str) -> Result<ItemId, ApiError> {
    let uuid = Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid item id: {e}")))?;
    Ok(ItemId::from_uuid(uuid))
}
