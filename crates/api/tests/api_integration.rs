//! Integration tests for the API server.

use std::sync::Arc;
use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use catalog::InMemoryCatalogStore;
use common::{Role, UserId};
use metrics_exporter_prometheus::PrometheusHandle;
use orders::InMemoryOrderStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

type TestState = Arc<api::AppState<InMemoryCatalogStore, InMemoryOrderStore>>;

fn setup() -> (axum::Router, TestState) {
    let state = api::create_default_state();
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

fn request(
    method: &str,
    uri: &str,
    principal: Option<(UserId, Role)>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = principal {
        builder = builder
            .header("x-user-id", id.to_string())
            .header("x-user-role", role.as_str());
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn item_body(price_cents: i64, stock: u32) -> serde_json::Value {
    serde_json::json!({
        "title": "Fresh Tomatoes",
        "description": "Vine ripened",
        "category": "vegetables",
        "unit": "kg",
        "price_cents": price_cents,
        "stock_quantity": stock,
        "latitude": 6.5244,
        "longitude": 3.3792,
        "organic": true,
        "tags": ["tomato"],
        "delivery_radius_km": 25.0
    })
}

async fn create_item(
    app: &axum::Router,
    seller: UserId,
    price_cents: i64,
    stock: u32,
) -> String {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/items",
            Some((seller, Role::Farmer)),
            Some(item_body(price_cents, stock)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

fn order_body(item_id: &str, quantity: u32) -> serde_json::Value {
    serde_json::json!({
        "lines": [{ "item_id": item_id, "quantity": quantity }],
        "delivery_address": {
            "line1": "4 Harvest Close",
            "city": "Lagos",
            "latitude": 6.45,
            "longitude": 3.39
        },
        "payment_provider": "card"
    })
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let response = app
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_item_creation_requires_principal() {
    let (app, _) = setup();

    let response = app
        .oneshot(request("POST", "/items", None, Some(item_body(4500, 5))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_consumer_cannot_create_items() {
    let (app, _) = setup();

    let response = app
        .oneshot(request(
            "POST",
            "/items",
            Some((UserId::new(), Role::Consumer)),
            Some(item_body(4500, 5)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_and_discover_item() {
    let (app, _) = setup();
    let seller = UserId::new();
    let item_id = create_item(&app, seller, 4500, 5).await;

    // Within radius, matching filters.
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/items?lat=6.52&lng=3.38&radius_km=10&category=vegetables&organic=true",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], item_id.as_str());
    assert!(json[0]["distance_km"].as_f64().unwrap() < 10.0);

    // Unmatched category: empty list, not an error.
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/items?lat=6.52&lng=3.38&radius_km=10&category=honey",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await.as_array().unwrap().is_empty());

    // Unknown category: a validation error.
    let response = app
        .oneshot(request(
            "GET",
            "/items?lat=6.52&lng=3.38&radius_km=10&category=minerals",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_decrements_stock_and_freezes_price() {
    let (app, _) = setup();
    let seller = UserId::new();
    let buyer = UserId::new();
    let item_id = create_item(&app, seller, 4500, 5).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/orders",
            Some((buyer, Role::Consumer)),
            Some(order_body(&item_id, 3)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = body_json(response).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["lines"][0]["unit_price_cents"], 4500);
    assert_eq!(order["lines"][0]["quantity"], 3);

    let response = app
        .oneshot(request("GET", &format!("/items/{item_id}"), None, None))
        .await
        .unwrap();
    let item = body_json(response).await;
    assert_eq!(item["stock_quantity"], 2);
}

#[tokio::test]
async fn test_oversell_is_a_conflict() {
    let (app, _) = setup();
    let seller = UserId::new();
    let item_id = create_item(&app, seller, 4500, 5).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/orders",
            Some((UserId::new(), Role::Consumer)),
            Some(order_body(&item_id, 9)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("insufficient stock"));
}

#[tokio::test]
async fn test_order_lifecycle_over_http() {
    let (app, _) = setup();
    let seller = UserId::new();
    let buyer = UserId::new();
    let item_id = create_item(&app, seller, 4500, 5).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/orders",
            Some((buyer, Role::Consumer)),
            Some(order_body(&item_id, 2)),
        ))
        .await
        .unwrap();
    let order_id = body_json(response).await["id"].as_str().unwrap().to_string();

    // Payment collaborator callback marks it paid.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/orders/{order_id}/payment"),
            None,
            Some(serde_json::json!({
                "provider_payment_id": "PAY-123",
                "status": "completed"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "paid");
    assert_eq!(json["payment"]["status"], "completed");

    // The buyer may not advance fulfillment.
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            Some((buyer, Role::Consumer)),
            Some(serde_json::json!({ "status": "preparing" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The owning seller may.
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            Some((seller, Role::Farmer)),
            Some(serde_json::json!({ "status": "preparing" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "preparing");

    // Skipping to delivered is an invalid transition.
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            Some((seller, Role::Farmer)),
            Some(serde_json::json!({ "status": "delivered" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_restores_stock_and_is_idempotent() {
    let (app, _) = setup();
    let seller = UserId::new();
    let buyer = UserId::new();
    let item_id = create_item(&app, seller, 4500, 5).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/orders",
            Some((buyer, Role::Consumer)),
            Some(order_body(&item_id, 3)),
        ))
        .await
        .unwrap();
    let order_id = body_json(response).await["id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/orders/{order_id}/cancel"),
                Some((buyer, Role::Consumer)),
                Some(serde_json::json!({ "reason": "changed my mind" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "cancelled");
    }

    // Stock restored exactly once.
    let response = app
        .oneshot(request("GET", &format!("/items/{item_id}"), None, None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["stock_quantity"], 5);
}

#[tokio::test]
async fn test_seller_restock_endpoint() {
    let (app, _) = setup();
    let seller = UserId::new();
    let item_id = create_item(&app, seller, 4500, 5).await;

    // A stranger may not restock.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/items/{item_id}/stock"),
            Some((UserId::new(), Role::Farmer)),
            Some(serde_json::json!({ "delta": 10 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The owner may.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/items/{item_id}/stock"),
            Some((seller, Role::Farmer)),
            Some(serde_json::json!({ "delta": 10 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["stock_quantity"], 15);

    // Writing off more than available is a conflict.
    let response = app
        .oneshot(request(
            "POST",
            &format!("/items/{item_id}/stock"),
            Some((seller, Role::Farmer)),
            Some(serde_json::json!({ "delta": -100 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_order_listings_by_role() {
    let (app, _) = setup();
    let seller = UserId::new();
    let buyer = UserId::new();
    let item_id = create_item(&app, seller, 4500, 50).await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/orders",
                Some((buyer, Role::Consumer)),
                Some(order_body(&item_id, 1)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/orders",
            Some((buyer, Role::Consumer)),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);

    let response = app
        .oneshot(request(
            "GET",
            "/orders?role=seller",
            Some((seller, Role::Farmer)),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
}
