//! Proximity query benchmarks: grid-indexed lookup over a populated catalog.

use catalog::{
    CatalogStore, Category, GeoPoint, InMemoryCatalogStore, NearbyQuery, NewItem, Unit,
};
use common::{Money, UserId};
use criterion::{Criterion, criterion_group, criterion_main};

fn attrs(lat: f64, lng: f64) -> NewItem {
    NewItem {
        title: "Produce".to_string(),
        description: String::new(),
        category: Category::Vegetables,
        unit: Unit::Kg,
        price_per_unit: Money::from_units(10),
        stock_quantity: 20,
        location: GeoPoint::new(lat, lng).unwrap(),
        organic: false,
        tags: vec![],
        min_order: 1,
        delivery_radius_km: 30.0,
        images: vec![],
    }
}

async fn populated_store(n: usize) -> InMemoryCatalogStore {
    let store = InMemoryCatalogStore::new();
    let seller = UserId::new();
    // Spread items over a ~5x5 degree area around the query origin.
    for i in 0..n {
        let lat = 4.0 + (i % 500) as f64 * 0.01;
        let lng = 2.0 + (i / 500) as f64 * 0.25;
        store.create(seller, attrs(lat, lng)).await.unwrap();
    }
    store
}

fn bench_list_nearby(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let store = runtime.block_on(populated_store(10_000));
    let origin = GeoPoint::new(6.5, 3.4).unwrap();

    c.bench_function("list_nearby_25km_10k_items", |b| {
        b.to_async(&runtime).iter(|| {
            let store = store.clone();
            async move {
                store
                    .list_nearby(NearbyQuery::new(origin, 25.0))
                    .await
                    .unwrap()
            }
        });
    });

    c.bench_function("list_nearby_filtered_10k_items", |b| {
        b.to_async(&runtime).iter(|| {
            let store = store.clone();
            async move {
                store
                    .list_nearby(NearbyQuery::new(origin, 25.0).category(Category::Vegetables))
                    .await
                    .unwrap()
            }
        });
    });
}

criterion_group!(benches, bench_list_nearby);
criterion_main!(benches);
