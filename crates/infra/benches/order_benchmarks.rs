use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;

use storefront_auth::{Principal, Role};
use storefront_catalog::NewProduct;
use storefront_core::{Address, Money, ProductId, UserId};
use storefront_infra::file_storage::InMemoryFileStorage;
use storefront_infra::services::{CatalogService, OrderLineRequest, OrderService, PlaceOrder};
use storefront_infra::store::{InMemoryStore, Store};
use storefront_orders::{Order, OrderLine};

fn address() -> Address {
    Address::new("1 Main St", "Springfield", "IL", "62701", "US").unwrap()
}

fn order_with_lines(count: usize) -> Order {
    let lines = (0..count)
        .map(|i| OrderLine {
            product_id: ProductId::new(),
            product_name: format!("Product {i}"),
            quantity: (i % 7 + 1) as u32,
            price: Money::new(dec!(19.99)),
        })
        .collect();
    Order::place(UserId::new(), address(), String::new(), lines, Utc::now()).unwrap()
}

fn bench_order_total(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_total");

    for lines in [1usize, 10, 100] {
        let mut order = order_with_lines(lines);
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, _| {
            b.iter(|| black_box(order.calculate_total()));
        });
    }

    group.finish();
}

fn bench_place_and_cancel(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("place_and_cancel");

    for lines in [1usize, 5, 20] {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let catalog = CatalogService::new(store.clone(), Arc::new(InMemoryFileStorage::new()));
        let orders = OrderService::new(store);
        let admin = Principal::new(UserId::new(), vec![Role::ADMIN]);
        let buyer = Principal::new(UserId::new(), vec![Role::CUSTOMER]);

        let product_ids: Vec<ProductId> = rt.block_on(async {
            let mut ids = Vec::with_capacity(lines);
            for i in 0..lines {
                let product = catalog
                    .create_product(
                        &admin,
                        NewProduct {
                            name: format!("Product {i}"),
                            description: String::new(),
                            price: Money::new(dec!(4.25)),
                            stock: 1_000,
                            sku: None,
                        },
                    )
                    .await
                    .unwrap();
                ids.push(product.id_typed());
            }
            ids
        });

        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let request = PlaceOrder {
                        items: product_ids
                            .iter()
                            .map(|id| OrderLineRequest {
                                product_id: *id,
                                quantity: 1,
                            })
                            .collect(),
                        shipping_address: address(),
                        notes: String::new(),
                    };
                    let order = orders.place_order(&buyer, request).await.unwrap();
                    // Cancel so stock never runs out across iterations.
                    black_box(orders.cancel_order(&buyer, order.id_typed()).await.unwrap());
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_order_total, bench_place_and_cancel);
criterion_main!(benches);
