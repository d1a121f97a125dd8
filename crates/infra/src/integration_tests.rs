//! End-to-end service tests against the in-memory store.
//!
//! Verifies:
//! - placement reserves stock and snapshots prices atomically
//! - a failing line leaves every product untouched
//! - concurrent placements never oversell
//! - cancellation (owner or admin) returns stock exactly once
//! - orders are invisible to other customers
//! - cancelling still restocks a product deactivated after the order
//! - user profiles are owner-or-admin and emails are unique

use std::sync::Arc;

use rust_decimal_macros::dec;

use storefront_auth::{Principal, Role};
use storefront_catalog::{NewProduct, Product, ProductUpdate};
use storefront_core::{Address, AggregateRoot, DomainError, Money, OrderId, ProductId, UserId};
use storefront_orders::OrderStatus;

use crate::file_storage::{FileStorage, InMemoryFileStorage};
use storefront_users::{NewUser, ProfileUpdate};

use crate::services::{
    CatalogService, ImageUpload, OrderLineRequest, OrderService, PlaceOrder, ServiceError,
    UserService,
};
use crate::store::{
    InMemoryStore, OrderQuery, ProductQuery, ProductSort, SortOrder, Store, UserQuery,
};

struct Harness {
    store: InMemoryStore,
    files: InMemoryFileStorage,
    catalog: CatalogService,
    orders: OrderService,
    users: UserService,
    admin: Principal,
}

fn harness() -> Harness {
    let store = InMemoryStore::new();
    let files = InMemoryFileStorage::new();
    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let file_store: Arc<dyn FileStorage> = Arc::new(files.clone());
    Harness {
        catalog: CatalogService::new(shared.clone(), file_store),
        orders: OrderService::new(shared.clone()),
        users: UserService::new(shared),
        store,
        files,
        admin: Principal::new(UserId::new(), vec![Role::ADMIN]),
    }
}

fn customer() -> Principal {
    Principal::new(UserId::new(), vec![Role::CUSTOMER])
}

fn address() -> Address {
    Address::new("1 Main St", "Springfield", "IL", "62701", "US").unwrap()
}

fn place(items: &[(ProductId, u32)]) -> PlaceOrder {
    PlaceOrder {
        items: items
            .iter()
            .map(|(product_id, quantity)| OrderLineRequest {
                product_id: *product_id,
                quantity: *quantity,
            })
            .collect(),
        shipping_address: address(),
        notes: String::new(),
    }
}

impl Harness {
    async fn product(&self, name: &str, price: Money, stock: u32) -> Product {
        self.catalog
            .create_product(
                &self.admin,
                NewProduct {
                    name: name.to_string(),
                    description: format!("{name} description"),
                    price,
                    stock,
                    sku: None,
                },
            )
            .await
            .unwrap()
    }

    async fn stock_of(&self, id: ProductId) -> u32 {
        let mut uow = self.store.begin().await.unwrap();
        uow.get_product(id).await.unwrap().unwrap().stock()
    }
}

fn new_user(email: &str, first: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        first_name: first.to_string(),
        last_name: "Tester".to_string(),
    }
}

fn domain(err: ServiceError) -> DomainError {
    match err {
        ServiceError::Domain(err) => err,
        other => panic!("Expected domain error, got {other:?}"),
    }
}

#[tokio::test]
async fn place_then_cancel_restores_stock() {
    let h = harness();
    let widget = h.product("Widget", Money::new(dec!(10.00)), 5).await;
    let buyer = customer();

    let order = h
        .orders
        .place_order(&buyer, place(&[(widget.id_typed(), 3)]))
        .await
        .unwrap();

    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.total_amount(), Money::new(dec!(30.00)));
    assert_eq!(order.items().len(), 1);
    assert_eq!(order.items()[0].price(), Money::new(dec!(10.00)));
    assert_eq!(order.items()[0].product_name(), "Widget");
    assert_eq!(order.version(), 1);
    assert_eq!(h.stock_of(widget.id_typed()).await, 2);

    let cancelled = h.orders.cancel_order(&buyer, order.id_typed()).await.unwrap();
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(cancelled.version(), 2);
    assert_eq!(h.stock_of(widget.id_typed()).await, 5);

    // A second cancel is refused and does not release twice.
    let err = domain(h.orders.cancel_order(&buyer, order.id_typed()).await.unwrap_err());
    assert!(matches!(err, DomainError::BusinessRule(_)));
    assert_eq!(h.stock_of(widget.id_typed()).await, 5);
}

#[tokio::test]
async fn cancel_restores_stock_of_a_deactivated_product() {
    let h = harness();
    let widget = h.product("Widget", Money::new(dec!(10.00)), 5).await;
    let buyer = customer();

    let order = h
        .orders
        .place_order(&buyer, place(&[(widget.id_typed(), 3)]))
        .await
        .unwrap();
    h.catalog
        .deactivate_product(&h.admin, widget.id_typed())
        .await
        .unwrap();

    let cancelled = h.orders.cancel_order(&buyer, order.id_typed()).await.unwrap();
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(cancelled.items()[0].product_name(), "Widget");
    assert_eq!(h.stock_of(widget.id_typed()).await, 5);
}

#[tokio::test]
async fn oversized_prices_and_totals_are_rejected_without_panicking() {
    let h = harness();

    let err = domain(
        h.catalog
            .create_product(
                &h.admin,
                NewProduct {
                    name: "Yacht".into(),
                    description: String::new(),
                    price: "10000000000000000000000000".parse().unwrap(),
                    stock: 10_000,
                    sku: None,
                },
            )
            .await
            .unwrap_err(),
    );
    match err {
        DomainError::Validation(errors) => assert!(errors.get("price").is_some()),
        other => panic!("Expected Validation, got {other:?}"),
    }

    let yacht = h.product("Yacht", Money::PRICE_MAX, 10_000).await;
    let err = domain(
        h.orders
            .place_order(&customer(), place(&[(yacht.id_typed(), 10_000)]))
            .await
            .unwrap_err(),
    );
    match err {
        DomainError::BusinessRule(msg) => assert!(msg.contains("exceeds the maximum")),
        other => panic!("Expected BusinessRule, got {other:?}"),
    }
    assert_eq!(h.stock_of(yacht.id_typed()).await, 10_000);
}

#[tokio::test]
async fn insufficient_line_leaves_all_stock_untouched() {
    let h = harness();
    let a = h.product("A", Money::new(dec!(1.00)), 10).await;
    let b = h.product("B", Money::new(dec!(2.00)), 1).await;

    let err = domain(
        h.orders
            .place_order(&customer(), place(&[(a.id_typed(), 4), (b.id_typed(), 2)]))
            .await
            .unwrap_err(),
    );
    match err {
        DomainError::InsufficientInventory {
            product_id,
            requested,
            available,
            ..
        } => {
            assert_eq!(product_id, b.id_typed());
            assert_eq!(requested, 2);
            assert_eq!(available, 1);
        }
        other => panic!("Expected InsufficientInventory, got {other:?}"),
    }

    assert_eq!(h.stock_of(a.id_typed()).await, 10);
    assert_eq!(h.stock_of(b.id_typed()).await, 1);
    let page = h
        .orders
        .list_orders(&h.admin, OrderQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn repeated_product_lines_are_merged() {
    let h = harness();
    let widget = h.product("Widget", Money::new(dec!(2.50)), 10).await;

    let order = h
        .orders
        .place_order(&customer(), place(&[(widget.id_typed(), 2), (widget.id_typed(), 3)]))
        .await
        .unwrap();

    assert_eq!(order.items().len(), 1);
    assert_eq!(order.items()[0].quantity(), 5);
    assert_eq!(order.total_amount(), Money::new(dec!(12.50)));
    assert_eq!(h.stock_of(widget.id_typed()).await, 5);
}

#[tokio::test]
async fn missing_and_inactive_products_are_rejected() {
    let h = harness();
    let missing = ProductId::new();
    let err = domain(
        h.orders
            .place_order(&customer(), place(&[(missing, 1)]))
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::NotFound { entity: "Product", .. }));

    let retired = h.product("Retired", Money::new(dec!(5.00)), 3).await;
    h.catalog
        .deactivate_product(&h.admin, retired.id_typed())
        .await
        .unwrap();
    let err = domain(
        h.orders
            .place_order(&customer(), place(&[(retired.id_typed(), 1)]))
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::NotFound { entity: "Product", .. }));
    assert_eq!(h.stock_of(retired.id_typed()).await, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_placements_never_oversell() {
    let h = harness();
    let widget = h.product("Widget", Money::new(dec!(10.00)), 5).await;
    let id = widget.id_typed();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let orders = h.orders.clone();
        handles.push(tokio::spawn(async move {
            let buyer = customer();
            orders.place_order(&buyer, place(&[(id, 3)])).await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(err) => assert!(matches!(
                domain(err),
                DomainError::InsufficientInventory { .. }
            )),
        }
    }

    assert_eq!(placed, 1);
    assert_eq!(h.stock_of(id).await, 2);
}

#[tokio::test]
async fn delivered_orders_cannot_be_cancelled() {
    let h = harness();
    let widget = h.product("Widget", Money::new(dec!(10.00)), 5).await;
    let buyer = customer();
    let order = h
        .orders
        .place_order(&buyer, place(&[(widget.id_typed(), 1)]))
        .await
        .unwrap();

    for status in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
        h.orders
            .update_status(&h.admin, order.id_typed(), status)
            .await
            .unwrap();
    }

    let err = domain(h.orders.cancel_order(&buyer, order.id_typed()).await.unwrap_err());
    assert!(matches!(err, DomainError::BusinessRule(_)));
    assert_eq!(h.stock_of(widget.id_typed()).await, 4);

    let err = domain(
        h.orders
            .update_status(&h.admin, order.id_typed(), OrderStatus::Pending)
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::InvalidStatusTransition { .. }));
}

#[tokio::test]
async fn admin_cancel_through_status_update_releases_stock() {
    let h = harness();
    let widget = h.product("Widget", Money::new(dec!(10.00)), 5).await;
    let order = h
        .orders
        .place_order(&customer(), place(&[(widget.id_typed(), 2)]))
        .await
        .unwrap();

    h.orders
        .update_status(&h.admin, order.id_typed(), OrderStatus::Processing)
        .await
        .unwrap();
    let cancelled = h
        .orders
        .update_status(&h.admin, order.id_typed(), OrderStatus::Cancelled)
        .await
        .unwrap();

    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(h.stock_of(widget.id_typed()).await, 5);
}

#[tokio::test]
async fn customers_cannot_manage_order_status() {
    let h = harness();
    let widget = h.product("Widget", Money::new(dec!(10.00)), 5).await;
    let buyer = customer();
    let order = h
        .orders
        .place_order(&buyer, place(&[(widget.id_typed(), 1)]))
        .await
        .unwrap();

    let err = domain(
        h.orders
            .update_status(&buyer, order.id_typed(), OrderStatus::Shipped)
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::Unauthorized(_)));

    let err = domain(
        h.orders
            .set_tracking_number(&buyer, order.id_typed(), "1Z999".into())
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::Unauthorized(_)));

    let tracked = h
        .orders
        .set_tracking_number(&h.admin, order.id_typed(), "  1Z999  ".into())
        .await
        .unwrap();
    assert_eq!(tracked.tracking_number(), Some("1Z999"));
}

#[tokio::test]
async fn orders_are_hidden_from_other_customers() {
    let h = harness();
    let widget = h.product("Widget", Money::new(dec!(10.00)), 10).await;
    let owner = customer();
    let stranger = customer();

    let order = h
        .orders
        .place_order(&owner, place(&[(widget.id_typed(), 1)]))
        .await
        .unwrap();
    h.orders
        .place_order(&stranger, place(&[(widget.id_typed(), 1)]))
        .await
        .unwrap();

    let err = domain(h.orders.get_order(&stranger, order.id_typed()).await.unwrap_err());
    assert!(matches!(err, DomainError::NotFound { entity: "Order", .. }));
    let err = domain(h.orders.cancel_order(&stranger, order.id_typed()).await.unwrap_err());
    assert!(matches!(err, DomainError::NotFound { .. }));
    assert_eq!(h.stock_of(widget.id_typed()).await, 8);

    assert!(h.orders.get_order(&owner, order.id_typed()).await.is_ok());
    assert!(h.orders.get_order(&h.admin, order.id_typed()).await.is_ok());

    let own = h.orders.list_orders(&owner, OrderQuery::default()).await.unwrap();
    assert_eq!(own.total, 1);
    assert_eq!(own.items[0].id_typed(), order.id_typed());

    let all = h.orders.list_orders(&h.admin, OrderQuery::default()).await.unwrap();
    assert_eq!(all.total, 2);

    let missing = domain(h.orders.get_order(&owner, OrderId::new()).await.unwrap_err());
    assert!(matches!(missing, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn list_orders_filters_by_status() {
    let h = harness();
    let widget = h.product("Widget", Money::new(dec!(1.00)), 10).await;
    let buyer = customer();
    let first = h
        .orders
        .place_order(&buyer, place(&[(widget.id_typed(), 1)]))
        .await
        .unwrap();
    h.orders
        .place_order(&buyer, place(&[(widget.id_typed(), 1)]))
        .await
        .unwrap();
    h.orders.cancel_order(&buyer, first.id_typed()).await.unwrap();

    let cancelled = h
        .orders
        .list_orders(
            &buyer,
            OrderQuery {
                status: Some(OrderStatus::Cancelled),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cancelled.total, 1);
    assert_eq!(cancelled.items[0].id_typed(), first.id_typed());
}

#[tokio::test]
async fn catalog_management_requires_admin() {
    let h = harness();
    let err = domain(
        h.catalog
            .create_product(
                &customer(),
                NewProduct {
                    name: "Widget".into(),
                    description: String::new(),
                    price: Money::new(dec!(1.00)),
                    stock: 1,
                    sku: None,
                },
            )
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::Unauthorized(_)));
}

#[tokio::test]
async fn catalog_lists_only_active_products() {
    let h = harness();
    let cheap = h.product("Cheap Mug", Money::new(dec!(3.00)), 1).await;
    let pricey = h.product("Pricey Mug", Money::new(dec!(30.00)), 1).await;
    let gone = h.product("Old Mug", Money::new(dec!(10.00)), 1).await;
    h.catalog
        .deactivate_product(&h.admin, gone.id_typed())
        .await
        .unwrap();

    let page = h
        .catalog
        .list_products(ProductQuery {
            search: Some("mug".into()),
            sort_by: ProductSort::Price,
            order: SortOrder::Asc,
            ..Default::default()
        })
        .await
        .unwrap();
    let ids: Vec<_> = page.items.iter().map(Product::id_typed).collect();
    assert_eq!(ids, vec![cheap.id_typed(), pricey.id_typed()]);

    let err = domain(h.catalog.get_product(gone.id_typed()).await.unwrap_err());
    assert!(matches!(err, DomainError::NotFound { .. }));
    let err = domain(
        h.catalog
            .deactivate_product(&h.admin, gone.id_typed())
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::NotFound { .. }));

    let restored = h
        .catalog
        .activate_product(&h.admin, gone.id_typed())
        .await
        .unwrap();
    assert!(restored.is_active());
    assert!(h.catalog.get_product(gone.id_typed()).await.is_ok());

    let err = domain(
        h.catalog
            .activate_product(&h.admin, gone.id_typed())
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::BusinessRule(_)));

    let err = domain(
        h.catalog
            .activate_product(&customer(), gone.id_typed())
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::Unauthorized(_)));
}

#[tokio::test]
async fn update_can_reactivate_a_product() {
    let h = harness();
    let mug = h.product("Mug", Money::new(dec!(3.00)), 1).await;
    h.catalog
        .deactivate_product(&h.admin, mug.id_typed())
        .await
        .unwrap();

    let restored = h
        .catalog
        .update_product(
            &h.admin,
            mug.id_typed(),
            ProductUpdate {
                active: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(restored.is_active());
}

#[tokio::test]
async fn duplicate_sku_is_a_conflict() {
    let h = harness();
    let input = || NewProduct {
        name: "Widget".into(),
        description: String::new(),
        price: Money::new(dec!(1.00)),
        stock: 1,
        sku: Some("W-1".into()),
    };
    h.catalog.create_product(&h.admin, input()).await.unwrap();
    let err = domain(h.catalog.create_product(&h.admin, input()).await.unwrap_err());
    assert!(matches!(err, DomainError::Conflict(_)));
}

#[tokio::test]
async fn replacing_an_image_deletes_the_previous_file() {
    let h = harness();
    let widget = h.product("Widget", Money::new(dec!(1.00)), 1).await;
    let upload = |name: &str| ImageUpload {
        filename: name.to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, b'P', b'N', b'G'],
    };

    let first = h
        .catalog
        .set_product_image(&h.admin, widget.id_typed(), upload("a.png"))
        .await
        .unwrap();
    let first_url = first.image_url().unwrap().to_string();
    assert!(h.files.contains(&first_url));

    let second = h
        .catalog
        .set_product_image(&h.admin, widget.id_typed(), upload("b.png"))
        .await
        .unwrap();
    let second_url = second.image_url().unwrap().to_string();

    assert_ne!(first_url, second_url);
    assert!(!h.files.contains(&first_url));
    assert!(h.files.contains(&second_url));

    let err = domain(
        h.catalog
            .set_product_image(&h.admin, ProductId::new(), upload("c.png"))
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn inactive_products_do_not_take_new_images() {
    let h = harness();
    let widget = h.product("Widget", Money::new(dec!(1.00)), 1).await;
    h.catalog
        .deactivate_product(&h.admin, widget.id_typed())
        .await
        .unwrap();

    let err = domain(
        h.catalog
            .set_product_image(
                &h.admin,
                widget.id_typed(),
                ImageUpload {
                    filename: "a.png".to_string(),
                    content_type: "image/png".to_string(),
                    bytes: vec![1, 2, 3],
                },
            )
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::NotFound { entity: "Product", .. }));

    let mut uow = h.store.begin().await.unwrap();
    let stored = uow.get_product(widget.id_typed()).await.unwrap().unwrap();
    assert_eq!(stored.image_url(), None);
}

#[tokio::test]
async fn profile_registration_is_once_per_identity() {
    let h = harness();
    let alice = customer();

    let user = h
        .users
        .register_profile(&alice, new_user("Alice@Example.com", "Alice"))
        .await
        .unwrap();
    assert_eq!(user.id_typed(), alice.user_id);
    assert_eq!(user.email(), "alice@example.com");
    assert_eq!(h.users.me(&alice).await.unwrap(), user);

    let err = domain(
        h.users
            .register_profile(&alice, new_user("other@example.com", "Alice"))
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::Conflict(_)));

    // Same email under another identity.
    let err = domain(
        h.users
            .register_profile(&customer(), new_user("ALICE@example.com", "Mallory"))
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::Conflict(_)));

    let err = domain(h.users.me(&customer()).await.unwrap_err());
    assert!(matches!(err, DomainError::NotFound { entity: "User", .. }));
}

#[tokio::test]
async fn profile_update_changes_names_only() {
    let h = harness();
    let alice = customer();
    h.users
        .register_profile(&alice, new_user("alice@example.com", "Alice"))
        .await
        .unwrap();

    let updated = h
        .users
        .update_me(
            &alice,
            ProfileUpdate {
                first_name: Some("Alicia".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.first_name(), "Alicia");
    assert_eq!(updated.email(), "alice@example.com");

    let err = domain(
        h.users
            .update_me(&alice, ProfileUpdate::default())
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(h.users.me(&alice).await.unwrap().first_name(), "Alicia");
}

#[tokio::test]
async fn profiles_are_visible_to_owner_and_admin_only() {
    let h = harness();
    let alice = customer();
    let user = h
        .users
        .register_profile(&alice, new_user("alice@example.com", "Alice"))
        .await
        .unwrap();

    assert_eq!(h.users.get_user(&alice, user.id_typed()).await.unwrap(), user);
    assert_eq!(h.users.get_user(&h.admin, user.id_typed()).await.unwrap(), user);

    let err = domain(h.users.get_user(&customer(), user.id_typed()).await.unwrap_err());
    assert!(matches!(err, DomainError::Unauthorized(_)));

    let err = domain(h.users.get_user(&h.admin, UserId::new()).await.unwrap_err());
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn admin_lists_and_deactivates_users() {
    let h = harness();
    let alice = customer();
    let bob = customer();
    h.users
        .register_profile(&alice, new_user("alice@example.com", "Alice"))
        .await
        .unwrap();
    h.users
        .register_profile(&bob, new_user("bob@example.com", "Bob"))
        .await
        .unwrap();

    let err = domain(h.users.list_users(&alice, UserQuery::default()).await.unwrap_err());
    assert!(matches!(err, DomainError::Unauthorized(_)));

    let page = h
        .users
        .list_users(
            &h.admin,
            UserQuery {
                search: Some("BOB".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id_typed(), bob.user_id);

    let err = domain(h.users.deactivate_user(&alice, bob.user_id).await.unwrap_err());
    assert!(matches!(err, DomainError::Unauthorized(_)));

    let gone = h.users.deactivate_user(&h.admin, bob.user_id).await.unwrap();
    assert!(!gone.is_active());

    let err = domain(h.users.deactivate_user(&h.admin, bob.user_id).await.unwrap_err());
    assert!(matches!(err, DomainError::NotFound { .. }));
    let err = domain(h.users.me(&bob).await.unwrap_err());
    assert!(matches!(err, DomainError::NotFound { .. }));

    let page = h.users.list_users(&h.admin, UserQuery::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id_typed(), alice.user_id);
}
