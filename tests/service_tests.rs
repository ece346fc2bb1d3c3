//! End-to-end tests of the storefront services over an in-memory repository

mod common;

use common::{coupon, new_client, order_on, InMemoryRepository};
use std::sync::Arc;
use storefront_cache::cache::{CacheConfig, CacheStrategy, MemoryStore, Resource};
use storefront_cache::invalidation::UnitOfWork;
use storefront_cache::schema::{ClientUpdate, OrderFilter, OrderStatus, ProfileData};
use storefront_cache::service::{
    ClientService, CouponService, OrderService, ProfileService, ServiceError,
};

struct Storefront {
    repo: Arc<InMemoryRepository>,
    store: MemoryStore,
    clients: ClientService,
    orders: OrderService,
    coupons: CouponService,
    profiles: ProfileService,
}

impl Storefront {
    fn new(strategy: impl FnOnce(&MemoryStore) -> CacheStrategy) -> Self {
        let repo = InMemoryRepository::new();
        let store = MemoryStore::new();
        let cache = strategy(&store);
        Self {
            clients: ClientService::new(repo.clone(), cache.clone()),
            orders: OrderService::new(repo.clone(), repo.clone(), cache.clone()),
            coupons: CouponService::new(repo.clone(), repo.clone(), cache.clone()),
            profiles: ProfileService::new(repo.clone(), repo.clone(), cache),
            repo,
            store,
        }
    }

    fn cached() -> Self {
        Self::new(|store| CacheStrategy::cached(Arc::new(store.clone()), CacheConfig::default()))
    }
}

#[tokio::test]
async fn test_client_reads_are_cached() {
    let app = Storefront::cached();
    let ada = app.clients.add_client(None, new_client("Ada")).await.unwrap();

    let reads = app.repo.reads();
    let first = app.clients.get_client(ada.id).await.unwrap();
    let second = app.clients.get_client(ada.id).await.unwrap();

    assert_eq!(first, second);
    // Served by the write-through entry
    assert_eq!(app.repo.reads(), reads);
}

#[tokio::test]
async fn test_missing_client_is_not_found_and_not_cached() {
    let app = Storefront::cached();

    let err = app.clients.get_client(404).await.unwrap_err();
    assert_eq!(err, ServiceError::not_found(Resource::Client, 404));
    assert!(!app.store.contains_key("client:id:404").await);
}

#[tokio::test]
async fn test_adding_an_order_refreshes_client_and_pages() {
    let app = Storefront::cached();
    let ada = app.clients.add_client(None, new_client("Ada")).await.unwrap();

    // Warm the caches
    assert!(app.clients.get_client(ada.id).await.unwrap().orders.is_empty());
    let page = app.orders.get_orders_page_by_client(ada.id, 0, 20).await.unwrap();
    assert!(page.items.is_empty());

    let mut uow = UnitOfWork::begin();
    let order = app
        .orders
        .add_order_to_client(Some(&mut uow), ada.id, order_on(1, 40.0, OrderStatus::New))
        .await
        .unwrap();

    // Not committed yet: readers still see the old state
    assert!(app.clients.get_client(ada.id).await.unwrap().orders.is_empty());
    uow.commit().await;

    let client = app.clients.get_client(ada.id).await.unwrap();
    assert_eq!(client.orders, vec![order.clone()]);
    let page = app.orders.get_orders_page_by_client(ada.id, 0, 20).await.unwrap();
    assert_eq!(page.items, vec![order.clone()]);
    assert_eq!(app.orders.get_order(order.id).await.unwrap(), order);
}

#[tokio::test]
async fn test_rolled_back_write_keeps_cached_state() {
    let app = Storefront::cached();
    let ada = app.clients.add_client(None, new_client("Ada")).await.unwrap();
    app.clients.get_clients_page(0, 20).await.unwrap();

    let mut uow = UnitOfWork::begin();
    app.orders
        .add_order_to_client(Some(&mut uow), ada.id, order_on(2, 10.0, OrderStatus::Paid))
        .await
        .unwrap();
    uow.rollback();

    let reads = app.repo.reads();
    app.clients.get_clients_page(0, 20).await.unwrap();
    assert_eq!(app.repo.reads(), reads);
}

#[tokio::test]
async fn test_orders_page_by_unknown_client_is_not_found() {
    let app = Storefront::cached();

    let err = app.orders.get_orders_page_by_client(77, 0, 20).await.unwrap_err();
    assert_eq!(err, ServiceError::not_found(Resource::Client, 77));
}

#[tokio::test]
async fn test_status_filter_is_cached_and_other_filters_are_not() {
    let app = Storefront::cached();
    let ada = app.clients.add_client(None, new_client("Ada")).await.unwrap();
    for (day, amount, status) in [
        (1, 10.0, OrderStatus::Paid),
        (3, 30.0, OrderStatus::Paid),
        (2, 20.0, OrderStatus::New),
    ] {
        app.orders
            .add_order_to_client(None, ada.id, order_on(day, amount, status))
            .await
            .unwrap();
    }

    let paid = OrderFilter::by_status(OrderStatus::Paid);
    let page = app.orders.get_orders_by_filter(&paid, 0, 20).await.unwrap();
    let amounts: Vec<f64> = page.items.iter().map(|o| o.total_amount).collect();
    assert_eq!(amounts, vec![30.0, 10.0]);

    let reads = app.repo.reads();
    app.orders.get_orders_by_filter(&paid, 0, 20).await.unwrap();
    assert_eq!(app.repo.reads(), reads);
    assert_eq!(
        app.store.keys_with_prefix("orders:byStatus:ver=").await,
        vec!["orders:byStatus:ver=3:p=0:s=20:status=PAID:sort=orderDate,DESC".to_string()]
    );

    let ranged = OrderFilter {
        min_amount: Some(15.0),
        ..Default::default()
    };
    app.orders.get_orders_by_filter(&ranged, 0, 20).await.unwrap();
    app.orders.get_orders_by_filter(&ranged, 0, 20).await.unwrap();
    assert_eq!(app.repo.reads(), reads + 2);
}

#[tokio::test]
async fn test_order_update_invalidates_status_view() {
    let app = Storefront::cached();
    let ada = app.clients.add_client(None, new_client("Ada")).await.unwrap();
    let order = app
        .orders
        .add_order_to_client(None, ada.id, order_on(5, 50.0, OrderStatus::New))
        .await
        .unwrap();

    let shipped = OrderFilter::by_status(OrderStatus::Shipped);
    assert!(app.orders.get_orders_by_filter(&shipped, 0, 20).await.unwrap().items.is_empty());

    app.orders
        .update_order(None, order.id, order_on(5, 50.0, OrderStatus::Shipped))
        .await
        .unwrap();

    let page = app.orders.get_orders_by_filter(&shipped, 0, 20).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(app.orders.get_order(order.id).await.unwrap().status, OrderStatus::Shipped);
}

#[tokio::test]
async fn test_coupon_delete_evicts_every_linked_client() {
    let app = Storefront::cached();
    let ada = app.clients.add_client(None, new_client("Ada")).await.unwrap();
    let coupon = app
        .coupons
        .add_coupon_to_client(None, ada.id, coupon("SPRING10", 10.0))
        .await
        .unwrap();
    assert_eq!(app.clients.get_client(ada.id).await.unwrap().coupons.len(), 1);

    app.coupons.delete_coupon(None, coupon.id).await.unwrap();

    assert!(app.clients.get_client(ada.id).await.unwrap().coupons.is_empty());
    let err = app.coupons.get_coupon(coupon.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_client_update_replacing_coupons() {
    let app = Storefront::cached();
    let mut seed = new_client("Grace");
    seed.coupons = vec![coupon("OLD", 5.0)];
    let grace = app.clients.add_client(None, seed).await.unwrap();
    let old_coupon = grace.coupons[0].id;

    assert_eq!(app.coupons.get_coupon(old_coupon).await.unwrap().code, "OLD");
    let page = app.coupons.get_coupons_page_by_client(grace.id, 0, 20).await.unwrap();
    assert_eq!(page.items.len(), 1);

    let update = ClientUpdate {
        name: "Grace H.".to_string(),
        email: "grace@example.com".to_string(),
        profile: None,
        orders: None,
        coupons: Some(vec![coupon("NEW", 15.0)]),
    };
    let updated = app.clients.update_client(None, grace.id, update).await.unwrap();

    assert!(app.coupons.get_coupon(old_coupon).await.unwrap_err().is_not_found());
    let page = app.coupons.get_coupons_page_by_client(grace.id, 0, 20).await.unwrap();
    assert_eq!(page.items, updated.coupons);
    assert_eq!(app.clients.get_client(grace.id).await.unwrap().name, "Grace H.");
}

#[tokio::test]
async fn test_client_delete_drops_sub_entities() {
    let app = Storefront::cached();
    let mut seed = new_client("Linus");
    seed.orders = vec![order_on(4, 12.5, OrderStatus::Delivered)];
    let linus = app.clients.add_client(None, seed).await.unwrap();
    let order_id = linus.orders[0].id;

    app.orders.get_order(order_id).await.unwrap();
    app.orders.get_orders_page(0, 20).await.unwrap();

    app.clients.delete_client(None, linus.id).await.unwrap();

    assert!(app.orders.get_order(order_id).await.unwrap_err().is_not_found());
    assert!(app.orders.get_orders_page(0, 20).await.unwrap().items.is_empty());
    assert!(app.clients.get_client(linus.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_client_delete_bumps_only_owned_sub_collections() {
    use storefront_cache::cache::KeyValueStore;

    let app = Storefront::cached();
    let mut seed = new_client("Edsger");
    seed.orders = vec![order_on(6, 8.0, OrderStatus::Paid)];
    let edsger = app.clients.add_client(None, seed).await.unwrap();
    let bare = app.clients.add_client(None, new_client("Barbara")).await.unwrap();
    let orders_before = app.store.get("orders:ver").await.unwrap();

    app.clients.delete_client(None, bare.id).await.unwrap();

    assert_eq!(app.store.get("coupons:ver").await.unwrap(), None);
    assert_eq!(app.store.get("coupons:byClient:ver").await.unwrap(), None);
    assert_eq!(app.store.get("profiles:ver").await.unwrap(), None);
    assert_eq!(app.store.get("orders:ver").await.unwrap(), orders_before);
    assert_eq!(app.store.get("clients:ver").await.unwrap(), Some("3".to_string()));

    app.clients.delete_client(None, edsger.id).await.unwrap();
    assert_eq!(app.store.get("coupons:ver").await.unwrap(), None);
    assert_eq!(app.store.get("orders:ver").await.unwrap(), Some("2".to_string()));
}

#[tokio::test]
async fn test_profile_update() {
    let app = Storefront::cached();
    let mut seed = new_client("Ada");
    seed.profile = Some(ProfileData {
        address: "1 Main St".to_string(),
        phone: "555-0100".to_string(),
    });
    let ada = app.clients.add_client(None, seed).await.unwrap();
    let profile_id = ada.profile.as_ref().unwrap().id;
    assert_eq!(app.profiles.get_profile(profile_id).await.unwrap().address, "1 Main St");

    let moved = ProfileData {
        address: "2 Side Rd".to_string(),
        phone: "555-0199".to_string(),
    };
    app.profiles.update_profile(None, ada.id, moved).await.unwrap();

    assert_eq!(app.profiles.get_profile(profile_id).await.unwrap().address, "2 Side Rd");
    let client = app.clients.get_client(ada.id).await.unwrap();
    assert_eq!(client.profile.unwrap().phone, "555-0199");
}

#[tokio::test]
async fn test_profile_update_without_profile_is_bad_request() {
    let app = Storefront::cached();
    let ada = app.clients.add_client(None, new_client("Ada")).await.unwrap();
    let data = ProfileData {
        address: "x".to_string(),
        phone: "y".to_string(),
    };

    let err = app.profiles.update_profile(None, ada.id, data.clone()).await.unwrap_err();
    assert_eq!(err, ServiceError::BadRequest("Client hasn't a profile".to_string()));

    let err = app.profiles.update_profile(None, 999, data).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_repository_errors_propagate() {
    let app = Storefront::cached();
    app.repo.set_unavailable(true);

    let err = app.clients.get_clients_page(0, 20).await.unwrap_err();
    assert!(matches!(err, ServiceError::Repository(_)));
}

#[tokio::test]
async fn test_passthrough_strategy_reads_repository_every_time() {
    let app = Storefront::new(|_| CacheStrategy::passthrough());
    let ada = app.clients.add_client(None, new_client("Ada")).await.unwrap();

    let reads = app.repo.reads();
    app.clients.get_client(ada.id).await.unwrap();
    app.clients.get_client(ada.id).await.unwrap();

    assert_eq!(app.repo.reads(), reads + 2);
    assert!(app.store.is_empty().await);
}
