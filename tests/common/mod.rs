//! Shared fixtures for the integration suites
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storefront_cache::cache::{CacheKey, CacheValue, KeyTtl, KeyValueStore, MemoryStore};
use storefront_cache::schema::{
    Client, ClientRepository, ClientUpdate, Coupon, CouponRepository, NewClient, NewCoupon,
    NewOrder, Order, OrderFilter, OrderRepository, OrderStatus, Profile, ProfileData,
    ProfileRepository, RepositoryError, RepositoryResult,
};
use storefront_cache::{CacheError, Page, PageRequest};

#[derive(Clone)]
struct ClientRow {
    id: i64,
    name: String,
    email: String,
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    clients: BTreeMap<i64, ClientRow>,
    profiles: BTreeMap<i64, Profile>,
    orders: BTreeMap<i64, Order>,
    coupons: BTreeMap<i64, Coupon>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn assemble(&self, row: &ClientRow) -> Client {
        Client {
            id: row.id,
            name: row.name.clone(),
            email: row.email.clone(),
            registration_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            profile: self
                .profiles
                .values()
                .find(|p| p.client_id == row.id)
                .cloned(),
            orders: self
                .orders
                .values()
                .filter(|o| o.client_id == row.id)
                .cloned()
                .collect(),
            coupons: self
                .coupons
                .values()
                .filter(|c| c.client_ids.contains(&row.id))
                .cloned()
                .collect(),
        }
    }

    fn add_order(&mut self, client_id: i64, order: NewOrder) -> Order {
        let order = Order {
            id: self.next_id(),
            order_date: order.order_date,
            total_amount: order.total_amount,
            status: order.status,
            client_id,
        };
        self.orders.insert(order.id, order.clone());
        order
    }

    fn add_coupon(&mut self, client_id: i64, coupon: NewCoupon) -> Coupon {
        let coupon = Coupon {
            id: self.next_id(),
            code: coupon.code,
            discount: coupon.discount,
            expiration_date: coupon.expiration_date,
            client_ids: vec![client_id],
        };
        self.coupons.insert(coupon.id, coupon.clone());
        coupon
    }

    fn set_profile(&mut self, client_id: i64, data: ProfileData) {
        let existing = self
            .profiles
            .values()
            .find(|p| p.client_id == client_id)
            .map(|p| p.id);
        let id = match existing {
            Some(id) => id,
            None => self.next_id(),
        };
        self.profiles.insert(
            id,
            Profile {
                id,
                address: data.address,
                phone: data.phone,
                client_id,
            },
        );
    }
}

fn page_of<T: Clone>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let slice = items
        .into_iter()
        .skip(request.offset())
        .take(request.size as usize)
        .collect();
    Page::counted(slice, request, total)
}

/// Repository over in-process tables that counts data reads
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
    reads: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of reads that reached the tables
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn read(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Tables>> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.lock().unwrap())
    }

    fn write(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Tables>> {
        self.check()?;
        Ok(self.tables.lock().unwrap())
    }

    fn check(&self) -> RepositoryResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(RepositoryError::Unavailable("database offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ClientRepository for InMemoryRepository {
    async fn find_client(&self, id: i64) -> RepositoryResult<Option<Client>> {
        let tables = self.read()?;
        Ok(tables.clients.get(&id).map(|row| tables.assemble(row)))
    }

    async fn client_exists(&self, id: i64) -> RepositoryResult<bool> {
        Ok(self.write()?.clients.contains_key(&id))
    }

    async fn clients_page(&self, request: PageRequest) -> RepositoryResult<Page<Client>> {
        let tables = self.read()?;
        let all: Vec<Client> = tables.clients.values().map(|r| tables.assemble(r)).collect();
        Ok(page_of(all, request))
    }

    async fn insert_client(&self, client: NewClient) -> RepositoryResult<Client> {
        let mut tables = self.write()?;
        let id = tables.next_id();
        tables.clients.insert(
            id,
            ClientRow {
                id,
                name: client.name,
                email: client.email,
            },
        );
        if let Some(profile) = client.profile {
            tables.set_profile(id, profile);
        }
        for order in client.orders {
            tables.add_order(id, order);
        }
        for coupon in client.coupons {
            tables.add_coupon(id, coupon);
        }
        let row = tables.clients[&id].clone();
        Ok(tables.assemble(&row))
    }

    async fn update_client(
        &self,
        id: i64,
        update: &ClientUpdate,
    ) -> RepositoryResult<Option<Client>> {
        let mut tables = self.write()?;
        let Some(row) = tables.clients.get_mut(&id) else {
            return Ok(None);
        };
        row.name = update.name.clone();
        row.email = update.email.clone();

        if let Some(profile) = &update.profile {
            tables.set_profile(id, profile.clone());
        }
        if let Some(orders) = &update.orders {
            tables.orders.retain(|_, o| o.client_id != id);
            for order in orders {
                tables.add_order(id, order.clone());
            }
        }
        if let Some(coupons) = &update.coupons {
            tables.coupons.retain(|_, c| !c.client_ids.contains(&id));
            for coupon in coupons {
                tables.add_coupon(id, coupon.clone());
            }
        }
        let row = tables.clients[&id].clone();
        Ok(Some(tables.assemble(&row)))
    }

    async fn delete_client(&self, id: i64) -> RepositoryResult<Option<Client>> {
        let mut tables = self.write()?;
        let Some(row) = tables.clients.get(&id).cloned() else {
            return Ok(None);
        };
        let removed = tables.assemble(&row);
        tables.clients.remove(&id);
        tables.profiles.retain(|_, p| p.client_id != id);
        tables.orders.retain(|_, o| o.client_id != id);
        for coupon in tables.coupons.values_mut() {
            coupon.client_ids.retain(|c| *c != id);
        }
        Ok(Some(removed))
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepository {
    async fn find_order(&self, id: i64) -> RepositoryResult<Option<Order>> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    async fn orders_page(&self, request: PageRequest) -> RepositoryResult<Page<Order>> {
        let all: Vec<Order> = self.read()?.orders.values().cloned().collect();
        Ok(page_of(all, request))
    }

    async fn orders_page_by_client(
        &self,
        client_id: i64,
        request: PageRequest,
    ) -> RepositoryResult<Page<Order>> {
        let owned: Vec<Order> = self
            .read()?
            .orders
            .values()
            .filter(|o| o.client_id == client_id)
            .cloned()
            .collect();
        Ok(page_of(owned, request))
    }

    async fn orders_by_filter(
        &self,
        filter: &OrderFilter,
        request: PageRequest,
    ) -> RepositoryResult<Page<Order>> {
        let mut matching: Vec<Order> = self
            .read()?
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        Ok(page_of(matching, request))
    }

    async fn insert_order(&self, client_id: i64, order: NewOrder) -> RepositoryResult<Order> {
        Ok(self.write()?.add_order(client_id, order))
    }

    async fn save_order(&self, id: i64, order: NewOrder) -> RepositoryResult<Option<Order>> {
        let mut tables = self.write()?;
        Ok(tables.orders.get_mut(&id).map(|existing| {
            existing.order_date = order.order_date;
            existing.total_amount = order.total_amount;
            existing.status = order.status;
            existing.clone()
        }))
    }

    async fn delete_order(&self, id: i64) -> RepositoryResult<Option<Order>> {
        Ok(self.write()?.orders.remove(&id))
    }
}

#[async_trait]
impl CouponRepository for InMemoryRepository {
    async fn find_coupon(&self, id: i64) -> RepositoryResult<Option<Coupon>> {
        Ok(self.read()?.coupons.get(&id).cloned())
    }

    async fn coupons_page(&self, request: PageRequest) -> RepositoryResult<Page<Coupon>> {
        let all: Vec<Coupon> = self.read()?.coupons.values().cloned().collect();
        Ok(page_of(all, request))
    }

    async fn coupons_page_by_client(
        &self,
        client_id: i64,
        request: PageRequest,
    ) -> RepositoryResult<Page<Coupon>> {
        let linked: Vec<Coupon> = self
            .read()?
            .coupons
            .values()
            .filter(|c| c.client_ids.contains(&client_id))
            .cloned()
            .collect();
        Ok(page_of(linked, request))
    }

    async fn insert_coupon(&self, client_id: i64, coupon: NewCoupon) -> RepositoryResult<Coupon> {
        Ok(self.write()?.add_coupon(client_id, coupon))
    }

    async fn save_coupon(&self, id: i64, coupon: NewCoupon) -> RepositoryResult<Option<Coupon>> {
        let mut tables = self.write()?;
        Ok(tables.coupons.get_mut(&id).map(|existing| {
            existing.code = coupon.code;
            existing.discount = coupon.discount;
            existing.expiration_date = coupon.expiration_date;
            existing.clone()
        }))
    }

    async fn delete_coupon(&self, id: i64) -> RepositoryResult<Option<Coupon>> {
        Ok(self.write()?.coupons.remove(&id))
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn find_profile(&self, id: i64) -> RepositoryResult<Option<Profile>> {
        Ok(self.read()?.profiles.get(&id).cloned())
    }

    async fn profiles_page(&self, request: PageRequest) -> RepositoryResult<Page<Profile>> {
        let all: Vec<Profile> = self.read()?.profiles.values().cloned().collect();
        Ok(page_of(all, request))
    }

    async fn profile_of_client(&self, client_id: i64) -> RepositoryResult<Option<Profile>> {
        Ok(self
            .read()?
            .profiles
            .values()
            .find(|p| p.client_id == client_id)
            .cloned())
    }

    async fn save_profile(
        &self,
        id: i64,
        data: ProfileData,
    ) -> RepositoryResult<Option<Profile>> {
        let mut tables = self.write()?;
        Ok(tables.profiles.get_mut(&id).map(|existing| {
            existing.address = data.address;
            existing.phone = data.phone;
            existing.clone()
        }))
    }
}

/// Store whose every operation fails
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> storefront_cache::Result<Option<CacheValue>> {
        Err(CacheError::ConnectionError("connection refused".into()))
    }

    async fn set_with_ttl(
        &self,
        _key: CacheKey,
        _value: CacheValue,
        _ttl: Duration,
    ) -> storefront_cache::Result<()> {
        Err(CacheError::ConnectionError("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> storefront_cache::Result<bool> {
        Err(CacheError::ConnectionError("connection refused".into()))
    }

    async fn increment_with_ttl(
        &self,
        _key: &str,
        _amount: i64,
        _ttl: Duration,
    ) -> storefront_cache::Result<i64> {
        Err(CacheError::ConnectionError("connection refused".into()))
    }

    async fn ttl(&self, _key: &str) -> storefront_cache::Result<KeyTtl> {
        Err(CacheError::ConnectionError("connection refused".into()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Memory store that can be switched off, and fails deletes of chosen keys
#[derive(Clone, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    down: Arc<AtomicBool>,
    poisoned: Arc<Mutex<Vec<String>>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Make every delete of `key` fail
    pub fn poison_delete(&self, key: &str) {
        self.poisoned.lock().unwrap().push(key.to_string());
    }

    fn check(&self) -> storefront_cache::Result<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(CacheError::TimeoutError {
                timeout_ms: 2000,
                context: "store offline".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> storefront_cache::Result<Option<CacheValue>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set_with_ttl(
        &self,
        key: CacheKey,
        value: CacheValue,
        ttl: Duration,
    ) -> storefront_cache::Result<()> {
        self.check()?;
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> storefront_cache::Result<bool> {
        self.check()?;
        if self.poisoned.lock().unwrap().iter().any(|k| k == key) {
            return Err(CacheError::ConnectionError("connection reset".into()));
        }
        self.inner.delete(key).await
    }

    async fn increment_with_ttl(
        &self,
        key: &str,
        amount: i64,
        ttl: Duration,
    ) -> storefront_cache::Result<i64> {
        self.check()?;
        self.inner.increment_with_ttl(key, amount, ttl).await
    }

    async fn ttl(&self, key: &str) -> storefront_cache::Result<KeyTtl> {
        self.check()?;
        self.inner.ttl(key).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

pub fn order_on(day: u32, amount: f64, status: OrderStatus) -> NewOrder {
    NewOrder {
        order_date: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
        total_amount: amount,
        status,
    }
}

pub fn coupon(code: &str, discount: f32) -> NewCoupon {
    NewCoupon {
        code: code.to_string(),
        discount,
        expiration_date: Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap(),
    }
}

pub fn new_client(name: &str) -> NewClient {
    NewClient {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        profile: None,
        orders: Vec::new(),
        coupons: Vec::new(),
    }
}
