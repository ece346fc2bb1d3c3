//! Persistence contracts behind the storefront services
//!
//! Storage is owned by the host application. Pages are ordered by id
//! ascending unless a method says otherwise.

use crate::cache::types::{Page, PageRequest};
use crate::schema::types::{
    Client, ClientUpdate, Coupon, NewClient, NewCoupon, NewOrder, Order, OrderFilter, Profile,
    ProfileData,
};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by repository implementations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Backing storage could not be reached
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// Write rejected by a constraint
    #[error("Repository conflict: {0}")]
    Conflict(String),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn find_client(&self, id: i64) -> RepositoryResult<Option<Client>>;

    async fn client_exists(&self, id: i64) -> RepositoryResult<bool>;

    async fn clients_page(&self, request: PageRequest) -> RepositoryResult<Page<Client>>;

    /// Persist a client together with its embedded profile, orders and coupons
    async fn insert_client(&self, client: NewClient) -> RepositoryResult<Client>;

    /// Apply `update`; `None` when the client does not exist
    async fn update_client(
        &self,
        id: i64,
        update: &ClientUpdate,
    ) -> RepositoryResult<Option<Client>>;

    /// Remove a client and its owned rows, returning what was removed
    async fn delete_client(&self, id: i64) -> RepositoryResult<Option<Client>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_order(&self, id: i64) -> RepositoryResult<Option<Order>>;

    async fn orders_page(&self, request: PageRequest) -> RepositoryResult<Page<Order>>;

    async fn orders_page_by_client(
        &self,
        client_id: i64,
        request: PageRequest,
    ) -> RepositoryResult<Page<Order>>;

    /// Orders matching `filter`, newest order date first
    async fn orders_by_filter(
        &self,
        filter: &OrderFilter,
        request: PageRequest,
    ) -> RepositoryResult<Page<Order>>;

    async fn insert_order(&self, client_id: i64, order: NewOrder) -> RepositoryResult<Order>;

    async fn save_order(&self, id: i64, order: NewOrder) -> RepositoryResult<Option<Order>>;

    async fn delete_order(&self, id: i64) -> RepositoryResult<Option<Order>>;
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn find_coupon(&self, id: i64) -> RepositoryResult<Option<Coupon>>;

    async fn coupons_page(&self, request: PageRequest) -> RepositoryResult<Page<Coupon>>;

    async fn coupons_page_by_client(
        &self,
        client_id: i64,
        request: PageRequest,
    ) -> RepositoryResult<Page<Coupon>>;

    /// Create a coupon linked to `client_id`
    async fn insert_coupon(&self, client_id: i64, coupon: NewCoupon) -> RepositoryResult<Coupon>;

    async fn save_coupon(&self, id: i64, coupon: NewCoupon) -> RepositoryResult<Option<Coupon>>;

    /// Remove a coupon and its client links, returning the coupon as it was
    async fn delete_coupon(&self, id: i64) -> RepositoryResult<Option<Coupon>>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, id: i64) -> RepositoryResult<Option<Profile>>;

    async fn profiles_page(&self, request: PageRequest) -> RepositoryResult<Page<Profile>>;

    async fn profile_of_client(&self, client_id: i64) -> RepositoryResult<Option<Profile>>;

    async fn save_profile(
        &self,
        id: i64,
        data: ProfileData,
    ) -> RepositoryResult<Option<Profile>>;
}
