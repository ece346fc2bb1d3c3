//! Storefront services with cache-aside reads and deferred invalidation
//!
//! Each service pairs its repositories with a [`CacheStrategy`]. Reads go
//! through the strategy; writes persist first, then describe the change as a
//! [`Mutation`](crate::invalidation::Mutation) that the strategy applies once
//! the caller's [`UnitOfWork`](crate::invalidation::UnitOfWork) commits.
//!
//! [`CacheStrategy`]: crate::cache::CacheStrategy

pub mod client;
pub mod coupon;
pub mod order;
pub mod profile;

use crate::cache::namespace::Resource;
use crate::schema::repository::RepositoryError;
use thiserror::Error;

pub use client::ClientService;
pub use coupon::CouponService;
pub use order::OrderService;
pub use profile::ProfileService;

/// Errors returned by the storefront services
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{resource} {id} not found")]
    NotFound { resource: Resource, id: i64 },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub fn not_found(resource: Resource, id: i64) -> Self {
        ServiceError::NotFound { resource, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
