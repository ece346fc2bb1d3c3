//! Storefront schema
//!
//! Entities served by the services (clients with their profile, orders and
//! coupons), their write payloads and the repository traits that persist them.

pub mod repository;
pub mod types;

pub use repository::{
    ClientRepository, CouponRepository, OrderRepository, ProfileRepository, RepositoryError,
    RepositoryResult,
};
pub use types::{
    Client, ClientUpdate, Coupon, NewClient, NewCoupon, NewOrder, Order, OrderFilter, OrderStatus,
    Profile, ProfileData,
};
