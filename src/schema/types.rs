//! Type definitions for storefront entities and write payloads

use crate::cache::keys::{FilterSignature, PageFilter};
use crate::cache::types::TtlClass;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order was placed
    New,
    /// Payment was received
    Paid,
    /// Order left the warehouse
    Shipped,
    /// Order reached the client
    Delivered,
    /// Order was cancelled
    Cancelled,
}

impl OrderStatus {
    /// Convert status to its canonical string
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parse status from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NEW" => Some(OrderStatus::New),
            "PAID" => Some(OrderStatus::Paid),
            "SHIPPED" => Some(OrderStatus::Shipped),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" | "CANCELED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Client contact details, one per client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub address: String,
    pub phone: String,
    pub client_id: i64,
}

/// An order placed by exactly one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_date: DateTime<Utc>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub client_id: i64,
}

/// A discount coupon linked to any number of clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    /// Discount in percent
    pub discount: f32,
    pub expiration_date: DateTime<Utc>,
    pub client_ids: Vec<i64>,
}

/// Client aggregate as served by the client endpoints
///
/// Embeds its profile, orders and coupons, so mutations of any of them must
/// evict the client entry too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub registration_date: DateTime<Utc>,
    pub profile: Option<Profile>,
    pub orders: Vec<Order>,
    pub coupons: Vec<Coupon>,
}

impl Client {
    pub fn order_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.orders.iter().map(|o| o.id)
    }

    pub fn coupon_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.coupons.iter().map(|c| c.id)
    }
}

/// Address and phone of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    pub address: String,
    pub phone: String,
}

/// Payload for creating or replacing an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_date: DateTime<Utc>,
    pub total_amount: f64,
    pub status: OrderStatus,
}

/// Payload for creating or replacing a coupon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub discount: f32,
    pub expiration_date: DateTime<Utc>,
}

/// Payload for creating a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub profile: Option<ProfileData>,
    #[serde(default)]
    pub orders: Vec<NewOrder>,
    #[serde(default)]
    pub coupons: Vec<NewCoupon>,
}

/// Payload for updating a client
///
/// `None` sub-collections are left untouched; `Some` replaces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientUpdate {
    pub name: String,
    pub email: String,
    pub profile: Option<ProfileData>,
    pub orders: Option<Vec<NewOrder>>,
    pub coupons: Option<Vec<NewCoupon>>,
}

/// Order search criteria; absent fields do not constrain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

impl OrderFilter {
    /// Filter on status alone
    pub fn by_status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Only a status is set; such filters are cacheable
    pub fn is_status_only(&self) -> bool {
        self.status.is_some()
            && self.from_date.is_none()
            && self.to_date.is_none()
            && self.min_amount.is_none()
            && self.max_amount.is_none()
    }

    /// Whether `order` satisfies every present criterion
    pub fn matches(&self, order: &Order) -> bool {
        self.status.map_or(true, |s| order.status == s)
            && self.from_date.map_or(true, |d| order.order_date >= d)
            && self.to_date.map_or(true, |d| order.order_date <= d)
            && self.min_amount.map_or(true, |a| order.total_amount >= a)
            && self.max_amount.map_or(true, |a| order.total_amount <= a)
    }
}

impl PageFilter for OrderFilter {
    fn signature(&self) -> String {
        FilterSignature::new()
            .field("status", self.status.map(|s| s.as_str()))
            .field("from", self.from_date.map(|d| d.to_rfc3339()))
            .field("to", self.to_date.map(|d| d.to_rfc3339()))
            .field("minAmount", self.min_amount)
            .field("maxAmount", self.max_amount)
            .field("sort", Some("orderDate,DESC"))
            .build()
    }

    fn ttl_class(&self) -> TtlClass {
        TtlClass::DerivedPage
    }
}
