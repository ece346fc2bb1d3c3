//! Names of cached entity collections and versioned page views

use crate::cache::keys::{FilterSignature, PageFilter};
use crate::cache::types::TtlClass;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource kinds whose single entities are cached by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Client,
    Order,
    Coupon,
    Profile,
}

impl Resource {
    /// All resources in a stable order
    pub const ALL: [Resource; 4] = [
        Resource::Client,
        Resource::Order,
        Resource::Coupon,
        Resource::Profile,
    ];

    /// Entity key collection, e.g. `client` in `client:id:7`
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Client => "client",
            Resource::Order => "order",
            Resource::Coupon => "coupon",
            Resource::Profile => "profile",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "client" | "clients" => Ok(Resource::Client),
            "order" | "orders" => Ok(Resource::Order),
            "coupon" | "coupons" => Ok(Resource::Coupon),
            "profile" | "profiles" => Ok(Resource::Profile),
            other => Err(format!("unknown resource: {}", other)),
        }
    }
}

/// Versioned collection views; each owns one counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum View {
    Clients,
    Profiles,
    Coupons,
    CouponsByClient,
    Orders,
    OrdersByClient,
    OrdersByStatus,
}

impl View {
    /// All views in a stable order
    pub const ALL: [View; 7] = [
        View::Clients,
        View::Profiles,
        View::Coupons,
        View::CouponsByClient,
        View::Orders,
        View::OrdersByClient,
        View::OrdersByStatus,
    ];

    /// Collection name used for the counter and page keys
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Clients => "clients",
            View::Profiles => "profiles",
            View::Coupons => "coupons",
            View::CouponsByClient => "coupons:byClient",
            View::Orders => "orders",
            View::OrdersByClient => "orders:byClient",
            View::OrdersByStatus => "orders:byStatus",
        }
    }

    /// Resource whose entities the view lists
    pub fn resource(&self) -> Resource {
        match self {
            View::Clients => Resource::Client,
            View::Profiles => Resource::Profile,
            View::Coupons | View::CouponsByClient => Resource::Coupon,
            View::Orders | View::OrdersByClient | View::OrdersByStatus => Resource::Order,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL
            .iter()
            .copied()
            .find(|view| view.as_str() == s)
            .ok_or_else(|| format!("unknown view: {}", s))
    }
}

/// Restricts a per-client view to one owner
///
/// Per-client views are plain pages of a single owner, so they keep the
/// regular page TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientScope {
    pub client_id: i64,
}

impl ClientScope {
    pub fn new(client_id: i64) -> Self {
        Self { client_id }
    }
}

impl PageFilter for ClientScope {
    fn signature(&self) -> String {
        FilterSignature::new()
            .field("client", Some(self.client_id))
            .build()
    }

    fn ttl_class(&self) -> TtlClass {
        TtlClass::Page
    }
}
