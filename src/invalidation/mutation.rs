//! Mutation descriptors submitted after a write

use crate::cache::namespace::Resource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// What happened to the primary entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Added,
    Updated,
    Deleted,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Added => write!(f, "added"),
            Action::Updated => write!(f, "updated"),
            Action::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "added" | "add" => Ok(Action::Added),
            "updated" | "update" => Ok(Action::Updated),
            "deleted" | "delete" => Ok(Action::Deleted),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

/// Resource and action of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutationKind {
    pub resource: Resource,
    pub action: Action,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.resource, self.action)
    }
}

/// Sub-collections embedded in a client that a client mutation may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubCollection {
    Profile,
    Orders,
    Coupons,
}

impl SubCollection {
    /// Resource whose entities live in this sub-collection
    pub fn resource(&self) -> Resource {
        match self {
            SubCollection::Profile => Resource::Profile,
            SubCollection::Orders => Resource::Order,
            SubCollection::Coupons => Resource::Coupon,
        }
    }
}

impl FromStr for SubCollection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "profile" | "profiles" => Ok(SubCollection::Profile),
            "order" | "orders" => Ok(SubCollection::Orders),
            "coupon" | "coupons" => Ok(SubCollection::Coupons),
            other => Err(format!("unknown sub-collection: {}", other)),
        }
    }
}

/// Reference to a single cached entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub resource: Resource,
    pub id: i64,
}

impl EntityRef {
    pub fn new(resource: Resource, id: i64) -> Self {
        Self { resource, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.id)
    }
}

impl FromStr for EntityRef {
    type Err = String;

    /// Parses `resource:id`, e.g. `client:7`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, id) = s
            .split_once(':')
            .ok_or_else(|| format!("expected resource:id, got {}", s))?;
        let id = id
            .parse::<i64>()
            .map_err(|_| format!("invalid id in {}", s))?;
        Ok(Self::new(resource.parse()?, id))
    }
}

/// Signal that a write happened and which cached data it affects
///
/// ```
/// use storefront_cache::invalidation::{Mutation, SubCollection};
///
/// let mutation = Mutation::client_updated(7)
///     .touching(SubCollection::Orders)
///     .evicting_order(31);
///
/// assert!(mutation.touches(SubCollection::Orders));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    pub kind: MutationKind,
    pub primary_id: i64,
    pub touched: BTreeSet<SubCollection>,
    pub related: BTreeSet<EntityRef>,
}

impl Mutation {
    pub fn new(resource: Resource, action: Action, primary_id: i64) -> Self {
        Self {
            kind: MutationKind { resource, action },
            primary_id,
            touched: BTreeSet::new(),
            related: BTreeSet::new(),
        }
    }

    pub fn client_added(client_id: i64) -> Self {
        Self::new(Resource::Client, Action::Added, client_id)
    }

    pub fn client_updated(client_id: i64) -> Self {
        Self::new(Resource::Client, Action::Updated, client_id)
    }

    pub fn client_deleted(client_id: i64) -> Self {
        Self::new(Resource::Client, Action::Deleted, client_id)
    }

    /// Order mutation owned by `client_id`
    pub fn order(action: Action, order_id: i64, client_id: i64) -> Self {
        Self::new(Resource::Order, action, order_id).evicting(Resource::Client, client_id)
    }

    /// Coupon mutation linked to `client_ids`
    pub fn coupon(action: Action, coupon_id: i64, client_ids: impl IntoIterator<Item = i64>) -> Self {
        client_ids
            .into_iter()
            .fold(Self::new(Resource::Coupon, action, coupon_id), |m, id| {
                m.evicting(Resource::Client, id)
            })
    }

    /// Profile mutation owned by `client_id`
    pub fn profile(action: Action, profile_id: i64, client_id: i64) -> Self {
        Self::new(Resource::Profile, action, profile_id).evicting(Resource::Client, client_id)
    }

    /// Mark an embedded sub-collection as changed
    pub fn touching(mut self, sub: SubCollection) -> Self {
        self.touched.insert(sub);
        self
    }

    /// Request eviction of a related entity
    pub fn evicting(mut self, resource: Resource, id: i64) -> Self {
        self.related.insert(EntityRef::new(resource, id));
        self
    }

    pub fn evicting_order(self, order_id: i64) -> Self {
        self.evicting(Resource::Order, order_id)
    }

    pub fn evicting_coupon(self, coupon_id: i64) -> Self {
        self.evicting(Resource::Coupon, coupon_id)
    }

    pub fn evicting_profile(self, profile_id: i64) -> Self {
        self.evicting(Resource::Profile, profile_id)
    }

    pub fn touches(&self, sub: SubCollection) -> bool {
        self.touched.contains(&sub)
    }

    /// Related ids of one resource
    pub fn related_ids(&self, resource: Resource) -> impl Iterator<Item = i64> + '_ {
        self.related
            .iter()
            .filter(move |r| r.resource == resource)
            .map(|r| r.id)
    }
}
