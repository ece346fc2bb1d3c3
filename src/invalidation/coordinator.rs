//! Mutation → invalidation plan table and plan execution

use crate::cache::backend::KeyValueStore;
use crate::cache::keys::CacheKeyBuilder;
use crate::cache::namespace::{Resource, View};
use crate::cache::version::VersionStore;
use crate::invalidation::deferred::{CommitDeferredExecutor, UnitOfWork};
use crate::invalidation::mutation::{Action, Mutation, SubCollection};
use crate::invalidation::plan::{ApplyReport, InvalidationPlan};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ORDER_VIEWS: [View; 3] = [View::Orders, View::OrdersByClient, View::OrdersByStatus];
const COUPON_VIEWS: [View; 2] = [View::Coupons, View::CouponsByClient];

/// Compute the plan for a mutation
///
/// Pure function of the descriptor. Related ids of resources the mutation
/// cannot reach are ignored.
pub fn plan_for(keys: &CacheKeyBuilder, mutation: &Mutation) -> InvalidationPlan {
    let mut plan = InvalidationPlan::new();
    let primary = mutation.kind.resource;

    if mutation.kind.action != Action::Added {
        plan.evict(keys.entity_key(primary.as_str(), mutation.primary_id));
    }

    let reachable: Vec<Resource> = match primary {
        Resource::Client => {
            plan.bump(View::Clients.as_str());

            let mut reachable = Vec::new();
            for sub in &mutation.touched {
                match sub {
                    SubCollection::Profile => {
                        plan.bump(View::Profiles.as_str());
                    }
                    SubCollection::Orders => {
                        for view in ORDER_VIEWS {
                            plan.bump(view.as_str());
                        }
                    }
                    SubCollection::Coupons => {
                        for view in COUPON_VIEWS {
                            plan.bump(view.as_str());
                        }
                    }
                }
                reachable.push(sub.resource());
            }
            reachable
        }
        Resource::Order => {
            for view in ORDER_VIEWS {
                plan.bump(view.as_str());
            }
            plan.bump(View::Clients.as_str());
            vec![Resource::Client]
        }
        Resource::Coupon => {
            for view in COUPON_VIEWS {
                plan.bump(view.as_str());
            }
            plan.bump(View::Clients.as_str());
            vec![Resource::Client]
        }
        Resource::Profile => {
            plan.bump(View::Profiles.as_str());
            plan.bump(View::Clients.as_str());
            vec![Resource::Client]
        }
    };

    for related in &mutation.related {
        if reachable.contains(&related.resource) {
            plan.evict(keys.entity_key(related.resource.as_str(), related.id));
        } else {
            debug!(
                "Ignoring unreachable related entity {} for {}",
                related, mutation.kind
            );
        }
    }

    plan
}

/// Applies invalidation plans against the shared store
#[derive(Clone)]
pub struct InvalidationCoordinator {
    store: Arc<dyn KeyValueStore>,
    versions: VersionStore,
    keys: CacheKeyBuilder,
    executor: CommitDeferredExecutor,
}

impl InvalidationCoordinator {
    pub fn new(store: Arc<dyn KeyValueStore>, versions: VersionStore, keys: CacheKeyBuilder) -> Self {
        Self {
            store,
            versions,
            keys,
            executor: CommitDeferredExecutor::new(),
        }
    }

    /// Plan for `mutation` using this coordinator's key format
    pub fn plan_for(&self, mutation: &Mutation) -> InvalidationPlan {
        plan_for(&self.keys, mutation)
    }

    /// Perform every bump and eviction of `plan`
    ///
    /// A failed step is logged and recorded; the remaining steps still run.
    pub async fn apply(&self, plan: &InvalidationPlan) -> ApplyReport {
        let mut report = ApplyReport::default();

        for name in &plan.version_bumps {
            match self.versions.bump(name).await {
                Ok(version) => report.bumped.push((name.clone(), version)),
                Err(e) => {
                    warn!("Version bump of {} failed: {}", name, e);
                    report.fail(name.as_str(), e);
                }
            }
        }

        for key in &plan.entity_evictions {
            match self.store.delete(key).await {
                Ok(_) => report.evicted += 1,
                Err(e) => {
                    warn!("Eviction of {} failed: {}", key, e);
                    report.fail(key.as_str(), e);
                }
            }
        }

        if report.is_complete() {
            debug!("Applied plan: {}", plan);
        } else {
            warn!(
                "Applied plan with {} failed steps: {}",
                report.failures.len(),
                plan
            );
        }
        report
    }

    /// Plan `mutation` and apply it after `uow` commits, or now without one
    pub async fn submit(&self, uow: Option<&mut UnitOfWork>, mutation: &Mutation) {
        let plan = self.plan_for(mutation);
        if plan.is_empty() {
            return;
        }

        info!("Invalidation for {} #{}: {}", mutation.kind, mutation.primary_id, plan);
        let coordinator = self.clone();
        self.executor
            .run(uow, async move {
                coordinator.apply(&plan).await;
            })
            .await;
    }
}
