//! Transaction-aware invalidation of cached entities and page views
//!
//! Writers describe what changed with a [`Mutation`]. The
//! [`InvalidationCoordinator`] turns it into an [`InvalidationPlan`] from a
//! single static table and applies the plan through the
//! [`CommitDeferredExecutor`], so nothing is invalidated before the
//! surrounding [`UnitOfWork`] commits.

pub mod coordinator;
pub mod deferred;
pub mod mutation;
pub mod plan;

pub use coordinator::{plan_for, InvalidationCoordinator};
pub use deferred::{CommitDeferredExecutor, DeferredAction, UnitOfWork, UnitOfWorkStatus};
pub use mutation::{Action, EntityRef, Mutation, MutationKind, SubCollection};
pub use plan::{ApplyFailure, ApplyReport, InvalidationPlan};
