//! Commit-deferred execution of invalidation side effects
//!
//! A [`UnitOfWork`] is the explicit transaction scope of one request. The
//! caller owns it, passes `Option<&mut UnitOfWork>` down the call chain and
//! finally commits or rolls it back. Actions registered while it is active
//! run only after a successful commit; with no unit of work they run
//! immediately.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A side effect waiting for its unit of work to commit
pub type DeferredAction = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Lifecycle of a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfWorkStatus {
    /// Accepting deferred actions
    Active,
    /// Committed; deferred actions have run
    Committed,
    /// Aborted; deferred actions were discarded
    RolledBack,
}

/// Transaction scope collecting post-commit actions
///
/// Dropping an active unit of work counts as an abort.
pub struct UnitOfWork {
    id: Uuid,
    started_at: DateTime<Utc>,
    status: UnitOfWorkStatus,
    pending: Vec<DeferredAction>,
}

impl UnitOfWork {
    /// Open a new unit of work
    pub fn begin() -> Self {
        let id = Uuid::new_v4();
        debug!("Unit of work {} started", id);
        Self {
            id,
            started_at: Utc::now(),
            status: UnitOfWorkStatus::Active,
            pending: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn status(&self) -> UnitOfWorkStatus {
        self.status
    }

    /// Number of actions waiting for commit
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Register `action` to run after a successful commit
    pub fn run_after_commit<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.push(Box::pin(action));
    }

    /// Commit and run every deferred action in registration order
    ///
    /// Returns the number of actions run.
    pub async fn commit(mut self) -> usize {
        let actions = std::mem::take(&mut self.pending);
        self.status = UnitOfWorkStatus::Committed;

        let count = actions.len();
        for action in actions {
            action.await;
        }

        info!("Unit of work {} committed ({} deferred actions)", self.id, count);
        count
    }

    /// Abort and discard every deferred action
    ///
    /// Returns the number of actions discarded.
    pub fn rollback(mut self) -> usize {
        let discarded = std::mem::take(&mut self.pending).len();
        self.status = UnitOfWorkStatus::RolledBack;
        info!(
            "Unit of work {} rolled back ({} deferred actions discarded)",
            self.id, discarded
        );
        discarded
    }

    /// Commit when `outcome` is `Ok`, roll back otherwise, and pass it through
    pub async fn finish<T, E>(self, outcome: Result<T, E>) -> Result<T, E> {
        match outcome {
            Ok(value) => {
                self.commit().await;
                Ok(value)
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.status == UnitOfWorkStatus::Active && !self.pending.is_empty() {
            warn!(
                "Unit of work {} dropped without commit; {} deferred actions discarded",
                self.id,
                self.pending.len()
            );
        }
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("started_at", &self.started_at)
            .field("status", &self.status)
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Runs side effects after commit, or right away without a unit of work
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitDeferredExecutor;

impl CommitDeferredExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Defer `action` into `uow`, or await it before returning when `uow`
    /// is `None`
    pub async fn run<F>(&self, uow: Option<&mut UnitOfWork>, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match uow {
            Some(uow) => {
                debug!("Deferring action until unit of work {} commits", uow.id());
                uow.run_after_commit(action);
            }
            None => action.await,
        }
    }
}
