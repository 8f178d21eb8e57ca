//! Commit strategies: how a verified write set reaches storage.
//!
//! Contract:
//! - `commit` resolves once the storage engine has applied every statement as
//!   one group, or reports why it did not.
//! - Group atomicity only; isolation from concurrent readers is whatever the
//!   storage engine provides.
//! - `rollback` is strategy-specific.

mod batch;


use crate::{
    error::Error,
    session::{BatchType, BoundStatement, Session},
};
use async_trait::async_trait;
use helenusdb_config::UnitOfWorkMode;
use std::sync::Arc;

pub use batch::BatchCommitStrategy;

///
/// CommitStrategy
///

#[async_trait]
pub trait CommitStrategy: Send + Sync {
    /// Submit `statements` as one atomic group.
    async fn commit(&self, statements: Vec<BoundStatement>) -> Result<(), Error>;

    fn rollback(&self) -> Result<(), Error>;
}

///
/// UnitOfWorkType
///
/// Selects the commit strategy a unit of work submits through.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum UnitOfWorkType {
    #[default]
    Logged,
    Unlogged,
}

impl UnitOfWorkType {
    #[must_use]
    pub const fn batch_type(self) -> BatchType {
        match self {
            Self::Logged => BatchType::Logged,
            Self::Unlogged => BatchType::Unlogged,
        }
    }

    #[must_use]
    pub fn as_commit_strategy(self, session: Arc<dyn Session>) -> Box<dyn CommitStrategy> {
        Box::new(BatchCommitStrategy::new(session, self.batch_type()))
    }
}

impl From<UnitOfWorkMode> for UnitOfWorkType {
    fn from(mode: UnitOfWorkMode) -> Self {
        match mode {
            UnitOfWorkMode::Logged => Self::Logged,
            UnitOfWorkMode::Unlogged => Self::Unlogged,
        }
    }
}
