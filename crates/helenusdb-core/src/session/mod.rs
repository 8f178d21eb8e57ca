//! Storage session contract.
//!
//! The session is owned by the caller and shared by every statement factory
//! and unit of work built on it. Preparation is synchronous; execution and
//! batch submission are asynchronous.

mod memory;
mod result;
mod statement;


use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error as ThisError;

pub use memory::{FailurePoint, MemorySession};
pub use result::{PagingState, ResultSet, Row};
pub use statement::{
    Batch, BatchType, BoundStatement, PreparedStatement, StatementKind, StatementSpec,
};

/// Column carrying the outcome of a conditional write.
pub const APPLIED_COLUMN: &str = "[applied]";

/// Column carrying the row count of an existence probe.
pub const COUNT_COLUMN: &str = "count";

///
/// Session
///

#[async_trait]
pub trait Session: Send + Sync {
    /// Prepare a statement. Callers cache the result; every call may hit
    /// the storage engine.
    fn prepare(&self, spec: StatementSpec) -> Result<Arc<PreparedStatement>, StorageError>;

    async fn execute(&self, statement: &BoundStatement) -> Result<ResultSet, StorageError>;

    /// Apply every statement in `batch` as one group.
    async fn execute_batch(&self, batch: &Batch) -> Result<ResultSet, StorageError>;
}

///
/// StorageError
///
/// Failures reported by the storage engine.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum StorageError {
    #[error("bind failed: expected {expected} values, found {found}")]
    Bind { expected: usize, found: usize },

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("prepare failed: {0}")]
    Prepare(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
