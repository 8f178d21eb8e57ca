use crate::{
    commit::CommitStrategy,
    error::{CommitPhase, Error},
    session::{Batch, BatchType, BoundStatement, Session},
};
use async_trait::async_trait;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{debug, warn};

///
/// BatchCommitStrategy
///
/// Submits the write set as a single storage batch. An applied batch is
/// durable, so rollback is only meaningful while no batch has been applied
/// or left in an unknown state.
///

pub struct BatchCommitStrategy {
    session: Arc<dyn Session>,
    batch_type: BatchType,
    submitted: AtomicBool,
}

impl BatchCommitStrategy {
    pub fn new(session: Arc<dyn Session>, batch_type: BatchType) -> Self {
        Self {
            session,
            batch_type,
            submitted: AtomicBool::new(false),
        }
    }

    pub fn logged(session: Arc<dyn Session>) -> Self {
        Self::new(session, BatchType::Logged)
    }

    #[must_use]
    pub const fn batch_type(&self) -> BatchType {
        self.batch_type
    }

    /// True once a batch was applied, or its submission failed with an
    /// unknown outcome. Rejected conditional batches do not count.
    #[must_use]
    pub fn has_submitted(&self) -> bool {
        self.submitted.load(Ordering::Acquire)
    }
}

#[async_trait]
impl CommitStrategy for BatchCommitStrategy {
    async fn commit(&self, statements: Vec<BoundStatement>) -> Result<(), Error> {
        if statements.is_empty() {
            return Ok(());
        }

        let mut batch = Batch::new(self.batch_type);
        batch.extend(statements);
        let count = batch.len();

        debug!(statements = count, batch_type = %self.batch_type, "submitting batch");

        // a failed submission may still have applied; a rejected one did not
        let result = self.session.execute_batch(&batch).await.map_err(|err| {
            self.submitted.store(true, Ordering::Release);
            warn!(statements = count, error = %err, "batch submission failed");
            Error::commit(CommitPhase::Submit, err)
        })?;

        if !result.was_applied() {
            warn!(statements = count, "conditional batch was not applied");
            return Err(Error::commit_not_applied(count));
        }
        self.submitted.store(true, Ordering::Release);

        Ok(())
    }

    fn rollback(&self) -> Result<(), Error> {
        if self.has_submitted() {
            warn!("rollback requested after batch submission");
            return Err(Error::rollback(
                "batch already submitted; applied batches cannot be rolled back",
            ));
        }

        Ok(())
    }
}
