//! Unit of work: registers entity-state changes against named views and
//! commits them as one atomic batch.
//!
//! Commit runs in two strictly sequential phases:
//! - existence probes for every active change on a unique view, awaited
//!   together, any failure aborting before anything is sent
//! - one batch holding every generated write statement, in registration order
//!
//! A parent never commits its children.


use crate::{
    change::{ChangeSet, EntityState},
    commit::{CommitStrategy, UnitOfWorkType},
    document::Document,
    error::{CommitPhase, Error, ErrorClass, ErrorOrigin},
    key::Identifier,
    session::{BoundStatement, Session, StorageError},
    statement::ViewStatements,
};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::{any::Any, sync::Arc};
use tracing::{debug, info, warn};

///
/// UnitOfWork
///
/// Object-safe surface shared by every unit of work, so that children of
/// different entity types can hang off one parent.
///

#[async_trait]
pub trait UnitOfWork: Any + Send + Sync {
    /// Probe, then submit every registered change as one batch.
    async fn commit(&mut self) -> Result<(), Error>;

    fn rollback(&self) -> Result<(), Error>;

    /// Forget every registration. Committed storage is untouched.
    fn reset(&mut self);

    fn is_root(&self) -> bool;

    fn set_root(&mut self, root: bool);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

///
/// Probe
///
/// Existence check scheduled for one active change on a unique view.
///

struct Probe {
    view: String,
    id: Identifier,
    state: EntityState,
    statement: BoundStatement,
}

impl Probe {
    fn verify(&self, exists: bool) -> Result<(), Error> {
        match (self.state, exists) {
            (EntityState::New, true) => Err(Error::duplicate_item(&self.view, &self.id)),
            (EntityState::Dirty | EntityState::Deleted, false) => Err(Error::item_not_found(
                ErrorOrigin::UnitOfWork,
                &self.view,
                &self.id,
            )),
            _ => Ok(()),
        }
    }
}

///
/// DocumentUnitOfWork
///
/// Unit of work over documents of one entity type. Not meant for concurrent
/// registration; one logical transaction owns one instance.
///

pub struct DocumentUnitOfWork<T> {
    session: Arc<dyn Session>,
    statements: Arc<ViewStatements>,
    change_set: ChangeSet<T>,
    unit_of_work_type: UnitOfWorkType,
    commit_strategy: Box<dyn CommitStrategy>,
    children: Vec<Box<dyn UnitOfWork>>,
    root: bool,
}

impl<T: 'static> DocumentUnitOfWork<T> {
    pub fn new(
        session: Arc<dyn Session>,
        statements: Arc<ViewStatements>,
        unit_of_work_type: UnitOfWorkType,
    ) -> Self {
        let commit_strategy = unit_of_work_type.as_commit_strategy(Arc::clone(&session));

        Self {
            session,
            statements,
            change_set: ChangeSet::new(),
            unit_of_work_type,
            commit_strategy,
            children: Vec::new(),
            root: true,
        }
    }

    /// Replace the commit strategy built from the unit-of-work type.
    #[must_use]
    pub fn with_commit_strategy(mut self, commit_strategy: Box<dyn CommitStrategy>) -> Self {
        self.commit_strategy = commit_strategy;
        self
    }

    #[must_use]
    pub const fn unit_of_work_type(&self) -> UnitOfWorkType {
        self.unit_of_work_type
    }

    #[must_use]
    pub fn statements(&self) -> &ViewStatements {
        &self.statements
    }

    #[must_use]
    pub const fn change_set(&self) -> &ChangeSet<T> {
        &self.change_set
    }

    pub fn register_new(&mut self, view: impl Into<String>, document: Document<T>) {
        self.change_set.register(view, document, EntityState::New);
    }

    pub fn register_dirty(&mut self, view: impl Into<String>, document: Document<T>) {
        self.change_set.register(view, document, EntityState::Dirty);
    }

    pub fn register_deleted(&mut self, view: impl Into<String>, document: Document<T>) {
        self.change_set.register(view, document, EntityState::Deleted);
    }

    /// Record a persisted snapshot for later delta computation. Never
    /// produces a write.
    pub fn register_clean(&mut self, view: impl Into<String>, document: Document<T>) {
        self.change_set.register(view, document, EntityState::Clean);
    }

    /// Clean snapshot for `id` in any view.
    #[must_use]
    pub fn read_clean(&self, id: &Identifier) -> Option<&Document<T>> {
        self.change_set.find_clean(id)
    }

    #[must_use]
    pub fn read_clean_in(&self, view: &str, id: &Identifier) -> Option<&Document<T>> {
        self.change_set.find_clean_in(view, id)
    }

    /// Attach `child` as a non-root unit of work.
    pub fn add_child(&mut self, mut child: Box<dyn UnitOfWork>) {
        child.set_root(false);
        self.children.push(child);
    }

    /// Attach a new child for entity type `U` sharing this session and
    /// unit-of-work type.
    pub fn new_child<U: 'static>(
        &mut self,
        statements: Arc<ViewStatements>,
    ) -> Result<&mut DocumentUnitOfWork<U>, Error> {
        let child = DocumentUnitOfWork::<U>::new(
            Arc::clone(&self.session),
            statements,
            self.unit_of_work_type,
        );
        self.add_child(Box::new(child));
        let index = self.children.len() - 1;

        self.child_mut(index).ok_or_else(|| {
            Error::new(
                ErrorClass::Internal,
                ErrorOrigin::UnitOfWork,
                "new child has an unexpected type",
            )
        })
    }

    /// Typed access to the child at `index`.
    pub fn child_mut<U: 'static>(&mut self, index: usize) -> Option<&mut DocumentUnitOfWork<U>> {
        self.children
            .get_mut(index)?
            .as_any_mut()
            .downcast_mut::<DocumentUnitOfWork<U>>()
    }

    #[must_use]
    pub fn children(&self) -> &[Box<dyn UnitOfWork>] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Box<dyn UnitOfWork>] {
        &mut self.children
    }

    // One write per active change, plus a probe when its view is unique.
    fn plan(&mut self) -> Result<(Vec<Probe>, Vec<BoundStatement>), Error> {
        let mut probes = Vec::new();
        let mut statements = Vec::new();

        for change in self.change_set.changes_mut() {
            let view = change.view().to_string();
            let state = change.state();

            if self.statements.is_view_unique(&view) {
                probes.push(Probe {
                    statement: self.statements.exists(&view, change.id())?,
                    id: change.id().clone(),
                    view: view.clone(),
                    state,
                });
            }

            let statement = match state {
                EntityState::New => self.statements.create(&view, change.document_mut())?,
                EntityState::Dirty => self.statements.update(&view, change.document_mut())?,
                EntityState::Deleted => self.statements.delete(&view, change.id())?,
                EntityState::Clean => continue,
            };
            statements.push(statement);
        }

        Ok((probes, statements))
    }
}

async fn run_probes(session: &dyn Session, probes: &[Probe]) -> Result<(), Error> {
    if probes.is_empty() {
        return Ok(());
    }
    debug!(probes = probes.len(), "probing unique views");

    let checks = probes.iter().map(|probe| async move {
        let result = session.execute(&probe.statement).await.map_err(|err| {
            warn!(view = %probe.view, id = %probe.id, error = %err, "existence probe failed");
            Error::commit(CommitPhase::Probe, err)
        })?;

        let count = result.count().ok_or_else(|| {
            warn!(view = %probe.view, id = %probe.id, "existence check returned no count");
            Error::commit(
                CommitPhase::Probe,
                StorageError::Execution("existence check returned no count".to_string()),
            )
        })?;

        probe.verify(count > 0)
    });
    try_join_all(checks).await?;

    Ok(())
}

#[async_trait]
impl<T: 'static> UnitOfWork for DocumentUnitOfWork<T> {
    async fn commit(&mut self) -> Result<(), Error> {
        let (probes, statements) = self.plan()?;
        let count = statements.len();

        run_probes(self.session.as_ref(), &probes).await?;
        self.commit_strategy.commit(statements).await?;

        info!(statements = count, probes = probes.len(), "unit of work committed");

        Ok(())
    }

    fn rollback(&self) -> Result<(), Error> {
        self.commit_strategy.rollback()
    }

    fn reset(&mut self) {
        self.change_set.reset();
    }

    fn is_root(&self) -> bool {
        self.root
    }

    fn set_root(&mut self, root: bool) {
        self.root = root;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
