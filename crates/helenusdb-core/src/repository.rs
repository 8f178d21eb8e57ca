//! Entity-level persistence over a primary table and its views.
//!
//! Every write runs through its own [`DocumentUnitOfWork`], so a create,
//! update, or delete touches all views in one batch or none of them.

use crate::{
    codec::ObjectCodec,
    commit::UnitOfWorkType,
    document::{Document, DocumentFactory, DocumentObserver},
    error::{Error, ErrorOrigin},
    key::{Identifier, PropertyAccess},
    schema::SchemaWriter,
    session::{PagingState, Row, Session, StorageError},
    statement::ViewStatements,
    table::PrimaryTable,
    unit_of_work::{DocumentUnitOfWork, UnitOfWork},
    value::Value,
};
use helenusdb_config::Config;
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

///
/// Page
///
/// One page of a partition read. `cursor` resumes the read where this page
/// stopped and is `None` on the last page.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page<T> {
    items: Vec<T>,
    cursor: Option<PagingState>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    #[must_use]
    pub const fn cursor(&self) -> Option<&PagingState> {
        self.cursor.as_ref()
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

///
/// DocumentRepository
///

pub struct DocumentRepository<T> {
    session: Arc<dyn Session>,
    primary: PrimaryTable,
    statements: Arc<ViewStatements>,
    documents: BTreeMap<String, DocumentFactory<T>>,
    observers: Vec<Arc<dyn DocumentObserver<T>>>,
    unit_of_work_type: UnitOfWorkType,
}

impl<T: PropertyAccess + 'static> DocumentRepository<T> {
    pub fn new(
        session: Arc<dyn Session>,
        primary: PrimaryTable,
        codec: Arc<dyn ObjectCodec<T>>,
        unit_of_work_type: UnitOfWorkType,
    ) -> Self {
        let statements = Arc::new(ViewStatements::for_primary(&session, &primary));
        let documents = primary
            .tables()
            .map(|table| {
                (
                    table.name().to_string(),
                    DocumentFactory::for_table(table, Arc::clone(&codec)),
                )
            })
            .collect();

        Self {
            session,
            primary,
            statements,
            documents,
            observers: Vec::new(),
            unit_of_work_type,
        }
    }

    /// Observers run in registration order.
    #[must_use]
    pub fn with_document_observer(mut self, observer: Arc<dyn DocumentObserver<T>>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Repository with keyspace, table TTLs, and batch type taken from
    /// `config`.
    pub fn from_config(
        session: Arc<dyn Session>,
        primary: PrimaryTable,
        codec: Arc<dyn ObjectCodec<T>>,
        config: &Config,
    ) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self::new(
            session,
            primary.configure(config),
            codec,
            config.unit_of_work.into(),
        ))
    }

    #[must_use]
    pub const fn primary(&self) -> &PrimaryTable {
        &self.primary
    }

    #[must_use]
    pub fn statements(&self) -> &ViewStatements {
        &self.statements
    }

    /// Fresh root unit of work over this repository's views.
    #[must_use]
    pub fn unit_of_work(&self) -> DocumentUnitOfWork<T> {
        DocumentUnitOfWork::new(
            Arc::clone(&self.session),
            Arc::clone(&self.statements),
            self.unit_of_work_type,
        )
    }

    fn documents(&self, view: &str) -> Result<&DocumentFactory<T>, Error> {
        self.documents
            .get(view)
            .ok_or_else(|| Error::unknown_view(view))
    }

    /// One document per table, in table-name order.
    pub fn as_documents(&self, entity: &T) -> Result<Vec<(String, Document<T>)>, Error> {
        self.documents
            .iter()
            .map(|(view, factory)| {
                let mut document = factory.as_document(entity)?;
                for observer in &self.observers {
                    observer.after_encode(view, &mut document);
                }

                Ok((view.clone(), document))
            })
            .collect()
    }

    fn decode(&self, view: &str, documents: &DocumentFactory<T>, row: &Row) -> Result<Document<T>, Error> {
        let mut document = documents.from_row(row)?;
        for observer in &self.observers {
            observer.before_decode(view, &mut document);
        }

        Ok(document)
    }

    /// Insert `entity` into every view. Fails with a duplicate-item error if
    /// any unique view already holds its identifier.
    pub async fn create(&self, entity: &T) -> Result<(), Error> {
        let mut uow = self.unit_of_work();
        for (view, document) in self.as_documents(entity)? {
            uow.register_new(view, document);
        }

        uow.commit().await
    }

    /// Rewrite `entity`, previously stored as `original`. Views whose
    /// identifier changed get a delete of the old row and an insert of the
    /// new one.
    pub async fn update(&self, entity: &T, original: &T) -> Result<(), Error> {
        let mut uow = self.unit_of_work();
        let current = self.as_documents(entity)?;
        let previous = self.as_documents(original)?;

        for ((view, document), (_, old)) in current.into_iter().zip(previous) {
            if document.identifier() == old.identifier() {
                uow.register_dirty(view, document);
            } else {
                debug!(view = %view, from = %old.identifier(), to = %document.identifier(), "identifier moved");
                uow.register_deleted(view.clone(), old);
                uow.register_new(view, document);
            }
        }

        uow.commit().await
    }

    /// Remove `entity` from every view.
    pub async fn delete(&self, entity: &T) -> Result<(), Error> {
        let mut uow = self.unit_of_work();
        for (view, document) in self.as_documents(entity)? {
            uow.register_deleted(view, document);
        }

        uow.commit().await
    }

    /// Read through the primary table.
    pub async fn read(&self, id: &Identifier) -> Result<T, Error> {
        self.read_in(self.primary.table().name(), id).await
    }

    pub async fn read_in(&self, view: &str, id: &Identifier) -> Result<T, Error> {
        let document = self.read_document_in(view, id).await?;

        self.documents(view)?.as_entity(&document)
    }

    pub async fn read_document_in(&self, view: &str, id: &Identifier) -> Result<Document<T>, Error> {
        let documents = self.documents(view)?;
        let statement = self.statements.read(view, id)?;
        let result = self
            .session
            .execute(&statement)
            .await
            .map_err(|err| Error::storage(ErrorOrigin::Repository, err))?;

        match result.one() {
            Some(row) => self.decode(view, documents, row),
            None => Err(Error::item_not_found(ErrorOrigin::Repository, view, id)),
        }
    }

    /// Every entity of `view` whose key starts with `prefix`, in clustering
    /// order.
    pub async fn read_all(&self, view: &str, prefix: &[Value]) -> Result<Vec<T>, Error> {
        let documents = self.documents(view)?;
        let statement = self.statements.read_all(view, prefix)?;
        let result = self
            .session
            .execute(&statement)
            .await
            .map_err(|err| Error::storage(ErrorOrigin::Repository, err))?;

        result
            .rows()
            .iter()
            .map(|row| documents.as_entity(&self.decode(view, documents, row)?))
            .collect()
    }

    /// At most `limit` entities of `view` whose key starts with `prefix`,
    /// resuming after `cursor` when one is given.
    pub async fn read_all_paged(
        &self,
        view: &str,
        limit: usize,
        cursor: Option<PagingState>,
        prefix: &[Value],
    ) -> Result<Page<T>, Error> {
        if limit == 0 {
            return Err(Error::invalid_argument(
                ErrorOrigin::Repository,
                "page limit must be positive",
            ));
        }

        let documents = self.documents(view)?;
        let statement = self
            .statements
            .read_all(view, prefix)?
            .with_fetch_size(limit)
            .with_paging_state(cursor);
        let result = self
            .session
            .execute(&statement)
            .await
            .map_err(|err| Error::storage(ErrorOrigin::Repository, err))?;

        let items = result
            .rows()
            .iter()
            .map(|row| documents.as_entity(&self.decode(view, documents, row)?))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(view = %view, items = items.len(), more = result.paging_state().is_some(), "page read");

        Ok(Page {
            items,
            cursor: result.paging_state().cloned(),
        })
    }

    pub async fn exists(&self, view: &str, id: &Identifier) -> Result<bool, Error> {
        let statement = self.statements.exists(view, id)?;
        let result = self
            .session
            .execute(&statement)
            .await
            .map_err(|err| Error::storage(ErrorOrigin::Repository, err))?;

        let count = result.count().ok_or_else(|| {
            Error::storage(
                ErrorOrigin::Repository,
                StorageError::Execution("existence check returned no count".to_string()),
            )
        })?;

        Ok(count > 0)
    }

    /// Create every table of the repository if missing.
    pub async fn ensure_schema(&self) -> Result<(), Error> {
        self.ensure_tables(&self.primary).await
    }
}

impl<T: 'static> SchemaWriter for DocumentRepository<T> {
    fn schema_session(&self) -> &dyn Session {
        self.session.as_ref()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codec::{CborCodec, JsonCodec},
        error::ErrorClass,
        session::{FailurePoint, MemorySession},
        table::Table,
        test_fixtures::{Flower, flower_tables, flowers_by_id, flowers_by_name, flowers_by_petals},
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    async fn repository(primary: PrimaryTable) -> (Arc<MemorySession>, DocumentRepository<Flower>) {
        let session = MemorySession::shared();
        let repository = DocumentRepository::new(
            session.clone(),
            primary,
            Arc::new(CborCodec::new()),
            UnitOfWorkType::Logged,
        );
        repository.ensure_schema().await.expect("schema should apply");

        (session, repository)
    }

    fn id_of(table: &Table, flower: &Flower) -> Identifier {
        table.identifier(flower).expect("identifier should derive")
    }

    fn petal_tables() -> PrimaryTable {
        PrimaryTable::new(flowers_by_id())
            .with_view(flowers_by_petals())
            .expect("view should attach")
    }

    ///
    /// Tagger
    ///
    /// Stamps the view name into metadata on the way in and counts documents
    /// on the way out.
    ///

    #[derive(Default)]
    struct Tagger {
        encoded: AtomicUsize,
        decoded: AtomicUsize,
    }

    impl DocumentObserver<Flower> for Tagger {
        fn after_encode(&self, view: &str, document: &mut Document<Flower>) {
            self.encoded.fetch_add(1, Ordering::Relaxed);
            document.metadata_mut().insert("tagged".to_string(), view.to_string());
        }

        fn before_decode(&self, view: &str, document: &mut Document<Flower>) {
            self.decoded.fetch_add(1, Ordering::Relaxed);
            assert_eq!(document.metadata().get("tagged").map(String::as_str), Some(view));
        }
    }

    #[tokio::test]
    async fn create_then_read_from_every_view() {
        let (_, repository) = repository(flower_tables()).await;
        let flower = Flower::new(Uuid::new_v4(), "rose");

        repository.create(&flower).await.expect("create should succeed");

        let by_id = repository
            .read(&id_of(&flowers_by_id(), &flower))
            .await
            .expect("primary read");
        let by_name = repository
            .read_in("flowers_by_name", &id_of(&flowers_by_name(), &flower))
            .await
            .expect("view read");

        assert_eq!(by_id, flower);
        assert_eq!(by_name, flower);
    }

    #[tokio::test]
    async fn second_create_is_a_duplicate() {
        let (_, repository) = repository(flower_tables()).await;
        let flower = Flower::new(Uuid::new_v4(), "rose");

        repository.create(&flower).await.expect("create should succeed");
        let err = repository.create(&flower).await.expect_err("already stored");

        assert!(err.is_duplicate_item());
    }

    #[tokio::test]
    async fn update_moves_rows_whose_view_key_changed() {
        let (session, repository) = repository(flower_tables()).await;
        let original = Flower::new(Uuid::new_v4(), "rose");
        repository.create(&original).await.expect("create should succeed");

        let mut renamed = original.clone();
        renamed.name = "briar".to_string();
        repository
            .update(&renamed, &original)
            .await
            .expect("update should succeed");

        let old_key = id_of(&flowers_by_name(), &original);
        let err = repository
            .read_in("flowers_by_name", &old_key)
            .await
            .expect_err("old view row is gone");
        let stored = repository
            .read(&id_of(&flowers_by_id(), &renamed))
            .await
            .expect("primary row updated in place");

        assert!(err.is_item_not_found());
        assert_eq!(err.origin, ErrorOrigin::Repository);
        assert_eq!(stored.name, "briar");
        assert_eq!(session.row_count(&flowers_by_name()), 1);
        assert!(
            repository
                .exists("flowers_by_name", &id_of(&flowers_by_name(), &renamed))
                .await
                .expect("probe should run")
        );
    }

    #[tokio::test]
    async fn update_of_a_missing_entity_fails() {
        let (_, repository) = repository(flower_tables()).await;
        let flower = Flower::new(Uuid::new_v4(), "rose");

        let err = repository
            .update(&flower, &flower)
            .await
            .expect_err("nothing stored yet");

        assert!(err.is_item_not_found());
    }

    #[tokio::test]
    async fn delete_removes_every_view() {
        let (session, repository) = repository(flower_tables()).await;
        let flower = Flower::new(Uuid::new_v4(), "rose");
        repository.create(&flower).await.expect("create should succeed");

        repository.delete(&flower).await.expect("delete should succeed");

        assert_eq!(session.row_count(&flowers_by_id()), 0);
        assert_eq!(session.row_count(&flowers_by_name()), 0);
    }

    #[tokio::test]
    async fn read_all_returns_a_partition_in_clustering_order() {
        let (_, repository) = repository(petal_tables()).await;
        let account = Uuid::new_v4();

        for (name, petals) in [("daisy", 21), ("rose", 5), ("lily", 6)] {
            let mut flower = Flower::new(account, name);
            flower.petals = petals;
            repository.create(&flower).await.expect("create should succeed");
        }
        repository
            .create(&Flower::new(Uuid::new_v4(), "stranger"))
            .await
            .expect("other partition");

        let flowers = repository
            .read_all("flowers_by_petals", &[Value::from(account)])
            .await
            .expect("prefix read");
        let names = flowers.iter().map(|f| f.name.as_str()).collect::<Vec<_>>();

        assert_eq!(names, ["daisy", "lily", "rose"], "petals descending");
    }

    #[tokio::test]
    async fn paged_reads_walk_a_partition_with_cursors() {
        let (_, repository) = repository(petal_tables()).await;
        let account = Uuid::new_v4();

        for (name, petals) in [("aster", 13), ("daisy", 21), ("rose", 5), ("lily", 6), ("iris", 3)] {
            let mut flower = Flower::new(account, name);
            flower.petals = petals;
            repository.create(&flower).await.expect("create should succeed");
        }

        let prefix = [Value::from(account)];
        let mut cursor = None;
        let mut sizes = Vec::new();
        let mut names = Vec::new();
        loop {
            let page = repository
                .read_all_paged("flowers_by_petals", 2, cursor, &prefix)
                .await
                .expect("page read");
            sizes.push(page.len());
            cursor = page.cursor().cloned();
            names.extend(page.into_items().into_iter().map(|f| f.name));
            if cursor.is_none() {
                break;
            }
        }

        let everything = repository
            .read_all("flowers_by_petals", &prefix)
            .await
            .expect("prefix read")
            .into_iter()
            .map(|f| f.name)
            .collect::<Vec<_>>();

        assert_eq!(sizes, [2, 2, 1]);
        assert_eq!(names, everything);
        assert_eq!(names, ["daisy", "aster", "lily", "rose", "iris"]);
    }

    #[tokio::test]
    async fn paged_reads_reject_bad_arguments() {
        let (_, repository) = repository(petal_tables()).await;
        let prefix = [Value::from(Uuid::new_v4())];

        let err = repository
            .read_all_paged("flowers_by_petals", 0, None, &prefix)
            .await
            .expect_err("zero limit");
        assert_eq!(err.class, ErrorClass::InvalidArgument);

        let cursor = Some(PagingState::new(b"garbage".to_vec()));
        let err = repository
            .read_all_paged("flowers_by_petals", 2, cursor, &prefix)
            .await
            .expect_err("cursor from elsewhere");
        assert_eq!(err.class, ErrorClass::Storage);
        assert_eq!(err.origin, ErrorOrigin::Repository);
    }

    #[tokio::test]
    async fn empty_partition_is_a_single_empty_page() {
        let (_, repository) = repository(petal_tables()).await;

        let page = repository
            .read_all_paged("flowers_by_petals", 3, None, &[Value::from(Uuid::new_v4())])
            .await
            .expect("page read");

        assert!(page.is_empty());
        assert!(!page.has_more());
    }

    #[tokio::test]
    async fn observers_see_documents_around_the_codec() {
        let session = MemorySession::shared();
        let tagger = Arc::new(Tagger::default());
        let repository = DocumentRepository::new(
            session.clone(),
            flower_tables(),
            Arc::new(CborCodec::new()),
            UnitOfWorkType::Logged,
        )
        .with_document_observer(tagger.clone());
        repository.ensure_schema().await.expect("schema should apply");
        let flower = Flower::new(Uuid::new_v4(), "rose");

        repository.create(&flower).await.expect("create should succeed");
        assert_eq!(tagger.encoded.load(Ordering::Relaxed), 2, "one document per view");

        let document = repository
            .read_document_in("flowers_by_name", &id_of(&flowers_by_name(), &flower))
            .await
            .expect("view read");
        let stored = repository
            .read(&id_of(&flowers_by_id(), &flower))
            .await
            .expect("primary read");

        assert_eq!(stored, flower);
        assert_eq!(
            document.metadata().get("tagged").map(String::as_str),
            Some("flowers_by_name")
        );
        assert_eq!(tagger.decoded.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn exists_fails_when_the_count_is_missing() {
        let (session, repository) = repository(flower_tables()).await;
        let flower = Flower::new(Uuid::new_v4(), "rose");
        repository.create(&flower).await.expect("create should succeed");
        let id = id_of(&flowers_by_id(), &flower);

        session.fail_next(FailurePoint::MissingCount);
        let err = repository
            .exists("flowers", &id)
            .await
            .expect_err("count is missing");

        assert_eq!(err.class, ErrorClass::Storage);
        assert!(repository.exists("flowers", &id).await.expect("count should run"));
    }

    #[tokio::test]
    async fn unknown_views_are_rejected() {
        let (_, repository) = repository(flower_tables()).await;
        let id: Identifier = vec![Value::from(Uuid::new_v4())].into();

        let err = repository
            .read_in("flowers_by_colour", &id)
            .await
            .expect_err("no such view");

        assert_eq!(err.class, ErrorClass::Internal);
    }

    #[tokio::test]
    async fn from_config_applies_keyspace_and_batch_type() {
        let config = Config::from_toml_str(
            r#"
                keyspace = "greenhouse"
                unit_of_work = "unlogged"
            "#,
        )
        .expect("config should parse");
        let session = MemorySession::shared();

        let repository = DocumentRepository::<Flower>::from_config(
            session.clone(),
            flower_tables(),
            Arc::new(JsonCodec),
            &config,
        )
        .expect("repository should build");
        repository.ensure_schema().await.expect("schema should apply");

        assert_eq!(repository.primary().table().keyspace(), "greenhouse");
        assert_eq!(repository.unit_of_work().unit_of_work_type(), UnitOfWorkType::Unlogged);

        let flower = Flower::new(Uuid::new_v4(), "rose");
        repository.create(&flower).await.expect("create should succeed");
        assert_eq!(session.row_count(repository.primary().table()), 1);
    }
}
