use helenusdb::core::{
    error::CommitPhase,
    key::ClusteringOrder,
    schema::SchemaWriter,
    session::FailurePoint,
};
use helenusdb::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

///
/// Book
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
struct Book {
    id: Uuid,
    author: String,
    title: String,
    pages: i32,
}

impl Book {
    fn new(author: &str, title: &str, pages: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            author: author.to_string(),
            title: title.to_string(),
            pages,
        }
    }
}

impl PropertyAccess for Book {
    fn property(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.into()),
            "author" => Some(self.author.clone().into()),
            "title" => Some(self.title.clone().into()),
            "pages" => Some(self.pages.into()),
            _ => None,
        }
    }
}

const CONFIG: &str = r#"
keyspace = "library"
unit_of_work = "logged"

[tables.books_by_author]
ttl = 86400
"#;

fn lowercase(value: Value) -> Value {
    match value {
        Value::Text(text) => Value::Text(text.to_lowercase()),
        other => other,
    }
}

fn library() -> PrimaryTable {
    let by_id = KeyDefinition::builder()
        .with_partition_key("id", DataType::Uuid)
        .is_unique()
        .build()
        .expect("books key should build");
    let by_author = KeyDefinition::builder()
        .with_partition_key("author", DataType::Text)
        .with_extractor(lowercase)
        .with_clustering_key_str("title:text:asc")
        .is_unique()
        .build()
        .expect("books_by_author key should build");

    PrimaryTable::new(Table::new("scratch", "books", by_id).expect("books table"))
        .with_view(Table::new("scratch", "books_by_author", by_author).expect("view table"))
        .expect("view should attach")
}

async fn open(codec: Arc<dyn ObjectCodec<Book>>) -> (Arc<MemorySession>, DocumentRepository<Book>) {
    let config = Config::from_toml_str(CONFIG).expect("config should parse");
    let session = MemorySession::shared();
    let repository = DocumentRepository::from_config(session.clone(), library(), codec, &config)
        .expect("repository should build");
    repository.ensure_schema().await.expect("schema should apply");

    (session, repository)
}

fn by_id(book: &Book) -> Identifier {
    vec![Value::from(book.id)].into()
}

fn by_author(author: &str, title: &str) -> Identifier {
    vec![Value::from(author), Value::from(title)].into()
}

async fn lifecycle(codec: Arc<dyn ObjectCodec<Book>>) {
    let (session, repository) = open(codec).await;
    let dune = Book::new("Frank Herbert", "Dune", 412);
    let messiah = Book::new("Frank Herbert", "Dune Messiah", 256);
    let solaris = Book::new("Stanislaw Lem", "Solaris", 204);

    assert_eq!(repository.primary().table().keyspace(), "library");
    assert_eq!(repository.primary().views()[0].ttl(), 86_400);

    for book in [&messiah, &dune, &solaris] {
        repository.create(book).await.expect("create should succeed");
    }

    // the view key is lowercased by its extractor
    let stored = repository
        .read_in("books_by_author", &by_author("frank herbert", "Dune"))
        .await
        .expect("view read");
    assert_eq!(stored, dune);

    let shelf = repository
        .read_all("books_by_author", &[Value::from("frank herbert")])
        .await
        .expect("partition read");
    let titles = shelf.iter().map(|b| b.title.as_str()).collect::<Vec<_>>();
    assert_eq!(titles, ["Dune", "Dune Messiah"]);

    let err = repository.create(&dune).await.expect_err("duplicate create");
    assert!(err.is_duplicate_item());

    let mut retitled = dune.clone();
    retitled.title = "Dune (Deluxe)".to_string();
    retitled.pages = 896;
    repository
        .update(&retitled, &dune)
        .await
        .expect("update should succeed");

    assert_eq!(
        repository.read(&by_id(&dune)).await.expect("primary read").pages,
        896
    );
    assert!(
        !repository
            .exists("books_by_author", &by_author("frank herbert", "Dune"))
            .await
            .expect("existence check should run")
    );

    repository.delete(&solaris).await.expect("delete should succeed");
    let err = repository
        .read(&by_id(&solaris))
        .await
        .expect_err("deleted");
    assert!(err.is_item_not_found());

    repository
        .drop_tables(repository.primary())
        .await
        .expect("tables should drop");
    assert!(!session.has_table(repository.primary().table()));
}

#[tokio::test]
async fn library_lifecycle_with_cbor() {
    lifecycle(Arc::new(CborCodec::new())).await;
}

#[tokio::test]
async fn library_lifecycle_with_json() {
    lifecycle(Arc::new(JsonCodec)).await;
}

#[tokio::test]
async fn explicit_unit_of_work_spans_entities() {
    let (session, repository) = open(Arc::new(CborCodec::new())).await;
    let books = [
        Book::new("Ursula K. Le Guin", "The Dispossessed", 387),
        Book::new("Ursula K. Le Guin", "The Lathe of Heaven", 184),
    ];
    let mut uow = repository.unit_of_work();

    for book in &books {
        for (view, document) in repository.as_documents(book).expect("documents should build") {
            uow.register_new(view, document);
        }
    }
    uow.commit().await.expect("commit should succeed");

    assert_eq!(session.batch_count(), 1, "both books in one batch");
    assert_eq!(session.row_count(repository.primary().table()), 2);
    assert_eq!(uow.change_set().changes().len(), 4, "change set survives commit");

    uow.reset();
    uow.commit().await.expect("nothing left to write");
    assert_eq!(session.batch_count(), 1);
}

#[tokio::test]
async fn failed_submission_writes_nothing() {
    let (session, repository) = open(Arc::new(JsonCodec)).await;
    let book = Book::new("Octavia E. Butler", "Kindred", 264);

    session.fail_next(FailurePoint::Batch);
    let err = repository.create(&book).await.expect_err("batch times out");

    assert!(err.is_commit());
    assert_eq!(err.commit_phase(), Some(CommitPhase::Submit));
    assert_eq!(session.row_count(repository.primary().table()), 0);

    repository.create(&book).await.expect("retry should succeed");
    assert_eq!(
        repository.read(&by_id(&book)).await.expect("primary read"),
        book
    );
}

#[tokio::test]
async fn shelves_read_one_page_at_a_time() {
    let (_, repository) = open(Arc::new(CborCodec::new())).await;
    for (title, pages) in [("Kindred", 264), ("Dawn", 248), ("Fledgling", 310)] {
        repository
            .create(&Book::new("Octavia E. Butler", title, pages))
            .await
            .expect("create should succeed");
    }

    let shelf = [Value::from("octavia e. butler")];
    let first = repository
        .read_all_paged("books_by_author", 2, None, &shelf)
        .await
        .expect("first page");
    assert!(first.has_more());

    let cursor: Option<PagingState> = first.cursor().cloned();
    let second = repository
        .read_all_paged("books_by_author", 2, cursor, &shelf)
        .await
        .expect("second page");
    assert!(!second.has_more());

    let titles = first
        .items()
        .iter()
        .chain(second.items())
        .map(|b| b.title.as_str())
        .collect::<Vec<_>>();
    assert_eq!(titles, ["Dawn", "Fledgling", "Kindred"]);
}

#[test]
fn version_is_exported() {
    assert!(!helenusdb::VERSION.is_empty());
}

#[test]
fn clustering_order_renders_in_schema() {
    let table = library();
    let view = &table.views()[0];

    assert_eq!(view.keys().clustering_keys()[0].order(), ClusteringOrder::Ascending);
    assert_eq!(view.keys().as_clustering_key(), "CLUSTERING ORDER BY (title ASC)");
}
