use crate::{
    document::Document,
    error::Error,
    key::Identifier,
    session::{BoundStatement, Session},
    statement::StatementFactory,
    table::PrimaryTable,
    value::Value,
};
use std::{collections::BTreeMap, sync::Arc};

///
/// ViewStatements
///
/// Statement factories by view name. The unit of work resolves every
/// registered change through this registry.
///

#[derive(Debug, Default)]
pub struct ViewStatements {
    views: BTreeMap<String, Arc<StatementFactory>>,
}

impl ViewStatements {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One factory per table of `primary`, keyed by table name.
    pub fn for_primary(session: &Arc<dyn Session>, primary: &PrimaryTable) -> Self {
        let mut statements = Self::new();
        statements.insert(StatementFactory::for_primary(Arc::clone(session), primary));
        for view in primary.views() {
            statements.insert(StatementFactory::new(Arc::clone(session), view.clone()));
        }

        statements
    }

    #[must_use]
    pub fn with(mut self, factory: StatementFactory) -> Self {
        self.insert(factory);
        self
    }

    /// Register `factory` under its table name, replacing any previous one.
    pub fn insert(&mut self, factory: StatementFactory) {
        self.views
            .insert(factory.table().name().to_string(), Arc::new(factory));
    }

    pub fn get(&self, view: &str) -> Result<&Arc<StatementFactory>, Error> {
        self.views.get(view).ok_or_else(|| Error::unknown_view(view))
    }

    #[must_use]
    pub fn contains(&self, view: &str) -> bool {
        self.views.contains_key(view)
    }

    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    /// True when the unit of work must probe existence before writing to
    /// `view`. Unknown views are never unique.
    #[must_use]
    pub fn is_view_unique(&self, view: &str) -> bool {
        self.views
            .get(view)
            .is_some_and(|factory| factory.table().is_unique())
    }

    pub fn create<T>(&self, view: &str, document: &mut Document<T>) -> Result<BoundStatement, Error> {
        self.get(view)?.create(document)
    }

    pub fn upsert<T>(&self, view: &str, document: &mut Document<T>) -> Result<BoundStatement, Error> {
        self.get(view)?.upsert(document)
    }

    pub fn update<T>(&self, view: &str, document: &mut Document<T>) -> Result<BoundStatement, Error> {
        self.get(view)?.update(document)
    }

    pub fn delete(&self, view: &str, id: &Identifier) -> Result<BoundStatement, Error> {
        self.get(view)?.delete(id)
    }

    pub fn exists(&self, view: &str, id: &Identifier) -> Result<BoundStatement, Error> {
        self.get(view)?.exists(id)
    }

    pub fn read(&self, view: &str, id: &Identifier) -> Result<BoundStatement, Error> {
        self.get(view)?.read(id)
    }

    pub fn read_all(&self, view: &str, prefix: &[Value]) -> Result<BoundStatement, Error> {
        self.get(view)?.read_all(prefix)
    }
}
