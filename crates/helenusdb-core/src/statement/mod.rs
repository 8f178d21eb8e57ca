//! Statement generation for document tables.
//!
//! A [`StatementFactory`] is bound to one table and prepares each operation
//! at most once; prepared statements are shared by every caller afterwards.
//! Bound parameter order is part of the storage contract:
//!
//! - create/upsert: key columns, object, type, metadata, created_at, updated_at
//! - update: object, type, metadata, updated_at, then key columns
//! - delete/exists/read: key columns
//! - read_all: the first `n` key columns

mod views;


use crate::{
    columns,
    document::Document,
    error::{Error, ErrorOrigin},
    key::Identifier,
    session::{BoundStatement, PreparedStatement, Session, StatementKind, StatementSpec},
    table::{PrimaryTable, Table},
    value::Value,
};
use chrono::Utc;
use dashmap::DashMap;
use std::{fmt, sync::Arc};
use tracing::debug;

pub use views::ViewStatements;

///
/// StatementName
///
/// Cache key for prepared statements. Prefix reads are cached per prefix
/// length.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum StatementName {
    Create,
    Delete,
    Exists,
    Read,
    ReadAll(usize),
    Update,
    Upsert,
}

///
/// StatementFactory
///

pub struct StatementFactory {
    session: Arc<dyn Session>,
    table: Arc<Table>,
    conditional: bool,
    statements: DashMap<StatementName, Arc<PreparedStatement>>,
}

impl StatementFactory {
    /// Factory for a table whose uniqueness, if any, is enforced by the
    /// unit of work.
    pub fn new(session: Arc<dyn Session>, table: Table) -> Self {
        Self {
            session,
            table: Arc::new(table),
            conditional: false,
            statements: DashMap::new(),
        }
    }

    /// Factory for the primary table. A unique primary table without views
    /// gets conditional writes (`IF NOT EXISTS` / `IF EXISTS`).
    pub fn for_primary(session: Arc<dyn Session>, primary: &PrimaryTable) -> Self {
        let table = primary.table().clone();
        let conditional = !primary.has_views() && table.is_unique();

        Self {
            conditional,
            ..Self::new(session, table)
        }
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    #[must_use]
    pub const fn uses_conditional_writes(&self) -> bool {
        self.conditional
    }

    /// Number of distinct statements prepared by this factory.
    #[must_use]
    pub fn cached_statements(&self) -> usize {
        self.statements.len()
    }

    /// Insert a new row, stamping both timestamps.
    pub fn create<T>(&self, document: &mut Document<T>) -> Result<BoundStatement, Error> {
        self.bind_insert(StatementName::Create, document)
    }

    /// Insert or overwrite a row, never conditionally.
    pub fn upsert<T>(&self, document: &mut Document<T>) -> Result<BoundStatement, Error> {
        self.bind_insert(StatementName::Upsert, document)
    }

    /// Overwrite the document columns of an existing row, stamping
    /// `updated_at`.
    pub fn update<T>(&self, document: &mut Document<T>) -> Result<BoundStatement, Error> {
        self.check_identifier(document.identifier())?;
        document.stamp_updated(Utc::now());

        let [object, type_tag, metadata] = document_values(document);
        let mut values = vec![
            object,
            type_tag,
            metadata,
            Value::from(document.updated_at()),
        ];
        values.extend(document.identifier().components().iter().cloned());

        self.bind(StatementName::Update, values)
    }

    pub fn delete(&self, id: &Identifier) -> Result<BoundStatement, Error> {
        self.bind_identity(StatementName::Delete, id)
    }

    /// Row-count probe used for existence checks.
    pub fn exists(&self, id: &Identifier) -> Result<BoundStatement, Error> {
        self.bind_identity(StatementName::Exists, id)
    }

    pub fn read(&self, id: &Identifier) -> Result<BoundStatement, Error> {
        self.bind_identity(StatementName::Read, id)
    }

    /// Read every row whose leading key columns equal `prefix`.
    pub fn read_all(&self, prefix: &[Value]) -> Result<BoundStatement, Error> {
        let key_len = self.table.keys().len();
        if prefix.is_empty() || prefix.len() > key_len {
            return Err(Error::invalid_identifier(
                ErrorOrigin::Statement,
                format!(
                    "prefix of {} values is invalid for {} with {key_len} key columns",
                    prefix.len(),
                    self.table
                ),
            ));
        }
        if prefix.iter().any(Value::is_null) {
            return Err(Error::invalid_identifier(
                ErrorOrigin::Statement,
                format!("prefix for {} contains a null value", self.table),
            ));
        }

        self.bind(StatementName::ReadAll(prefix.len()), prefix.to_vec())
    }

    fn bind_insert<T>(
        &self,
        name: StatementName,
        document: &mut Document<T>,
    ) -> Result<BoundStatement, Error> {
        self.check_identifier(document.identifier())?;
        document.stamp_created(Utc::now());

        let mut values = document.identifier().components().to_vec();
        values.extend(document_values(document));
        values.push(Value::from(document.created_at()));
        values.push(Value::from(document.updated_at()));

        self.bind(name, values)
    }

    fn bind_identity(&self, name: StatementName, id: &Identifier) -> Result<BoundStatement, Error> {
        self.check_identifier(id)?;

        self.bind(name, id.components().to_vec())
    }

    fn bind(&self, name: StatementName, values: Vec<Value>) -> Result<BoundStatement, Error> {
        self.prepared(name)?
            .bind(values)
            .map_err(|err| Error::storage(ErrorOrigin::Statement, err))
    }

    fn prepared(&self, name: StatementName) -> Result<Arc<PreparedStatement>, Error> {
        let entry = self
            .statements
            .entry(name)
            .or_try_insert_with(|| {
                let spec = self.spec(name);
                debug!(table = %self.table, statement = %spec.text, "preparing statement");
                self.session.prepare(spec)
            })
            .map_err(|err| Error::storage(ErrorOrigin::Statement, err))?;

        Ok(Arc::clone(entry.value()))
    }

    fn check_identifier(&self, id: &Identifier) -> Result<(), Error> {
        let expected = self.table.keys().len();
        if id.len() != expected {
            return Err(Error::invalid_identifier(
                ErrorOrigin::Statement,
                format!(
                    "identifier {id} has {} components, {} expects {expected}",
                    id.len(),
                    self.table
                ),
            ));
        }

        Ok(())
    }

    fn spec(&self, name: StatementName) -> StatementSpec {
        let table = self.table.qualified_name();
        let keys = self.table.keys();
        let (create_suffix, exists_suffix) = if self.conditional {
            (" IF NOT EXISTS", " IF EXISTS")
        } else {
            ("", "")
        };
        let conditional = self.conditional;

        let (text, kind) = match name {
            StatementName::Create | StatementName::Upsert => {
                let create = name == StatementName::Create;
                (
                    format!(
                        "INSERT INTO {table} ({}, {}, {}, {}, {}, {}) VALUES ({}){}",
                        keys.as_select_properties(),
                        columns::OBJECT,
                        columns::TYPE,
                        columns::METADATA,
                        columns::CREATED_AT,
                        columns::UPDATED_AT,
                        keys.as_question_marks(5),
                        if create { create_suffix } else { "" },
                    ),
                    StatementKind::Insert {
                        conditional: create && conditional,
                    },
                )
            }
            StatementName::Update => (
                format!(
                    "UPDATE {table} SET {} = ?, {} = ?, {} = ?, {} = ? WHERE {}{exists_suffix}",
                    columns::OBJECT,
                    columns::TYPE,
                    columns::METADATA,
                    columns::UPDATED_AT,
                    keys.as_identity_clause(),
                ),
                StatementKind::Update { conditional },
            ),
            StatementName::Delete => (
                format!(
                    "DELETE FROM {table} WHERE {}{exists_suffix}",
                    keys.as_identity_clause()
                ),
                StatementKind::Delete { conditional },
            ),
            StatementName::Exists => (
                format!(
                    "SELECT COUNT(*) FROM {table} WHERE {} LIMIT 1",
                    keys.as_identity_clause()
                ),
                StatementKind::Count,
            ),
            StatementName::Read => (
                format!(
                    "SELECT {} FROM {table} WHERE {} LIMIT 1",
                    columns::PROJECTION,
                    keys.as_identity_clause()
                ),
                StatementKind::Read,
            ),
            StatementName::ReadAll(prefix) => (
                format!(
                    "SELECT {} FROM {table} WHERE {}",
                    columns::PROJECTION,
                    keys.as_identity_clause_prefix(prefix)
                ),
                StatementKind::ReadPrefix(prefix),
            ),
        };

        StatementSpec::new(text, kind, Arc::clone(&self.table))
    }
}

impl fmt::Debug for StatementFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementFactory")
            .field("table", &self.table.qualified_name())
            .field("conditional", &self.conditional)
            .field("cached", &self.statements.len())
            .finish_non_exhaustive()
    }
}

// Object, type and metadata, in bind order. A missing object binds as an
// empty blob.
fn document_values<T>(document: &Document<T>) -> [Value; 3] {
    [
        Value::Blob(document.object().map(<[u8]>::to_vec).unwrap_or_default()),
        Value::from(document.type_tag()),
        Value::Map(document.metadata().clone()),
    ]
}
