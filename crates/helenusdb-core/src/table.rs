use crate::{
    error::Error,
    key::{Identifier, KeyDefinition, PropertyAccess, validate_name},
};
use helenusdb_config::Config;
use std::{collections::BTreeMap, fmt, sync::Arc};

///
/// Table
///
/// One storage table: where it lives, how it is keyed, and its default
/// row time-to-live in seconds (0 keeps rows forever). Metadata is free-form
/// application annotation and never reaches storage.
///

#[derive(Clone, Debug)]
pub struct Table {
    keyspace: String,
    name: String,
    keys: Arc<KeyDefinition>,
    ttl: u64,
    metadata: BTreeMap<String, String>,
}

impl Table {
    pub fn new(
        keyspace: impl Into<String>,
        name: impl Into<String>,
        keys: KeyDefinition,
    ) -> Result<Self, Error> {
        let keyspace = keyspace.into();
        let name = name.into();
        validate_name(&keyspace, false)?;
        validate_name(&name, false)?;

        Ok(Self {
            keyspace,
            name,
            keys: Arc::new(keys),
            ttl: 0,
            metadata: BTreeMap::new(),
        })
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    /// Apply the configured keyspace, if any, and this table's settings.
    #[must_use]
    pub fn configure(mut self, config: &Config) -> Self {
        if let Some(keyspace) = &config.keyspace {
            self.keyspace.clone_from(keyspace);
        }
        self.ttl = config.table(&self.name).ttl;
        self
    }

    #[must_use]
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn keys(&self) -> &KeyDefinition {
        &self.keys
    }

    #[must_use]
    pub fn shared_keys(&self) -> Arc<KeyDefinition> {
        Arc::clone(&self.keys)
    }

    #[must_use]
    pub const fn ttl(&self) -> u64 {
        self.ttl
    }

    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.keys.is_unique()
    }

    /// `keyspace.table`, as embedded in statements.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.keyspace, self.name)
    }

    pub fn identifier<E>(&self, entity: &E) -> Result<Identifier, Error>
    where
        E: PropertyAccess + ?Sized,
    {
        self.keys.identifier(entity)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.keyspace, self.name)
    }
}

///
/// PrimaryTable
///
/// The authoritative table for an entity plus the denormalized views that
/// share its identity under other keys.
///

#[derive(Clone, Debug)]
pub struct PrimaryTable {
    table: Table,
    views: Vec<Table>,
}

impl PrimaryTable {
    #[must_use]
    pub const fn new(table: Table) -> Self {
        Self {
            table,
            views: Vec::new(),
        }
    }

    /// Add a view; views must live in the primary table's keyspace and
    /// carry distinct names.
    pub fn with_view(mut self, view: Table) -> Result<Self, Error> {
        if view.keyspace() != self.table.keyspace() {
            return Err(Error::key_definition(format!(
                "view '{view}' must live in keyspace '{}'",
                self.table.keyspace()
            )));
        }
        if self.tables().any(|table| table.name() == view.name()) {
            return Err(Error::key_definition(format!(
                "table '{}' is already part of '{}'",
                view.name(),
                self.table.name()
            )));
        }

        self.views.push(view);
        Ok(self)
    }

    #[must_use]
    pub fn configure(self, config: &Config) -> Self {
        Self {
            table: self.table.configure(config),
            views: self
                .views
                .into_iter()
                .map(|view| view.configure(config))
                .collect(),
        }
    }

    #[must_use]
    pub const fn table(&self) -> &Table {
        &self.table
    }

    #[must_use]
    pub fn views(&self) -> &[Table] {
        &self.views
    }

    #[must_use]
    pub const fn has_views(&self) -> bool {
        !self.views.is_empty()
    }

    /// The primary table followed by every view.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        std::iter::once(&self.table).chain(self.views.iter())
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Table> {
        self.tables().find(|table| table.name() == name)
    }
}

///
/// TESTS
///
