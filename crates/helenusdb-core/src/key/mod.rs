//! Key definitions: which columns partition and cluster a view, how their
//! values are read from an entity, and how they render into statements.
//!
//! Rendering is pure and always lists partition components before
//! clustering components, in declaration order.

mod builder;
mod component;
mod identifier;


use crate::error::Error;
use std::{collections::BTreeSet, fmt};

pub use builder::KeyDefinitionBuilder;
pub(crate) use component::validate_name;
pub use component::{ClusteringKeyComponent, ClusteringOrder, Extractor, KeyComponent};
pub use identifier::{Identifier, PropertyAccess};

///
/// KeyDefinition
///
/// Partition components (at least one), clustering components (zero or
/// more), and whether the unit of work must enforce uniqueness for views
/// keyed by this definition.
///

#[derive(Clone, Debug)]
pub struct KeyDefinition {
    partition: Vec<KeyComponent>,
    clustering: Vec<ClusteringKeyComponent>,
    unique: bool,
}

impl KeyDefinition {
    pub fn new(
        partition: Vec<KeyComponent>,
        clustering: Vec<ClusteringKeyComponent>,
        unique: bool,
    ) -> Result<Self, Error> {
        if partition.is_empty() {
            return Err(Error::key_definition(
                "key definition requires at least one partition key",
            ));
        }

        let mut seen = BTreeSet::new();
        for component in partition.iter().chain(clustering.iter().map(|c| c.component())) {
            validate_name(component.column(), false)?;
            validate_name(component.property(), true)?;

            if !seen.insert(component.column()) {
                return Err(Error::key_definition(format!(
                    "key column '{}' is declared more than once",
                    component.column()
                )));
            }
        }

        Ok(Self {
            partition,
            clustering,
            unique,
        })
    }

    #[must_use]
    pub fn builder() -> KeyDefinitionBuilder {
        KeyDefinitionBuilder::new()
    }

    #[must_use]
    pub fn partition_keys(&self) -> &[KeyComponent] {
        &self.partition
    }

    #[must_use]
    pub fn clustering_keys(&self) -> &[ClusteringKeyComponent] {
        &self.clustering
    }

    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    /// Total number of key columns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.partition.len() + self.clustering.len()
    }

    #[must_use]
    pub const fn has_clustering(&self) -> bool {
        !self.clustering.is_empty()
    }

    /// All components, partition first.
    pub fn components(&self) -> impl Iterator<Item = &KeyComponent> {
        self.partition
            .iter()
            .chain(self.clustering.iter().map(ClusteringKeyComponent::component))
    }

    /// Derive the identifier of `entity` under this definition.
    pub fn identifier<E>(&self, entity: &E) -> Result<Identifier, Error>
    where
        E: PropertyAccess + ?Sized,
    {
        self.components()
            .map(|component| component.extract(entity))
            .collect::<Result<Vec<_>, _>>()
            .map(Identifier::new)
    }

    /// Column declarations, e.g. `account_id uuid, name text`.
    #[must_use]
    pub fn as_columns(&self) -> String {
        self.components()
            .map(KeyComponent::as_column)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Primary key body, e.g. `(account_id), name`.
    #[must_use]
    pub fn as_primary_key(&self) -> String {
        let partition = self
            .partition
            .iter()
            .map(KeyComponent::column)
            .collect::<Vec<_>>()
            .join(", ");
        let mut out = format!("({partition})");

        for component in &self.clustering {
            out.push_str(", ");
            out.push_str(component.column());
        }

        out
    }

    /// `CLUSTERING ORDER BY (...)`, or an empty string without clustering keys.
    #[must_use]
    pub fn as_clustering_key(&self) -> String {
        if self.clustering.is_empty() {
            return String::new();
        }

        let ordering = self
            .clustering
            .iter()
            .map(ClusteringKeyComponent::as_ordering)
            .collect::<Vec<_>>()
            .join(", ");

        format!("CLUSTERING ORDER BY ({ordering})")
    }

    /// Key column names for insert column lists.
    #[must_use]
    pub fn as_select_properties(&self) -> String {
        self.components()
            .map(KeyComponent::column)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Equality predicates over every key column.
    #[must_use]
    pub fn as_identity_clause(&self) -> String {
        self.as_identity_clause_prefix(self.len())
    }

    /// Equality predicates over the first `count` key columns, partition
    /// first. `count` is clamped to the key length.
    #[must_use]
    pub fn as_identity_clause_prefix(&self, count: usize) -> String {
        self.components()
            .take(count)
            .map(KeyComponent::as_predicate)
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// One positional placeholder per key column plus `extra`.
    #[must_use]
    pub fn as_question_marks(&self, extra: usize) -> String {
        vec!["?"; self.len() + extra].join(", ")
    }
}

impl fmt::Display for KeyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.as_primary_key())?;
        if self.unique {
            f.write_str(" unique")?;
        }
        Ok(())
    }
}
