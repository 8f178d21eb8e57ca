use crate::{
    error::{Error, ErrorOrigin},
    key::PropertyAccess,
    value::{DataType, Value},
};
use derive_more::{Deref, Display};
use std::{fmt, sync::Arc};

/// Transform applied to a property value after lookup (e.g. normalising case).
pub type Extractor = Arc<dyn Fn(Value) -> Value + Send + Sync>;

///
/// KeyComponent
///
/// One key column: its name, the entity property it is read from, its type,
/// and an optional value transform.
///

#[derive(Clone)]
pub struct KeyComponent {
    column: String,
    property: String,
    data_type: DataType,
    extractor: Option<Extractor>,
}

impl KeyComponent {
    /// Component whose source property has the same name as its column.
    pub fn new(column: impl Into<String>, data_type: DataType) -> Self {
        let column = column.into();

        Self {
            property: column.clone(),
            column,
            data_type,
            extractor: None,
        }
    }

    pub fn with_property(
        column: impl Into<String>,
        property: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            column: column.into(),
            property: property.into(),
            data_type,
            extractor: None,
        }
    }

    /// Parse `column:type`, or `column as property:type` when the column and
    /// source property differ.
    pub fn parse(spec: &str) -> Result<Self, Error> {
        let (names, data_type) = spec.split_once(':').ok_or_else(|| {
            Error::key_definition(format!("key component '{spec}' must be 'column:type'"))
        })?;
        let data_type = data_type.parse::<DataType>()?;

        let (column, property) = match names.split_once(" as ") {
            Some((column, property)) => (column.trim(), property.trim()),
            None => (names.trim(), names.trim()),
        };
        validate_name(column, false).map_err(|err| in_spec(err, spec))?;
        validate_name(property, true).map_err(|err| in_spec(err, spec))?;

        Ok(Self::with_property(column, property, data_type))
    }

    #[must_use]
    pub fn extractor(mut self, extractor: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.set_extractor(Arc::new(extractor));
        self
    }

    pub(crate) fn set_extractor(&mut self, extractor: Extractor) {
        self.extractor = Some(extractor);
    }

    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Column declaration, e.g. `account_id uuid`.
    #[must_use]
    pub fn as_column(&self) -> String {
        format!("{} {}", self.column, self.data_type)
    }

    /// Equality predicate, e.g. `account_id = ?`.
    #[must_use]
    pub fn as_predicate(&self) -> String {
        format!("{} = ?", self.column)
    }

    /// Read this component's value from `entity`.
    pub(crate) fn extract<E>(&self, entity: &E) -> Result<Value, Error>
    where
        E: PropertyAccess + ?Sized,
    {
        let raw = entity.property(&self.property).ok_or_else(|| {
            Error::key_definition(format!(
                "entity has no readable property '{}' for key column '{}'",
                self.property, self.column
            ))
        })?;
        let value = match &self.extractor {
            Some(extractor) => extractor(raw),
            None => raw,
        };

        if value.is_null() {
            return Err(Error::invalid_identifier(
                ErrorOrigin::Key,
                format!("key column '{}' resolved to null", self.column),
            ));
        }
        if !value.conforms_to(self.data_type) {
            return Err(Error::key_definition(format!(
                "key column '{}' expects {}, property '{}' produced {}",
                self.column,
                self.data_type,
                self.property,
                value.kind()
            )));
        }

        Ok(value)
    }
}

impl fmt::Debug for KeyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyComponent")
            .field("column", &self.column)
            .field("property", &self.property)
            .field("data_type", &self.data_type)
            .field("extractor", &self.extractor.is_some())
            .finish()
    }
}

///
/// ClusteringOrder
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
pub enum ClusteringOrder {
    #[default]
    #[display("ASC")]
    Ascending,
    #[display("DESC")]
    Descending,
}

impl ClusteringOrder {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Ascending),
            "desc" | "descending" => Some(Self::Descending),
            _ => None,
        }
    }
}

///
/// ClusteringKeyComponent
///
/// Key component that also orders rows within a partition.
///

#[derive(Clone, Debug, Deref)]
pub struct ClusteringKeyComponent {
    #[deref]
    component: KeyComponent,
    order: ClusteringOrder,
}

impl ClusteringKeyComponent {
    #[must_use]
    pub const fn new(component: KeyComponent, order: ClusteringOrder) -> Self {
        Self { component, order }
    }

    /// Parse `column:type[:asc|desc]`; ordering defaults to ascending.
    pub fn parse(spec: &str) -> Result<Self, Error> {
        let (head, order) = match spec.rsplit_once(':') {
            Some((head, tail)) => match ClusteringOrder::parse(tail) {
                Some(order) => (head, order),
                None => (spec, ClusteringOrder::Ascending),
            },
            None => (spec, ClusteringOrder::Ascending),
        };

        Ok(Self::new(KeyComponent::parse(head)?, order))
    }

    #[must_use]
    pub const fn order(&self) -> ClusteringOrder {
        self.order
    }

    #[must_use]
    pub const fn component(&self) -> &KeyComponent {
        &self.component
    }

    pub(crate) const fn component_mut(&mut self) -> &mut KeyComponent {
        &mut self.component
    }

    /// Ordering fragment, e.g. `created_at DESC`.
    #[must_use]
    pub fn as_ordering(&self) -> String {
        format!("{} {}", self.component.column(), self.order)
    }
}

// Names are embedded in generated statements, so keep them to plain
// identifiers. Properties may be dotted paths into nested values.
pub(crate) fn validate_name(name: &str, allow_path: bool) -> Result<(), Error> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || (allow_path && c == '.'))
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::key_definition(format!("invalid name '{name}'")))
    }
}

fn in_spec(err: Error, spec: &str) -> Error {
    Error::key_definition(format!("{} in key component '{spec}'", err.message))
}
