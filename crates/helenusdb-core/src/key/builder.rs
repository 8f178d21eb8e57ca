use crate::{
    error::Error,
    key::{ClusteringKeyComponent, ClusteringOrder, KeyComponent, KeyDefinition},
    value::{DataType, Value},
};
use std::sync::Arc;

///
/// KeyDefinitionBuilder
///
/// Single accumulator for a key definition. Every `with_*` call appends one
/// component; `with_extractor` applies to the most recently added one.
/// Parse failures are held until `build`.
///

#[derive(Default)]
pub struct KeyDefinitionBuilder {
    partition: Vec<KeyComponent>,
    clustering: Vec<ClusteringKeyComponent>,
    unique: bool,
    last: Option<Slot>,
    error: Option<Error>,
}

#[derive(Clone, Copy)]
enum Slot {
    Partition,
    Clustering,
}

impl KeyDefinitionBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_partition_key(self, column: impl Into<String>, data_type: DataType) -> Self {
        self.push_partition(KeyComponent::new(column, data_type))
    }

    #[must_use]
    pub fn with_partition_key_property(
        self,
        column: impl Into<String>,
        property: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        self.push_partition(KeyComponent::with_property(column, property, data_type))
    }

    /// Partition key from `column[ as property]:type`.
    #[must_use]
    pub fn with_partition_key_str(self, spec: &str) -> Self {
        match KeyComponent::parse(spec) {
            Ok(component) => self.push_partition(component),
            Err(err) => self.fail(err),
        }
    }

    #[must_use]
    pub fn with_clustering_key(
        self,
        column: impl Into<String>,
        data_type: DataType,
        order: ClusteringOrder,
    ) -> Self {
        self.push_clustering(ClusteringKeyComponent::new(
            KeyComponent::new(column, data_type),
            order,
        ))
    }

    #[must_use]
    pub fn with_clustering_key_property(
        self,
        column: impl Into<String>,
        property: impl Into<String>,
        data_type: DataType,
        order: ClusteringOrder,
    ) -> Self {
        self.push_clustering(ClusteringKeyComponent::new(
            KeyComponent::with_property(column, property, data_type),
            order,
        ))
    }

    /// Clustering key from `column[ as property]:type[:asc|desc]`.
    #[must_use]
    pub fn with_clustering_key_str(self, spec: &str) -> Self {
        match ClusteringKeyComponent::parse(spec) {
            Ok(component) => self.push_clustering(component),
            Err(err) => self.fail(err),
        }
    }

    /// Attach a value transform to the most recently added component.
    #[must_use]
    pub fn with_extractor(
        mut self,
        extractor: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        let extractor = Arc::new(extractor);
        let target = match self.last {
            Some(Slot::Partition) => self.partition.last_mut(),
            Some(Slot::Clustering) => self
                .clustering
                .last_mut()
                .map(ClusteringKeyComponent::component_mut),
            None => None,
        };

        match target {
            Some(component) => {
                component.set_extractor(extractor);
                self
            }
            None => self.fail(Error::key_definition(
                "with_extractor called before any key component was added",
            )),
        }
    }

    #[must_use]
    pub const fn is_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub const fn not_unique(mut self) -> Self {
        self.unique = false;
        self
    }

    pub fn build(self) -> Result<KeyDefinition, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }

        KeyDefinition::new(self.partition, self.clustering, self.unique)
    }

    fn push_partition(mut self, component: KeyComponent) -> Self {
        self.partition.push(component);
        self.last = Some(Slot::Partition);
        self
    }

    fn push_clustering(mut self, component: ClusteringKeyComponent) -> Self {
        self.clustering.push(component);
        self.last = Some(Slot::Clustering);
        self
    }

    // Keep the first failure; later calls cannot repair it.
    fn fail(mut self, err: Error) -> Self {
        self.error.get_or_insert(err);
        self
    }
}
