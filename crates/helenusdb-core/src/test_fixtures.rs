use crate::{
    key::{ClusteringOrder, KeyDefinition, PropertyAccess},
    schema::SchemaWriter,
    session::MemorySession,
    table::{PrimaryTable, Table},
    value::{DataType, Value},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub(crate) const KEYSPACE: &str = "garden";

///
/// Flower
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct Flower {
    pub(crate) id: Uuid,
    pub(crate) account_id: Uuid,
    pub(crate) name: String,
    pub(crate) petals: i32,
}

impl Flower {
    pub(crate) fn new(account_id: Uuid, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            name: name.to_string(),
            petals: 5,
        }
    }
}

impl PropertyAccess for Flower {
    fn property(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.into()),
            "account_id" => Some(self.account_id.into()),
            "name" => Some(self.name.clone().into()),
            "petals" => Some(self.petals.into()),
            _ => None,
        }
    }
}

pub(crate) fn flowers_by_id() -> Table {
    let keys = KeyDefinition::builder()
        .with_partition_key("id", DataType::Uuid)
        .is_unique()
        .build()
        .expect("flowers key should build");

    Table::new(KEYSPACE, "flowers", keys).expect("flowers table should build")
}

pub(crate) fn flowers_by_name() -> Table {
    let keys = KeyDefinition::builder()
        .with_partition_key("account_id", DataType::Uuid)
        .with_clustering_key("name", DataType::Text, ClusteringOrder::Ascending)
        .is_unique()
        .build()
        .expect("flowers_by_name key should build");

    Table::new(KEYSPACE, "flowers_by_name", keys).expect("flowers_by_name table should build")
}

/// Non-unique view: several flowers may share a petal count.
pub(crate) fn flowers_by_petals() -> Table {
    let keys = KeyDefinition::builder()
        .with_partition_key("account_id", DataType::Uuid)
        .with_clustering_key("petals", DataType::Int, ClusteringOrder::Descending)
        .with_clustering_key("id", DataType::Uuid, ClusteringOrder::Ascending)
        .build()
        .expect("flowers_by_petals key should build");

    Table::new(KEYSPACE, "flowers_by_petals", keys).expect("flowers_by_petals table should build")
}

pub(crate) fn flower_tables() -> PrimaryTable {
    PrimaryTable::new(flowers_by_id())
        .with_view(flowers_by_name())
        .expect("flowers_by_name should attach")
}

/// Session with every table of `primary` created.
pub(crate) async fn session_for(primary: &PrimaryTable) -> Arc<MemorySession> {
    let session = MemorySession::shared();
    let writer = crate::schema::SessionSchemaWriter::new(session.clone());
    writer
        .ensure_tables(primary)
        .await
        .expect("tables should be created");

    session
}
