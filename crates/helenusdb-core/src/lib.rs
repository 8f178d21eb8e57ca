//! Core runtime for HelenusDB: key definitions, documents, statement
//! factories, change tracking, and the unit of work that commits registered
//! changes as one atomic batch.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod change;
pub mod codec;
pub mod commit;
pub mod document;
pub mod error;
pub mod key;
pub mod repository;
pub mod schema;
pub mod session;
pub mod statement;
pub mod table;
pub mod unit_of_work;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

pub use error::Error;

///
/// Document columns
///
/// Non-key columns every document table carries, in insert order.
///

pub mod columns {
    pub const OBJECT: &str = "object";
    pub const TYPE: &str = "type";
    pub const METADATA: &str = "metadata";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";

    /// Column declarations appended after the key columns.
    pub const DECLARATIONS: &str =
        "object blob, type text, metadata map<text,text>, created_at timestamp, updated_at timestamp";

    /// Columns projected by document reads.
    pub const PROJECTION: &str = "object, type, metadata, created_at, updated_at";
}

///
/// Prelude
///
/// Domain vocabulary only; sessions, factories and errors are imported from
/// their modules.
///

pub mod prelude {
    pub use crate::{
        change::EntityState,
        document::{Document, DocumentObserver},
        key::{ClusteringOrder, Identifier, KeyDefinition, PropertyAccess},
        table::{PrimaryTable, Table},
        unit_of_work::UnitOfWork,
        value::{DataType, Value},
    };
}
