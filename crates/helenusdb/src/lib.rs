//! ## Crate layout
//! - `core`: keys, documents, statement factories, change tracking, the unit
//!   of work, commit strategies, and the document repository.
//! - `config`: TOML configuration for keyspaces, table TTLs, and batch types.
//!
//! The `prelude` module carries what application code needs to define tables
//! and persist entities.

pub use helenusdb_config as config;
pub use helenusdb_core as core;

/// re-exports
///
/// entity crates implementing the session or codec traits need these without
/// listing them in their own Cargo.toml
pub mod __reexports {
    pub use async_trait;
    pub use serde;
    pub use uuid;
}

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::core::Error;

///
/// Prelude
///

pub mod prelude {
    pub use crate::config::{Config, UnitOfWorkMode};
    pub use crate::core::{
        codec::{CborCodec, JsonCodec, ObjectCodec},
        commit::UnitOfWorkType,
        prelude::*,
        repository::{DocumentRepository, Page},
        schema::SchemaWriter as _,
        session::{MemorySession, PagingState, Session},
        unit_of_work::DocumentUnitOfWork,
    };
    pub use serde::{Deserialize, Serialize};
}
