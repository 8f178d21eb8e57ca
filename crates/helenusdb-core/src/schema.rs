use crate::{
    columns,
    error::{Error, ErrorOrigin},
    session::{Session, StatementKind, StatementSpec},
    table::{PrimaryTable, Table},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

///
/// SchemaProvider
///
/// Renders the DDL scripts for document tables. Every table carries its key
/// columns followed by the document columns.
///

pub struct SchemaProvider;

impl SchemaProvider {
    #[must_use]
    pub fn create_script(table: &Table) -> String {
        let keys = table.keys();
        let mut script = format!(
            "CREATE TABLE IF NOT EXISTS {} ({}, {}, PRIMARY KEY ({}))",
            table.qualified_name(),
            keys.as_columns(),
            columns::DECLARATIONS,
            keys.as_primary_key(),
        );

        let mut options = Vec::new();
        if keys.has_clustering() {
            options.push(keys.as_clustering_key());
        }
        if table.ttl() > 0 {
            options.push(format!("default_time_to_live = {}", table.ttl()));
        }
        if !options.is_empty() {
            script.push_str(" WITH ");
            script.push_str(&options.join(" AND "));
        }

        script
    }

    #[must_use]
    pub fn drop_script(table: &Table) -> String {
        format!("DROP TABLE IF EXISTS {}", table.qualified_name())
    }
}

///
/// SchemaWriter
///
/// Executes schema scripts for a primary table and its views through the
/// writer's session. Existing tables are left untouched.
///

#[async_trait]
pub trait SchemaWriter: Send + Sync {
    fn schema_session(&self) -> &dyn Session;

    async fn ensure_tables(&self, primary: &PrimaryTable) -> Result<(), Error> {
        for table in primary.tables() {
            debug!(table = %table, "ensuring table");
            run_script(
                self.schema_session(),
                table,
                SchemaProvider::create_script(table),
                StatementKind::CreateTable,
            )
            .await?;
        }

        Ok(())
    }

    async fn drop_tables(&self, primary: &PrimaryTable) -> Result<(), Error> {
        for table in primary.tables() {
            debug!(table = %table, "dropping table");
            run_script(
                self.schema_session(),
                table,
                SchemaProvider::drop_script(table),
                StatementKind::DropTable,
            )
            .await?;
        }

        Ok(())
    }
}

///
/// SessionSchemaWriter
///

pub struct SessionSchemaWriter {
    session: Arc<dyn Session>,
}

impl SessionSchemaWriter {
    #[must_use]
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self { session }
    }
}

impl SchemaWriter for SessionSchemaWriter {
    fn schema_session(&self) -> &dyn Session {
        self.session.as_ref()
    }
}

async fn run_script(
    session: &dyn Session,
    table: &Table,
    script: String,
    kind: StatementKind,
) -> Result<(), Error> {
    let storage = |err| Error::storage(ErrorOrigin::Schema, err);
    let spec = StatementSpec::new(script, kind, Arc::new(table.clone()));
    let statement = session.prepare(spec).map_err(storage)?.bind(Vec::new()).map_err(storage)?;
    session.execute(&statement).await.map_err(storage)?;

    Ok(())
}

///
/// TESTS
///
