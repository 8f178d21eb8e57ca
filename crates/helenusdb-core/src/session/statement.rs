use crate::{
    session::{PagingState, StorageError},
    table::Table,
    value::Value,
};
use derive_more::Display;
use std::sync::Arc;

///
/// StatementKind
///
/// What a prepared statement does, so a session can interpret bound values
/// without parsing the statement text.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatementKind {
    Count,
    CreateTable,
    Delete { conditional: bool },
    DropTable,
    Insert { conditional: bool },
    Read,
    ReadPrefix(usize),
    Update { conditional: bool },
}

impl StatementKind {
    /// Number of bound values a statement of this kind takes for a key of
    /// `key_len` columns.
    #[must_use]
    pub const fn param_count(self, key_len: usize) -> usize {
        match self {
            Self::CreateTable | Self::DropTable => 0,
            Self::Count | Self::Delete { .. } | Self::Read => key_len,
            Self::Insert { .. } => key_len + 5,
            Self::ReadPrefix(prefix) => prefix,
            Self::Update { .. } => key_len + 4,
        }
    }

    #[must_use]
    pub const fn is_conditional(self) -> bool {
        matches!(
            self,
            Self::Delete { conditional: true }
                | Self::Insert { conditional: true }
                | Self::Update { conditional: true }
        )
    }

    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Self::Delete { .. } | Self::Insert { .. } | Self::Update { .. }
        )
    }
}

///
/// StatementSpec
///
/// Statement text plus the table and kind it was generated for.
///

#[derive(Clone, Debug)]
pub struct StatementSpec {
    pub text: String,
    pub kind: StatementKind,
    pub table: Arc<Table>,
}

impl StatementSpec {
    pub fn new(text: impl Into<String>, kind: StatementKind, table: Arc<Table>) -> Self {
        Self {
            text: text.into(),
            kind,
            table,
        }
    }
}

///
/// PreparedStatement
///

#[derive(Debug)]
pub struct PreparedStatement {
    spec: StatementSpec,
    params: usize,
}

impl PreparedStatement {
    /// Count the positional markers in the statement text.
    #[must_use]
    pub fn new(spec: StatementSpec) -> Self {
        let params = spec.text.matches('?').count();

        Self { spec, params }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.spec.text
    }

    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.spec.kind
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        &self.spec.table
    }

    #[must_use]
    pub const fn param_count(&self) -> usize {
        self.params
    }

    /// Bind positional values; the count must match the statement.
    pub fn bind(self: &Arc<Self>, values: Vec<Value>) -> Result<BoundStatement, StorageError> {
        if values.len() != self.params {
            return Err(StorageError::Bind {
                expected: self.params,
                found: values.len(),
            });
        }

        Ok(BoundStatement {
            statement: Arc::clone(self),
            values,
            fetch_size: None,
            paging_state: None,
        })
    }
}

///
/// BoundStatement
///

#[derive(Clone, Debug)]
pub struct BoundStatement {
    statement: Arc<PreparedStatement>,
    values: Vec<Value>,
    fetch_size: Option<usize>,
    paging_state: Option<PagingState>,
}

impl BoundStatement {
    /// Cap the rows returned per page.
    #[must_use]
    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = Some(fetch_size);
        self
    }

    /// Resume a paged read; `None` starts from the first row.
    #[must_use]
    pub fn with_paging_state(mut self, state: Option<PagingState>) -> Self {
        self.paging_state = state;
        self
    }

    #[must_use]
    pub const fn fetch_size(&self) -> Option<usize> {
        self.fetch_size
    }

    #[must_use]
    pub const fn paging_state(&self) -> Option<&PagingState> {
        self.paging_state.as_ref()
    }

    #[must_use]
    pub fn statement(&self) -> &PreparedStatement {
        &self.statement
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.statement.kind()
    }
}

///
/// BatchType
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum BatchType {
    #[default]
    #[display("LOGGED")]
    Logged,
    #[display("UNLOGGED")]
    Unlogged,
}

///
/// Batch
///
/// Write statements submitted together, in order.
///

#[derive(Clone, Debug, Default)]
pub struct Batch {
    batch_type: BatchType,
    statements: Vec<BoundStatement>,
}

impl Batch {
    #[must_use]
    pub const fn new(batch_type: BatchType) -> Self {
        Self {
            batch_type,
            statements: Vec::new(),
        }
    }

    pub fn add(&mut self, statement: BoundStatement) {
        self.statements.push(statement);
    }

    #[must_use]
    pub const fn batch_type(&self) -> BatchType {
        self.batch_type
    }

    #[must_use]
    pub fn statements(&self) -> &[BoundStatement] {
        &self.statements
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    #[must_use]
    pub fn is_conditional(&self) -> bool {
        self.statements
            .iter()
            .any(|statement| statement.kind().is_conditional())
    }
}

impl Extend<BoundStatement> for Batch {
    fn extend<I: IntoIterator<Item = BoundStatement>>(&mut self, iter: I) {
        self.statements.extend(iter);
    }
}
