use crate::{
    session::{APPLIED_COLUMN, COUNT_COLUMN},
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// PagingState
///
/// Opaque position after the last row of a page. Only the session that
/// produced it knows how to read it.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PagingState(Vec<u8>);

impl PagingState {
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

///
/// Row
///
/// Named column values in projection order.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.columns.get(index).map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

///
/// ResultSet
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResultSet {
    rows: Vec<Row>,
    paging_state: Option<PagingState>,
}

impl ResultSet {
    #[must_use]
    pub const fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            paging_state: None,
        }
    }

    /// Mark the result as one page of a larger read.
    #[must_use]
    pub fn with_paging_state(mut self, state: PagingState) -> Self {
        self.paging_state = Some(state);
        self
    }

    /// Where the next page starts; `None` on the last page.
    #[must_use]
    pub const fn paging_state(&self) -> Option<&PagingState> {
        self.paging_state.as_ref()
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Single-row result of a conditional write.
    #[must_use]
    pub fn applied(applied: bool) -> Self {
        Self::new(vec![Row::new().with(APPLIED_COLUMN, applied)])
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    #[must_use]
    pub fn one(&self) -> Option<&Row> {
        self.rows.first()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row count reported by a `COUNT(*)` probe.
    #[must_use]
    pub fn count(&self) -> Option<i64> {
        self.one()?.get(COUNT_COLUMN)?.as_i64()
    }

    /// False only when the engine reported a conditional write as not
    /// applied; results without an `[applied]` column count as applied.
    #[must_use]
    pub fn was_applied(&self) -> bool {
        self.one()
            .and_then(|row| row.get(APPLIED_COLUMN))
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }
}
