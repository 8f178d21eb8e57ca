use crate::{
    key::ClusteringOrder,
    session::{
        Batch, BoundStatement, COUNT_COLUMN, PagingState, PreparedStatement, ResultSet, Row,
        Session, StatementKind, StatementSpec, StorageError,
    },
    table::Table,
    value::Value,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

///
/// FailurePoint
///
/// Where an injected storage failure fires.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailurePoint {
    /// The next `COUNT` probe fails as unavailable.
    Probe,
    /// The next batch submission times out without applying anything.
    Batch,
    /// The next `COUNT` query answers without a count column.
    MissingCount,
}

///
/// MemorySession
///
/// In-process storage engine. Tables must be created before use, rows are
/// kept in clustering order, conditional writes report `[applied]`, and a
/// batch is applied to a copy of the state that only replaces the live state
/// when every statement succeeded.
///

#[derive(Default)]
pub struct MemorySession {
    state: Mutex<State>,
    failures: Mutex<VecDeque<FailurePoint>>,
    prepares: AtomicUsize,
    executions: AtomicUsize,
    batches: AtomicUsize,
}

impl MemorySession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Queue a failure for the next operation at `point`.
    pub fn fail_next(&self, point: FailurePoint) {
        self.failures.lock().push_back(point);
    }

    /// Number of statements prepared so far.
    #[must_use]
    pub fn prepare_count(&self) -> usize {
        self.prepares.load(Ordering::Relaxed)
    }

    /// Number of single statements executed so far.
    #[must_use]
    pub fn execute_count(&self) -> usize {
        self.executions.load(Ordering::Relaxed)
    }

    /// Number of batches submitted so far, applied or not.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn has_table(&self, table: &Table) -> bool {
        self.state.lock().tables.contains_key(&table.qualified_name())
    }

    /// Rows currently stored in `table`.
    #[must_use]
    pub fn row_count(&self, table: &Table) -> usize {
        self.state
            .lock()
            .tables
            .get(&table.qualified_name())
            .map_or(0, |data| data.rows.len())
    }

    fn take_failure(&self, point: FailurePoint) -> bool {
        let mut failures = self.failures.lock();
        match failures.iter().position(|pending| *pending == point) {
            Some(index) => {
                failures.remove(index);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    fn prepare(&self, spec: StatementSpec) -> Result<Arc<PreparedStatement>, StorageError> {
        let key_len = spec.table.keys().len();
        if let StatementKind::ReadPrefix(prefix) = spec.kind
            && (prefix == 0 || prefix > key_len)
        {
            return Err(StorageError::Prepare(format!(
                "prefix of {prefix} columns is invalid for a key of {key_len}"
            )));
        }

        let prepared = PreparedStatement::new(spec);
        let expected = prepared.kind().param_count(key_len);
        if prepared.param_count() != expected {
            return Err(StorageError::Prepare(format!(
                "'{}' has {} markers, expected {expected}",
                prepared.text(),
                prepared.param_count()
            )));
        }

        self.prepares.fetch_add(1, Ordering::Relaxed);

        Ok(Arc::new(prepared))
    }

    async fn execute(&self, statement: &BoundStatement) -> Result<ResultSet, StorageError> {
        tokio::task::yield_now().await;
        self.executions.fetch_add(1, Ordering::Relaxed);

        if statement.kind() == StatementKind::Count {
            if self.take_failure(FailurePoint::Probe) {
                return Err(StorageError::Unavailable(
                    "not enough replicas for COUNT".to_string(),
                ));
            }
            if self.take_failure(FailurePoint::MissingCount) {
                return Ok(ResultSet::empty());
            }
        }

        self.state.lock().apply(statement)
    }

    async fn execute_batch(&self, batch: &Batch) -> Result<ResultSet, StorageError> {
        tokio::task::yield_now().await;
        self.batches.fetch_add(1, Ordering::Relaxed);

        if self.take_failure(FailurePoint::Batch) {
            return Err(StorageError::Timeout(format!(
                "{} batch of {} statements",
                batch.batch_type(),
                batch.len()
            )));
        }

        let mut live = self.state.lock();
        let mut staged = live.clone();

        for statement in batch.statements() {
            if !statement.kind().is_write() {
                return Err(StorageError::Execution(format!(
                    "batch cannot contain '{}'",
                    statement.statement().text()
                )));
            }
            if !staged.apply(statement)?.was_applied() {
                return Ok(ResultSet::applied(false));
            }
        }

        *live = staged;

        if batch.is_conditional() {
            Ok(ResultSet::applied(true))
        } else {
            Ok(ResultSet::empty())
        }
    }
}

///
/// KeyPart
///
/// Key value ordered by its component's clustering direction.
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum KeyPart {
    Asc(Value),
    Desc(Reverse<Value>),
}

impl KeyPart {
    fn value(&self) -> &Value {
        match self {
            Self::Asc(value) | Self::Desc(Reverse(value)) => value,
        }
    }
}

#[derive(Clone, Debug)]
struct StoredRow {
    object: Value,
    type_tag: Value,
    metadata: Value,
    created_at: Value,
    updated_at: Value,
}

impl StoredRow {
    fn project(&self) -> Row {
        Row::new()
            .with(crate::columns::OBJECT, self.object.clone())
            .with(crate::columns::TYPE, self.type_tag.clone())
            .with(crate::columns::METADATA, self.metadata.clone())
            .with(crate::columns::CREATED_AT, self.created_at.clone())
            .with(crate::columns::UPDATED_AT, self.updated_at.clone())
    }
}

#[derive(Clone, Debug)]
struct TableData {
    table: Table,
    rows: BTreeMap<Vec<KeyPart>, StoredRow>,
}

impl TableData {
    fn key(&self, values: &[Value]) -> Result<Vec<KeyPart>, StorageError> {
        let keys = self.table.keys();
        let partition = keys.partition_keys().len();
        let clustering = keys.clustering_keys();

        values
            .iter()
            .zip(keys.components())
            .enumerate()
            .map(|(i, (value, component))| {
                if value.is_null() {
                    return Err(StorageError::Execution(format!(
                        "invalid null value for key column '{}'",
                        component.column()
                    )));
                }

                let descending = i
                    .checked_sub(partition)
                    .and_then(|c| clustering.get(c))
                    .is_some_and(|c| c.order() == ClusteringOrder::Descending);

                Ok(if descending {
                    KeyPart::Desc(Reverse(value.clone()))
                } else {
                    KeyPart::Asc(value.clone())
                })
            })
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
struct State {
    tables: HashMap<String, TableData>,
}

impl State {
    fn apply(&mut self, statement: &BoundStatement) -> Result<ResultSet, StorageError> {
        let prepared = statement.statement();
        let name = prepared.table().qualified_name();
        let values = statement.values();

        match prepared.kind() {
            StatementKind::CreateTable => {
                self.tables.entry(name).or_insert_with(|| TableData {
                    table: prepared.table().clone(),
                    rows: BTreeMap::new(),
                });
                return Ok(ResultSet::empty());
            }
            StatementKind::DropTable => {
                self.tables.remove(&name);
                return Ok(ResultSet::empty());
            }
            _ => {}
        }

        let data = self
            .tables
            .get_mut(&name)
            .ok_or_else(|| StorageError::Execution(format!("unconfigured table {name}")))?;
        let key_len = data.table.keys().len();
        let expected = prepared.kind().param_count(key_len);
        if values.len() != expected {
            return Err(StorageError::Bind {
                expected,
                found: values.len(),
            });
        }

        match prepared.kind() {
            StatementKind::Insert { conditional } => {
                let key = data.key(&values[..key_len])?;
                if conditional && data.rows.contains_key(&key) {
                    return Ok(ResultSet::applied(false));
                }

                let fields = &values[key_len..];
                data.rows.insert(
                    key,
                    StoredRow {
                        object: fields[0].clone(),
                        type_tag: fields[1].clone(),
                        metadata: fields[2].clone(),
                        created_at: fields[3].clone(),
                        updated_at: fields[4].clone(),
                    },
                );

                Ok(write_result(conditional, true))
            }

            StatementKind::Update { conditional } => {
                let key = data.key(&values[UPDATE_FIELDS..])?;
                if conditional && !data.rows.contains_key(&key) {
                    return Ok(ResultSet::applied(false));
                }

                let row = data.rows.entry(key).or_insert_with(|| StoredRow {
                    object: Value::Null,
                    type_tag: Value::Null,
                    metadata: Value::Null,
                    created_at: Value::Null,
                    updated_at: Value::Null,
                });
                row.object = values[0].clone();
                row.type_tag = values[1].clone();
                row.metadata = values[2].clone();
                row.updated_at = values[3].clone();

                Ok(write_result(conditional, true))
            }

            StatementKind::Delete { conditional } => {
                let key = data.key(values)?;
                let removed = data.rows.remove(&key).is_some();

                Ok(write_result(conditional, removed))
            }

            StatementKind::Count => {
                let key = data.key(values)?;
                let count = i64::from(data.rows.contains_key(&key));

                Ok(ResultSet::new(vec![Row::new().with(COUNT_COLUMN, count)]))
            }

            StatementKind::Read => {
                let key = data.key(values)?;
                let rows = data.rows.get(&key).map(StoredRow::project);

                Ok(ResultSet::new(rows.into_iter().collect()))
            }

            StatementKind::ReadPrefix(_) => {
                let offset = page_offset(statement.paging_state())?;
                let mut rows = data
                    .rows
                    .iter()
                    .filter(|(key, _)| {
                        key.iter()
                            .map(KeyPart::value)
                            .zip(values)
                            .all(|(stored, wanted)| stored == wanted)
                    })
                    .skip(offset)
                    .map(|(_, row)| row.project());

                let Some(size) = statement.fetch_size().filter(|size| *size > 0) else {
                    return Ok(ResultSet::new(rows.collect()));
                };

                let page = rows.by_ref().take(size).collect();
                let result = ResultSet::new(page);
                if rows.next().is_none() {
                    return Ok(result);
                }

                Ok(result.with_paging_state(next_page(offset + size)?))
            }

            StatementKind::CreateTable | StatementKind::DropTable => Ok(ResultSet::empty()),
        }
    }
}

// Paging states are the big-endian row offset into the matching rows.
fn page_offset(state: Option<&PagingState>) -> Result<usize, StorageError> {
    let Some(state) = state else {
        return Ok(0);
    };
    let bytes: [u8; 8] = state
        .as_bytes()
        .try_into()
        .map_err(|_| StorageError::Execution("malformed paging state".to_string()))?;

    usize::try_from(u64::from_be_bytes(bytes))
        .map_err(|_| StorageError::Execution("paging state out of range".to_string()))
}

fn next_page(offset: usize) -> Result<PagingState, StorageError> {
    let offset = u64::try_from(offset)
        .map_err(|_| StorageError::Execution("paging state out of range".to_string()))?;

    Ok(PagingState::new(offset.to_be_bytes().to_vec()))
}

// Leading SET values of an update: object, type, metadata, updated_at.
const UPDATE_FIELDS: usize = 4;

fn write_result(conditional: bool, applied: bool) -> ResultSet {
    if conditional {
        ResultSet::applied(applied)
    } else {
        ResultSet::empty()
    }
}
