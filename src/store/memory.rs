use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use tracing::info;

use super::{
    Direction, Predicate, Query, RecordStore, Row, check_field_name, from_row, new_member_row,
    reject_immutable,
};
use crate::{
    consts::store_const::{MEMBER_TABLE, UNIQUE_FIELDS},
    errors::{Error, Result},
    models::{member::MemberRecord, user::Identity},
    utils::time::time_now,
};

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Row>,
}

impl Table {
    /// The first unique field of `name` whose value in `row` is already taken.
    fn taken(&self, name: &str, row: &Row) -> Option<String> {
        UNIQUE_FIELDS
            .iter()
            .filter(|(table, _)| *table == name)
            .find(|(_, field)| match row.get(*field) {
                None | Some(Value::Null) => false,
                Some(value) => self.rows.values().any(|other| other.get(*field) == Some(value)),
            })
            .map(|(table, field)| format!("{table}.{field}"))
    }

    fn push(&mut self, name: &str, mut row: Row) -> Result<Row> {
        if let Some(taken) = self.taken(name, &row) {
            return Err(Error::Duplicate(taken));
        }
        self.next_id += 1;
        let id = self.next_id;
        row.insert("id".into(), id.into());
        self.rows.insert(id, row.clone());
        Ok(row)
    }
}

/// In-process store used for local runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of insert/update/delete calls that reached the store.
    pub fn writes(&self) -> u64 {
        self.writes.load(AtomicOrdering::Relaxed)
    }

    pub async fn count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .await
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn matches(row: &Row, predicate: &Predicate) -> bool {
    let field = |name: &str| row.get(name).unwrap_or(&Value::Null);
    match predicate {
        Predicate::Eq(name, value) => field(name) == value,
        Predicate::Gte(name, value) => {
            matches!(compare(field(name), value), Some(Ordering::Greater | Ordering::Equal))
        }
        Predicate::Lte(name, value) => {
            matches!(compare(field(name), value), Some(Ordering::Less | Ordering::Equal))
        }
        Predicate::ILike(name, needle) => as_text(field(name))
            .map(|text| text.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
    }
}

fn order_rows(rows: &mut [Row], field: &str, direction: Direction) {
    rows.sort_by(|a, b| {
        let a = a.get(field).unwrap_or(&Value::Null);
        let b = b.get(field).unwrap_or(&Value::Null);
        let ordering = match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare(a, b).unwrap_or(Ordering::Equal),
        };
        match direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    });
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        for field in query.fields() {
            check_field_name(field)?;
        }
        let tables = self.tables.lock().await;
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|t| {
                t.rows
                    .values()
                    .filter(|row| query.predicates.iter().all(|p| matches(row, p)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some((field, direction)) = &query.order {
            order_rows(&mut rows, field, *direction);
        }
        Ok(rows)
    }

    async fn get(&self, table: &str, id: i64) -> Result<Option<Row>> {
        let tables = self.tables.lock().await;
        Ok(tables.get(table).and_then(|t| t.rows.get(&id)).cloned())
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.writes.fetch_add(1, AtomicOrdering::Relaxed);
        let mut tables = self.tables.lock().await;
        tables.entry(table.to_string()).or_default().push(table, row)
    }

    async fn update(&self, table: &str, id: i64, mut patch: Row) -> Result<Row> {
        self.writes.fetch_add(1, AtomicOrdering::Relaxed);
        reject_immutable(&patch)?;
        patch.insert("updated_at".into(), time_now().into());
        let mut tables = self.tables.lock().await;
        let row = tables
            .get_mut(table)
            .and_then(|t| t.rows.get_mut(&id))
            .ok_or(Error::NotFound("Record"))?;
        row.extend(patch);
        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: i64) -> Result<()> {
        self.writes.fetch_add(1, AtomicOrdering::Relaxed);
        let mut tables = self.tables.lock().await;
        tables
            .get_mut(table)
            .and_then(|t| t.rows.remove(&id))
            .map(|_| ())
            .ok_or(Error::NotFound("Record"))
    }

    /// Lookup and insert happen under one lock.
    async fn ensure_member_for(&self, identity: &Identity) -> Result<MemberRecord> {
        let mut tables = self.tables.lock().await;
        let table = tables.entry(MEMBER_TABLE.to_string()).or_default();
        let user_id = Value::from(identity.id);
        if let Some(row) = table.rows.values().find(|row| row.get("user_id") == Some(&user_id)) {
            return from_row(row.clone());
        }
        self.writes.fetch_add(1, AtomicOrdering::Relaxed);
        info!("provisioning member record for user {}", identity.id);
        from_row(table.push(MEMBER_TABLE, new_member_row(identity))?)
    }
}
