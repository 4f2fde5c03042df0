//! Record store boundary.
//!
//! Every table is a bag of JSON rows keyed by a numeric `id`. Backends only
//! speak [`Row`]s; [`Collection`] layers typed access on top for a [`Record`].

use std::{marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    consts::store_const::{IMMUTABLE_FIELDS, MEMBER_TABLE},
    errors::{Error, Result},
    models::{member::MemberRecord, user::Identity},
    utils::time::time_now,
};

pub mod memory;
pub mod surreal;
#[cfg(test)]
pub mod testing;

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    /// Case-insensitive substring match.
    ILike(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub order: Option<(String, Direction)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Eq(field.into(), value.into()));
        self
    }

    pub fn gte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Gte(field.into(), value.into()));
        self
    }

    pub fn lte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Lte(field.into(), value.into()));
        self
    }

    pub fn ilike(mut self, field: &str, needle: &str) -> Self {
        self.predicates.push(Predicate::ILike(field.into(), needle.into()));
        self
    }

    pub fn order(mut self, field: &str, direction: Direction) -> Self {
        self.order = Some((field.into(), direction));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.predicates
            .iter()
            .map(|p| match p {
                Predicate::Eq(f, _) | Predicate::Gte(f, _) | Predicate::Lte(f, _) | Predicate::ILike(f, _) => {
                    f.as_str()
                }
            })
            .chain(self.order.iter().map(|(f, _)| f.as_str()))
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>>;

    async fn get(&self, table: &str, id: i64) -> Result<Option<Row>>;

    /// Assigns the row a fresh `id`; any `id` in `row` is ignored.
    /// Fails with [`Error::Duplicate`] when a unique field is already taken.
    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Merges `patch` into the row and stamps `updated_at`.
    async fn update(&self, table: &str, id: i64, patch: Row) -> Result<Row>;

    async fn delete(&self, table: &str, id: i64) -> Result<()>;

    /// Creates the member record linked to `identity` when none exists yet.
    ///
    /// A concurrent caller that wins the insert leaves this one with a unique
    /// violation; the row it created is returned instead.
    async fn ensure_member_for(&self, identity: &Identity) -> Result<MemberRecord> {
        let query = Query::new().eq("user_id", identity.id);
        if let Some(row) = self.select(MEMBER_TABLE, &query).await?.into_iter().next() {
            return from_row(row);
        }
        info!("provisioning member record for user {}", identity.id);
        match self.insert(MEMBER_TABLE, new_member_row(identity)).await {
            Ok(row) => from_row(row),
            Err(Error::Duplicate(_)) => {
                let row = self.select(MEMBER_TABLE, &query).await?.into_iter().next();
                from_row(row.ok_or(Error::NotFound("Member"))?)
            }
            Err(e) => Err(e),
        }
    }
}

/// The row a fresh member record starts from.
pub fn new_member_row(identity: &Identity) -> Row {
    let now = time_now();
    let mut row = Row::new();
    row.insert("user_id".into(), identity.id.into());
    row.insert("email_1".into(), identity.email.clone().into());
    row.insert("created_at".into(), now.clone().into());
    row.insert("updated_at".into(), now.into());
    row
}

/// Rejects a patch that touches identifier, linkage or timestamp fields.
pub fn reject_immutable(patch: &Row) -> Result<()> {
    match IMMUTABLE_FIELDS.iter().find(|field| patch.contains_key(**field)) {
        Some(field) => Err(Error::ImmutableField(field.to_string())),
        None => Ok(()),
    }
}

/// Field names end up inside query text, so only plain identifiers are allowed.
pub fn check_field_name(field: &str) -> Result<()> {
    let valid = !field.is_empty()
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !field.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(Error::invalid(format!("Unknown field `{field}`")))
    }
}

pub fn to_row<T: Serialize>(value: &T) -> Result<Row> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::invalid("Record must be an object")),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const NAME: &'static str;

    fn id(&self) -> i64;

    /// Local checks run before any write leaves the process.
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Typed handle over one table.
pub struct Collection<T> {
    store: Arc<dyn RecordStore>,
    _record: PhantomData<T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub async fn list(&self, query: &Query) -> Result<Vec<T>> {
        self.store
            .select(T::TABLE, query)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }

    pub async fn find(&self, query: &Query) -> Result<Option<T>> {
        Ok(self.list(query).await?.into_iter().next())
    }

    pub async fn get(&self, id: i64) -> Result<Option<T>> {
        self.store.get(T::TABLE, id).await?.map(from_row).transpose()
    }

    pub async fn require(&self, id: i64) -> Result<T> {
        self.get(id).await?.ok_or(Error::NotFound(T::NAME))
    }

    pub async fn insert<N: Serialize>(&self, new: &N) -> Result<T> {
        from_row(self.store.insert(T::TABLE, to_row(new)?).await?)
    }

    pub async fn update(&self, id: i64, patch: Row) -> Result<T> {
        from_row(self.store.update(T::TABLE, id, patch).await?)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.store.delete(T::TABLE, id).await
    }
}
