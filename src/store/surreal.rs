use async_trait::async_trait;
use serde_json::Value;
use surrealdb::{
    Surreal,
    engine::any::{self, Any},
    opt::auth::Root,
};
use tracing::info;

use super::{Direction, Predicate, Query, RecordStore, Row, check_field_name, reject_immutable};
use crate::{
    config::Config,
    consts::store_const::UNIQUE_FIELDS,
    errors::{Error, Result},
    utils::time::time_now,
};

const COUNTER_TABLE: &str = "counters";

/// Rows keep a numeric record key; `record::id(id)` flattens it back to `id` on the way out.
const PROJECTION: &str = "SELECT *, record::id(id) AS id";

#[derive(Debug, Clone)]
pub struct SurrealStore {
    sdb: Surreal<Any>,
}

impl SurrealStore {
    pub async fn connect(config: &Config) -> Result<Self> {
        let sdb = any::connect(config.store_url.as_str()).await?;
        sdb.signin(Root {
            username: &config.store_username,
            password: &config.store_password,
        })
        .await?;
        sdb.use_ns(&config.store_namespace)
            .use_db(&config.store_database)
            .await?;
        info!("Connected to SurrealDB at {}", config.store_url);
        let store = Self { sdb };
        store.define_indexes().await?;
        Ok(store)
    }

    async fn define_indexes(&self) -> Result<()> {
        for (table, field) in UNIQUE_FIELDS {
            self.sdb
                .query(format!(
                    "DEFINE INDEX IF NOT EXISTS {} ON TABLE {table} FIELDS {field} UNIQUE;",
                    index_name(table, field)
                ))
                .await?
                .check()?;
        }
        Ok(())
    }

    async fn next_id(&self, table: &str) -> Result<i64> {
        let id: Option<i64> = self
            .sdb
            .query("UPSERT type::thing($counters, $table) SET seq += 1 RETURN VALUE seq;")
            .bind(("counters", COUNTER_TABLE))
            .bind(("table", table.to_string()))
            .await?
            .take(0)?;
        id.ok_or(Error::Unknown)
    }
}

fn index_name(table: &str, field: &str) -> String {
    format!("{table}_{field}_unique")
}

/// Maps a unique index violation on `table` to [`Error::Duplicate`].
fn duplicate_or(error: surrealdb::Error, table: &str) -> Error {
    let message = error.to_string();
    if !message.contains("already contains") {
        return error.into();
    }
    let field = UNIQUE_FIELDS
        .iter()
        .filter(|(t, _)| *t == table)
        .find(|(t, f)| message.contains(&index_name(t, f)))
        .map(|(t, f)| format!("{t}.{f}"));
    Error::Duplicate(field.unwrap_or_else(|| table.to_string()))
}

fn into_rows(values: Vec<Value>) -> Vec<Row> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// Builds the WHERE/ORDER tail; predicate values are bound as `$p0..$pn`.
fn render_query(query: &Query) -> Result<String> {
    for field in query.fields() {
        check_field_name(field)?;
    }
    let clauses: Vec<String> = query
        .predicates
        .iter()
        .enumerate()
        .map(|(i, predicate)| match predicate {
            Predicate::Eq(f, _) => format!("{f} = $p{i}"),
            Predicate::Gte(f, _) => format!("{f} >= $p{i}"),
            Predicate::Lte(f, _) => format!("{f} <= $p{i}"),
            Predicate::ILike(f, _) => {
                format!("string::lowercase(<string> ({f} ?? '')) CONTAINS string::lowercase($p{i})")
            }
        })
        .collect();

    let mut sql = format!("{PROJECTION} FROM type::table($table)");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    match &query.order {
        Some((field, Direction::Asc)) => sql.push_str(&format!(" ORDER BY {field} ASC")),
        Some((field, Direction::Desc)) => sql.push_str(&format!(" ORDER BY {field} DESC")),
        None => sql.push_str(" ORDER BY id ASC"),
    }
    sql.push(';');
    Ok(sql)
}

#[async_trait]
impl RecordStore for SurrealStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        let sql = render_query(query)?;
        let mut request = self.sdb.query(sql).bind(("table", table.to_string()));
        for (i, predicate) in query.predicates.iter().enumerate() {
            let value = match predicate {
                Predicate::Eq(_, v) | Predicate::Gte(_, v) | Predicate::Lte(_, v) => v.clone(),
                Predicate::ILike(_, needle) => Value::String(needle.clone()),
            };
            request = request.bind((format!("p{i}"), value));
        }
        let rows: Vec<Value> = request.await?.take(0)?;
        Ok(into_rows(rows))
    }

    async fn get(&self, table: &str, id: i64) -> Result<Option<Row>> {
        let rows: Vec<Value> = self
            .sdb
            .query(format!("{PROJECTION} FROM type::thing($table, $id);"))
            .bind(("table", table.to_string()))
            .bind(("id", id))
            .await?
            .take(0)?;
        Ok(into_rows(rows).into_iter().next())
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row> {
        row.remove("id");
        let id = self.next_id(table).await?;
        self.sdb
            .query("CREATE type::thing($table, $id) CONTENT $row RETURN NONE;")
            .bind(("table", table.to_string()))
            .bind(("id", id))
            .bind(("row", Value::Object(row)))
            .await?
            .check()
            .map_err(|e| duplicate_or(e, table))?;
        self.get(table, id).await?.ok_or(Error::Unknown)
    }

    async fn update(&self, table: &str, id: i64, mut patch: Row) -> Result<Row> {
        reject_immutable(&patch)?;
        patch.insert("updated_at".into(), time_now().into());
        if self.get(table, id).await?.is_none() {
            return Err(Error::NotFound("Record"));
        }
        self.sdb
            .query("UPDATE type::thing($table, $id) MERGE $patch RETURN NONE;")
            .bind(("table", table.to_string()))
            .bind(("id", id))
            .bind(("patch", Value::Object(patch)))
            .await?
            .check()
            .map_err(|e| duplicate_or(e, table))?;
        self.get(table, id).await?.ok_or(Error::NotFound("Record"))
    }

    async fn delete(&self, table: &str, id: i64) -> Result<()> {
        if self.get(table, id).await?.is_none() {
            return Err(Error::NotFound("Record"));
        }
        self.sdb
            .query("DELETE type::thing($table, $id) RETURN NONE;")
            .bind(("table", table.to_string()))
            .bind(("id", id))
            .await?
            .check()?;
        Ok(())
    }
}
