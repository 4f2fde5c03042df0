//! Store doubles wrapping [`MemoryStore`].

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use super::{Query, RecordStore, Row, memory::MemoryStore};
use crate::errors::{Error, Result};

/// Answers every read after a pause, like a store across the network.
pub struct DelayedStore {
    pub inner: Arc<MemoryStore>,
    pub delay: Duration,
}

impl DelayedStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            delay: Duration::from_millis(20),
        }
    }
}

#[async_trait]
impl RecordStore for DelayedStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        let rows = self.inner.select(table, query).await;
        tokio::time::sleep(self.delay).await;
        rows
    }

    async fn get(&self, table: &str, id: i64) -> Result<Option<Row>> {
        let row = self.inner.get(table, id).await;
        tokio::time::sleep(self.delay).await;
        row
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, id: i64, patch: Row) -> Result<Row> {
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: i64) -> Result<()> {
        self.inner.delete(table, id).await
    }
}

/// Refuses every insert into one table and passes everything else through.
pub struct FailingStore {
    pub inner: Arc<MemoryStore>,
    pub table: &'static str,
}

impl FailingStore {
    pub fn new(inner: Arc<MemoryStore>, table: &'static str) -> Self {
        Self { inner, table }
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        self.inner.select(table, query).await
    }

    async fn get(&self, table: &str, id: i64) -> Result<Option<Row>> {
        self.inner.get(table, id).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        if table == self.table {
            return Err(Error::IoError(std::io::Error::other(format!("{table} is unavailable"))));
        }
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, id: i64, patch: Row) -> Result<Row> {
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: i64) -> Result<()> {
        self.inner.delete(table, id).await
    }
}
