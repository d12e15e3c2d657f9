//! In-memory storage backend for testing and development

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::Storage;
use crate::core::record::Row;

/// In-memory storage implementation.
///
/// Useful for testing and development. Uses RwLock for thread-safe access;
/// rows are kept in insertion order per collection.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    collections: Arc<RwLock<HashMap<String, Vec<Row>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in a collection, for test assertions.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

fn matches(row: &Row, equals: &[(String, Value)]) -> bool {
    equals
        .iter()
        .all(|(column, value)| row.get(column) == Some(value))
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn insert(&self, collection: &str, row: Row) -> Result<Row> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("failed to acquire write lock: {}", e))?;

        collections
            .entry(collection.to_string())
            .or_default()
            .push(row.clone());

        Ok(row)
    }

    async fn select(&self, collection: &str, equals: &[(String, Value)]) -> Result<Vec<Row>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("failed to acquire read lock: {}", e))?;

        Ok(collections
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(row, equals))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id_column: &str, id: &Value) -> Result<Option<Row>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("failed to acquire read lock: {}", e))?;

        Ok(collections
            .get(collection)
            .and_then(|rows| rows.iter().find(|row| row.get(id_column) == Some(id)))
            .cloned())
    }

    async fn update(
        &self,
        collection: &str,
        id_column: &str,
        id: &Value,
        changes: Row,
    ) -> Result<Option<Row>> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("failed to acquire write lock: {}", e))?;

        let Some(rows) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(row) = rows.iter_mut().find(|row| row.get(id_column) == Some(id)) else {
            return Ok(None);
        };

        for (column, value) in changes {
            if value.is_null() {
                row.shift_remove(&column);
            } else {
                row.insert(column, value);
            }
        }

        Ok(Some(row.clone()))
    }

    async fn delete(&self, collection: &str, id_column: &str, id: &Value) -> Result<bool> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("failed to acquire write lock: {}", e))?;

        let Some(rows) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|row| row.get(id_column) != Some(id));
        Ok(rows.len() < before)
    }
}
