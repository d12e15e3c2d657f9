//! Storage collaborator
//!
//! The storage engine is external; the framework only talks to it through
//! this trait, and always translates logical fields into physical columns
//! first. No derived operation ever issues a raw query.

pub mod in_memory;

pub use in_memory::InMemoryStorage;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::core::record::Row;

/// Trait for storage backends.
///
/// All parameters are physical: collection names and column-keyed rows. The
/// derived operations own the logical-to-physical translation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert a row, returning the stored shape.
    async fn insert(&self, collection: &str, row: Row) -> Result<Row>;

    /// Select rows matching all of the given column equality predicates.
    async fn select(&self, collection: &str, equals: &[(String, Value)]) -> Result<Vec<Row>>;

    /// Fetch one row by its id column.
    async fn get(&self, collection: &str, id_column: &str, id: &Value) -> Result<Option<Row>>;

    /// Apply column changes to one row; a null change value clears the column.
    ///
    /// Returns the updated row, or `None` when no row matched.
    async fn update(
        &self,
        collection: &str,
        id_column: &str,
        id: &Value,
        changes: Row,
    ) -> Result<Option<Row>>;

    /// Delete one row; returns whether a row was removed.
    async fn delete(&self, collection: &str, id_column: &str, id: &Value) -> Result<bool>;
}
