//! Records, rows, and the logical/physical translation boundary
//!
//! The framework treats entity instances as opaque maps keyed by logical
//! field names ([`Record`]). Physical column names only appear in [`Row`]s,
//! produced and consumed at the storage boundary via the spec's column map.

use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use crate::core::spec::EntitySpec;

/// An entity instance keyed by logical field names.
pub type Record = IndexMap<String, Value>;

/// A stored entity keyed by physical column names.
pub type Row = IndexMap<String, Value>;

/// Framework-managed fields, never accepted from client input.
pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "created_at";
pub const UPDATED_AT_FIELD: &str = "updated_at";

pub const RESERVED_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

/// Translate a logical record into a physical row.
///
/// Fields without a column mapping are dropped; the registry guarantees at
/// registration time that every declared field is mapped, so drops only
/// happen for values the framework never persists.
pub fn to_row(spec: &EntitySpec, record: &Record) -> Row {
    let mut row = Row::new();
    for (field, value) in record {
        if let Some(column) = spec.column(field) {
            row.insert(column.to_string(), value.clone());
        }
    }
    row
}

/// Translate a physical row back into a logical record.
///
/// Columns with no logical mapping (e.g. extras written by a custom
/// persistence routine) are not exposed to callers.
pub fn from_row(spec: &EntitySpec, row: &Row) -> Record {
    let mut record = Record::new();
    for (field, column) in &spec.column_map {
        if let Some(value) = row.get(column) {
            record.insert(field.clone(), value.clone());
        }
    }
    record
}

/// Extract the record id, if present and well-formed.
pub fn record_id(record: &Record) -> Option<Uuid> {
    record
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Whether the record's owner field matches the given actor id.
pub fn is_owned_by(spec: &EntitySpec, record: &Record, actor_id: Uuid) -> bool {
    record
        .get(&spec.owner_field)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        == Some(actor_id)
}
