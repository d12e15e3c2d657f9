//! Derived update and delete operations
//!
//! All three operations share the same gate order: authentication, then
//! record existence, then ownership. Bulk delete applies the same gates per
//! id and reports a per-id outcome instead of failing the whole batch.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::core::auth::Actor;
use crate::core::currency::CurrencyProvider;
use crate::core::error::FrameworkError;
use crate::core::record::{Record, UPDATED_AT_FIELD, from_row, is_owned_by, to_row};
use crate::core::spec::EntitySpec;
use crate::core::validation::Validator;
use crate::storage::Storage;

use super::with_timeout;

/// Partial update of one owned record.
pub struct UpdateOperation {
    spec: Arc<EntitySpec>,
    validator: Arc<Validator>,
    storage: Arc<dyn Storage>,
    currencies: Arc<dyn CurrencyProvider>,
    timeout: Duration,
}

impl UpdateOperation {
    pub fn new(
        spec: Arc<EntitySpec>,
        validator: Arc<Validator>,
        storage: Arc<dyn Storage>,
        currencies: Arc<dyn CurrencyProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            spec,
            validator,
            storage,
            currencies,
            timeout,
        }
    }

    /// Apply a validated change set to a record the actor owns.
    ///
    /// Fields absent from the change set keep their current values; an
    /// explicit null clears a non-required field. Returns the full updated
    /// record.
    pub async fn execute(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        changes: Map<String, Value>,
    ) -> Result<Record, FrameworkError> {
        let actor = actor.ok_or(FrameworkError::Unauthenticated)?;
        let existing = fetch_owned(&self.spec, &self.storage, self.timeout, actor, id).await?;

        let context = super::validation_context(&self.spec, &*self.currencies, actor);
        let mut normalized = self
            .validator
            .validate_patch(&changes, &existing, &context)
            .map_err(FrameworkError::Validation)?;

        normalized.insert(
            UPDATED_AT_FIELD.to_string(),
            json!(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        );

        let id_column = id_column(&self.spec);
        let updated = with_timeout(
            self.timeout,
            "update",
            self.storage.update(
                &self.spec.storage_name,
                id_column,
                &json!(id.to_string()),
                to_row(&self.spec, &normalized),
            ),
        )
        .await?
        .ok_or(FrameworkError::NotFound {
            kind: self.spec.kind.clone(),
            id,
        })?;

        tracing::info!(kind = %self.spec.kind, %id, actor = %actor.id, "record updated");
        Ok(from_row(&self.spec, &updated))
    }
}

/// Deletion of one owned record.
pub struct DeleteOperation {
    spec: Arc<EntitySpec>,
    storage: Arc<dyn Storage>,
    timeout: Duration,
}

impl DeleteOperation {
    pub fn new(spec: Arc<EntitySpec>, storage: Arc<dyn Storage>, timeout: Duration) -> Self {
        Self {
            spec,
            storage,
            timeout,
        }
    }

    pub async fn execute(&self, actor: Option<&Actor>, id: Uuid) -> Result<(), FrameworkError> {
        let actor = actor.ok_or(FrameworkError::Unauthenticated)?;
        fetch_owned(&self.spec, &self.storage, self.timeout, actor, id).await?;

        let removed = with_timeout(
            self.timeout,
            "delete",
            self.storage
                .delete(&self.spec.storage_name, id_column(&self.spec), &json!(id.to_string())),
        )
        .await?;
        if !removed {
            // Raced with another delete between the ownership check and here
            return Err(FrameworkError::NotFound {
                kind: self.spec.kind.clone(),
                id,
            });
        }

        tracing::info!(kind = %self.spec.kind, %id, actor = %actor.id, "record deleted");
        Ok(())
    }
}

/// One id the bulk delete did not remove, with a machine-readable reason.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SkippedDelete {
    pub id: Uuid,
    pub reason: String,
}

/// Per-id outcome of a bulk delete. Never an all-or-nothing failure.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BulkDeleteOutcome {
    pub deleted: Vec<Uuid>,
    pub skipped: Vec<SkippedDelete>,
}

/// Deletion of a selected set of owned records.
///
/// Ids are processed sequentially in request order. A failure on one id is
/// recorded and the batch continues; only a missing actor fails the whole
/// request.
pub struct BulkDeleteOperation {
    spec: Arc<EntitySpec>,
    storage: Arc<dyn Storage>,
    timeout: Duration,
}

impl BulkDeleteOperation {
    pub fn new(spec: Arc<EntitySpec>, storage: Arc<dyn Storage>, timeout: Duration) -> Self {
        Self {
            spec,
            storage,
            timeout,
        }
    }

    pub async fn execute(
        &self,
        actor: Option<&Actor>,
        ids: &[Uuid],
    ) -> Result<BulkDeleteOutcome, FrameworkError> {
        let actor = actor.ok_or(FrameworkError::Unauthenticated)?;
        let mut outcome = BulkDeleteOutcome::default();

        for &id in ids {
            match self.delete_one(actor, id).await {
                Ok(()) => outcome.deleted.push(id),
                Err(error) => {
                    let reason = match &error {
                        FrameworkError::NotFound { .. } => "NOT_FOUND",
                        FrameworkError::Forbidden { .. } => "FORBIDDEN",
                        _ => "STORAGE_ERROR",
                    };
                    tracing::warn!(kind = %self.spec.kind, %id, reason, "bulk delete skipped id");
                    outcome.skipped.push(SkippedDelete {
                        id,
                        reason: reason.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            kind = %self.spec.kind,
            actor = %actor.id,
            deleted = outcome.deleted.len(),
            skipped = outcome.skipped.len(),
            "bulk delete finished"
        );
        Ok(outcome)
    }

    async fn delete_one(&self, actor: &Actor, id: Uuid) -> Result<(), FrameworkError> {
        fetch_owned(&self.spec, &self.storage, self.timeout, actor, id).await?;
        let removed = with_timeout(
            self.timeout,
            "bulk_delete",
            self.storage
                .delete(&self.spec.storage_name, id_column(&self.spec), &json!(id.to_string())),
        )
        .await?;
        if removed {
            Ok(())
        } else {
            Err(FrameworkError::NotFound {
                kind: self.spec.kind.clone(),
                id,
            })
        }
    }
}

fn id_column(spec: &EntitySpec) -> &str {
    spec.column(crate::core::record::ID_FIELD).unwrap_or("id")
}

/// Fetch a record and enforce the existence-then-ownership gate order.
async fn fetch_owned(
    spec: &Arc<EntitySpec>,
    storage: &Arc<dyn Storage>,
    timeout: Duration,
    actor: &Actor,
    id: Uuid,
) -> Result<Record, FrameworkError> {
    let row = with_timeout(
        timeout,
        "get",
        storage.get(&spec.storage_name, id_column(spec), &json!(id.to_string())),
    )
    .await?
    .ok_or(FrameworkError::NotFound {
        kind: spec.kind.clone(),
        id,
    })?;

    let record = from_row(spec, &row);
    if !is_owned_by(spec, &record, actor.id) {
        return Err(FrameworkError::Forbidden {
            kind: spec.kind.clone(),
            id,
        });
    }
    Ok(record)
}
