//! Derived HTTP handlers
//!
//! One handler set serves every kind. Success bodies use the
//! `{"data": ..., "metadata": ...}` envelope; failures render through
//! [`FrameworkError`]'s `IntoResponse` as `{"error": {...}}`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::core::auth::{Actor, AuthProvider};
use crate::core::error::FrameworkError;
use crate::core::query::{ListQuery, QueryParams};
use crate::ops::{
    BulkDeleteOperation, CreateOperation, DeleteOperation, ListOperation, UpdateOperation,
};

/// The derived operations for one registered kind.
pub struct EntityOps {
    pub list: ListOperation,
    pub create: CreateOperation,
    pub update: UpdateOperation,
    pub delete: DeleteOperation,
    pub bulk_delete: BulkDeleteOperation,
}

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState {
    pub ops: Arc<HashMap<String, Arc<EntityOps>>>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    fn ops_for(&self, kind: &str) -> Result<Arc<EntityOps>, FrameworkError> {
        self.ops
            .get(kind)
            .cloned()
            .ok_or_else(|| FrameworkError::UnknownKind {
                kind: kind.to_string(),
            })
    }

    /// Resolve the acting identity; anonymous is `None`, a provider failure
    /// is treated as unauthenticated after being logged.
    async fn actor(&self, headers: &HeaderMap) -> Option<Actor> {
        match self.auth.authenticate(headers).await {
            Ok(actor) => actor,
            Err(error) => {
                tracing::warn!(error = %error, "authentication failed");
                None
            }
        }
    }
}

/// GET /entities/{kind}
pub async fn list_entities(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<QueryParams>,
    headers: HeaderMap,
) -> Result<Response, FrameworkError> {
    let ops = state.ops_for(&kind)?;
    let actor = state.actor(&headers).await;

    if params.mine && actor.is_none() {
        return Err(FrameworkError::Unauthenticated);
    }

    let query = ListQuery::from_params(&params, actor.map(|a| a.id))?;
    let page = ops.list.execute(&query).await?;

    Ok(Json(json!({
        "data": page.records,
        "metadata": {
            "total": page.pagination.total,
            "pagination": page.pagination,
        },
    }))
    .into_response())
}

/// POST /entities/{kind}
pub async fn create_entity(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    Json(input): Json<Map<String, Value>>,
) -> Result<Response, FrameworkError> {
    let ops = state.ops_for(&kind)?;
    let actor = state.actor(&headers).await;

    let record = ops.create.execute(actor.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": record }))).into_response())
}

/// PATCH /entities/{kind}/{id}
pub async fn update_entity(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    headers: HeaderMap,
    Json(changes): Json<Map<String, Value>>,
) -> Result<Response, FrameworkError> {
    let ops = state.ops_for(&kind)?;
    let actor = state.actor(&headers).await;

    let record = ops.update.execute(actor.as_ref(), id, changes).await?;
    Ok(Json(json!({ "data": record })).into_response())
}

/// DELETE /entities/{kind}/{id}
pub async fn delete_entity(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> Result<Response, FrameworkError> {
    let ops = state.ops_for(&kind)?;
    let actor = state.actor(&headers).await;

    ops.delete.execute(actor.as_ref(), id).await?;
    Ok(Json(json!({ "data": { "deleted": true } })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

/// DELETE /entities/{kind} with an id list body
pub async fn bulk_delete_entities(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Response, FrameworkError> {
    let ops = state.ops_for(&kind)?;
    let actor = state.actor(&headers).await;

    let outcome = ops.bulk_delete.execute(actor.as_ref(), &request.ids).await?;
    Ok(Json(json!({ "data": outcome })).into_response())
}

/// GET /health and /healthz
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "forma" }))
}
