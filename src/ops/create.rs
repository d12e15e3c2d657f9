//! Derived create operation
//!
//! The pipeline is strictly ordered: authentication, rate limiting, the
//! optional transform hook, validation, persistence. Rate limiting runs
//! before validation so validation cost can never be driven unthrottled,
//! and authentication runs before the transform so actor-dependent defaults
//! never leak to anonymous callers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::core::auth::Actor;
use crate::core::currency::CurrencyProvider;
use crate::core::error::FrameworkError;
use crate::core::rate_limit::{RateDecision, RateLimiter};
use crate::core::record::{CREATED_AT_FIELD, ID_FIELD, Record, Row, UPDATED_AT_FIELD, from_row, to_row};
use crate::core::spec::EntitySpec;
use crate::core::validation::Validator;
use crate::storage::Storage;

use super::with_timeout;

/// Entity-supplied input transform, run after auth and rate limiting.
///
/// The only place entity-specific logic may run inside the generic pipeline;
/// typically fills computed defaults before validation.
pub type TransformHook =
    Arc<dyn Fn(&Actor, Map<String, Value>) -> Map<String, Value> + Send + Sync>;

/// Entity-supplied persistence routine for kinds with cross-record side
/// effects. Receives the storage handle and the fully mapped row; runs
/// best-effort, with no atomicity promise across records.
pub type PersistHook = Arc<
    dyn Fn(
            Arc<dyn Storage>,
            Arc<EntitySpec>,
            Row,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<Row>> + Send>>
        + Send
        + Sync,
>;

/// Optional per-kind hooks for the create pipeline.
#[derive(Clone, Default)]
pub struct CreateHooks {
    pub transform: Option<TransformHook>,
    pub persist: Option<PersistHook>,
}

/// Authenticated, rate-limited, validated write operation for one kind.
pub struct CreateOperation {
    spec: Arc<EntitySpec>,
    validator: Arc<Validator>,
    storage: Arc<dyn Storage>,
    limiter: Arc<dyn RateLimiter>,
    currencies: Arc<dyn CurrencyProvider>,
    hooks: CreateHooks,
    timeout: Duration,
}

impl CreateOperation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spec: Arc<EntitySpec>,
        validator: Arc<Validator>,
        storage: Arc<dyn Storage>,
        limiter: Arc<dyn RateLimiter>,
        currencies: Arc<dyn CurrencyProvider>,
        hooks: CreateHooks,
        timeout: Duration,
    ) -> Self {
        Self {
            spec,
            validator,
            storage,
            limiter,
            currencies,
            hooks,
            timeout,
        }
    }

    /// Run the five-stage pipeline and return the persisted record.
    pub async fn execute(
        &self,
        actor: Option<&Actor>,
        input: Map<String, Value>,
    ) -> Result<Record, FrameworkError> {
        // 1. Authentication
        let actor = actor.ok_or(FrameworkError::Unauthenticated)?;

        // 2. Rate limit per actor + kind
        match self.limiter.check_and_consume(actor.id, &self.spec.kind).await {
            RateDecision::Allowed => {}
            RateDecision::Limited { retry_after } => {
                tracing::warn!(kind = %self.spec.kind, actor = %actor.id, "create rate limited");
                return Err(FrameworkError::RateLimited { retry_after });
            }
        }

        // 3. Entity-supplied transform
        let input = match &self.hooks.transform {
            Some(transform) => transform(actor, input),
            None => input,
        };

        // 4. Validation
        let context = super::validation_context(&self.spec, &*self.currencies, actor);
        let mut record = self
            .validator
            .validate(&input, &context)
            .map_err(FrameworkError::Validation)?;

        // Framework-managed fields; the owner always comes from the actor,
        // never from the input body
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        record.insert(ID_FIELD.to_string(), json!(Uuid::new_v4().to_string()));
        record.insert(CREATED_AT_FIELD.to_string(), json!(now));
        record.insert(UPDATED_AT_FIELD.to_string(), json!(now));
        record.insert(self.spec.owner_field.clone(), json!(actor.id.to_string()));

        // 5. Persistence: default mapped-column insert or the custom routine
        let row = to_row(&self.spec, &record);
        let stored = match &self.hooks.persist {
            Some(persist) => {
                with_timeout(
                    self.timeout,
                    "create",
                    persist(self.storage.clone(), self.spec.clone(), row),
                )
                .await?
            }
            None => {
                with_timeout(
                    self.timeout,
                    "create",
                    self.storage.insert(&self.spec.storage_name, row),
                )
                .await?
            }
        };

        tracing::info!(kind = %self.spec.kind, actor = %actor.id, "record created");
        Ok(from_row(&self.spec, &stored))
    }
}
