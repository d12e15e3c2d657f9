//! Derived CRUD operations
//!
//! Each operation is mechanically built from an [`EntitySpec`] and enforces
//! the shared semantics: column-map translation, visibility, ownership,
//! rate limiting, and bounded timeouts. No per-kind special-casing lives
//! here; entity-specific behavior only enters through create hooks.
//!
//! [`EntitySpec`]: crate::core::spec::EntitySpec

pub mod create;
pub mod list;
pub mod update;

pub use create::{CreateHooks, CreateOperation, PersistHook, TransformHook};
pub use list::ListOperation;
pub use update::{BulkDeleteOperation, BulkDeleteOutcome, DeleteOperation, SkippedDelete, UpdateOperation};

use std::future::Future;
use std::time::Duration;

use crate::core::auth::Actor;
use crate::core::currency::CurrencyProvider;
use crate::core::error::FrameworkError;
use crate::core::spec::EntitySpec;
use crate::core::validation::ValidationContext;

/// Default bounded timeout for derived operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a storage future under the operation's bounded timeout.
///
/// Elapse maps to `Timeout` (outcome unknown, retry unsafe); a storage error
/// maps to `Storage` after being logged with full detail. Callers only ever
/// see the generic message.
pub(crate) async fn with_timeout<T>(
    duration: Duration,
    operation: &'static str,
    future: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, FrameworkError> {
    match tokio::time::timeout(duration, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => {
            tracing::error!(operation, error = %error, "storage failure");
            Err(FrameworkError::Storage(error.to_string()))
        }
        Err(_elapsed) => {
            tracing::error!(operation, timeout_ms = duration.as_millis(), "operation timed out");
            Err(FrameworkError::Timeout { operation })
        }
    }
}

/// Validation context for one request.
///
/// The default currency resolves actor preference first, then the spec-level
/// override, then the platform default; unsupported codes at any step fall
/// through to the next.
pub(crate) fn validation_context(
    spec: &EntitySpec,
    currencies: &dyn CurrencyProvider,
    actor: &Actor,
) -> ValidationContext {
    let default = actor
        .preferred_currency
        .as_deref()
        .filter(|code| currencies.is_supported(code))
        .or(spec
            .defaults
            .currency
            .as_deref()
            .filter(|code| currencies.is_supported(code)))
        .unwrap_or(currencies.platform_default())
        .to_string();
    ValidationContext::new(currencies.supported().to_vec(), default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::StaticCurrencyProvider;
    use crate::core::spec::{CardLayout, SpecDefaults, VisibilityRule};
    use uuid::Uuid;

    fn spec_with_default_currency(currency: Option<&str>) -> EntitySpec {
        EntitySpec {
            kind: "test".to_string(),
            storage_name: "tests".to_string(),
            column_map: [("owner".to_string(), "owner".to_string())]
                .into_iter()
                .collect(),
            fields: vec![],
            visibility: VisibilityRule::Always,
            owner_field: "owner".to_string(),
            defaults: SpecDefaults {
                currency: currency.map(str::to_string),
            },
            card: CardLayout::titled("owner"),
            empty_state: None,
            guidance: None,
        }
    }

    #[test]
    fn test_context_prefers_actor_currency() {
        let provider = StaticCurrencyProvider::default();
        let spec = spec_with_default_currency(Some("GBP"));
        let actor = Actor::new(Uuid::new_v4()).with_preferred_currency("EUR");

        let ctx = validation_context(&spec, &provider, &actor);
        assert_eq!(ctx.default_currency, "EUR");
    }

    #[test]
    fn test_context_unsupported_preference_falls_to_spec_default() {
        let provider = StaticCurrencyProvider::default();
        let spec = spec_with_default_currency(Some("GBP"));
        let actor = Actor::new(Uuid::new_v4()).with_preferred_currency("XYZ");

        let ctx = validation_context(&spec, &provider, &actor);
        assert_eq!(ctx.default_currency, "GBP");
    }

    #[test]
    fn test_context_falls_through_to_platform_default() {
        let provider = StaticCurrencyProvider::default();
        let actor = Actor::new(Uuid::new_v4());

        let ctx = validation_context(&spec_with_default_currency(None), &provider, &actor);
        assert_eq!(ctx.default_currency, "USD");

        // Unsupported spec-level override falls through too
        let ctx = validation_context(&spec_with_default_currency(Some("XYZ")), &provider, &actor);
        assert_eq!(ctx.default_currency, "USD");
    }

    #[tokio::test]
    async fn test_with_timeout_passes_value() {
        let result = with_timeout(Duration::from_secs(1), "test", async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_maps_error_to_storage() {
        let result: Result<(), _> = with_timeout(Duration::from_secs(1), "test", async {
            Err(anyhow::anyhow!("backend down"))
        })
        .await;
        assert!(matches!(result, Err(FrameworkError::Storage(_))));
    }

    #[tokio::test]
    async fn test_with_timeout_maps_elapse_to_timeout() {
        let result: Result<(), _> = with_timeout(Duration::from_millis(5), "test", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(FrameworkError::Timeout { .. })));
    }
}
