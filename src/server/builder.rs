//! Fluent server construction
//!
//! ```no_run
//! use forma::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let specs = SpecSet::from_yaml_file("entities.yaml")?;
//!     ServerBuilder::new()
//!         .register_spec_set(specs)?
//!         .with_auth_provider(HeaderAuthProvider)
//!         .serve("0.0.0.0:3000")
//!         .await
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, patch};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::SpecSet;
use crate::core::auth::{AuthProvider, NoAuthProvider};
use crate::core::currency::{CurrencyProvider, StaticCurrencyProvider};
use crate::core::rate_limit::{RateLimiter, Unlimited};
use crate::core::registry::SpecRegistry;
use crate::core::spec::EntitySpec;
use crate::core::validation::Validator;
use crate::ops::{
    BulkDeleteOperation, CreateHooks, CreateOperation, DEFAULT_TIMEOUT, DeleteOperation,
    ListOperation, UpdateOperation,
};
use crate::server::handlers::{
    self, AppState, EntityOps,
};
use crate::storage::{InMemoryStorage, Storage};

/// Builder wiring specs and collaborators into a ready axum router.
///
/// Everything except the specs has a working default: in-memory storage,
/// anonymous auth, no rate limiting, the static currency set.
pub struct ServerBuilder {
    registry: SpecRegistry,
    storage: Option<Arc<dyn Storage>>,
    auth: Arc<dyn AuthProvider>,
    limiter: Arc<dyn RateLimiter>,
    currencies: Arc<dyn CurrencyProvider>,
    hooks: HashMap<String, CreateHooks>,
    timeout: Duration,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            registry: SpecRegistry::new(),
            storage: None,
            auth: Arc::new(NoAuthProvider),
            limiter: Arc::new(Unlimited),
            currencies: Arc::new(StaticCurrencyProvider::default()),
            hooks: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Register one entity spec. Fails on duplicate kinds or invalid specs.
    pub fn register_spec(self, spec: EntitySpec) -> anyhow::Result<Self> {
        self.registry.register(spec)?;
        Ok(self)
    }

    /// Register every spec in a loaded configuration set.
    pub fn register_spec_set(mut self, specs: SpecSet) -> anyhow::Result<Self> {
        for spec in specs.entities {
            self = self.register_spec(spec)?;
        }
        Ok(self)
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_auth_provider(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth = Arc::new(provider);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: impl RateLimiter + 'static) -> Self {
        self.limiter = Arc::new(limiter);
        self
    }

    pub fn with_currency_provider(mut self, provider: impl CurrencyProvider + 'static) -> Self {
        self.currencies = Arc::new(provider);
        self
    }

    /// Attach create hooks for one kind.
    pub fn with_create_hooks(mut self, kind: impl Into<String>, hooks: CreateHooks) -> Self {
        self.hooks.insert(kind.into(), hooks);
        self
    }

    /// Bounded timeout applied to every storage call.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the router. Freezes the registry.
    pub fn build(mut self) -> anyhow::Result<Router> {
        let storage = self
            .storage
            .take()
            .unwrap_or_else(|| Arc::new(InMemoryStorage::new()));

        let mut ops = HashMap::new();
        for kind in self.registry.kinds() {
            let spec = self.registry.resolve(&kind)?;
            let validator = Arc::new(Validator::compile(&spec)?);
            let hooks = self.hooks.remove(&kind).unwrap_or_default();

            ops.insert(
                kind.clone(),
                Arc::new(EntityOps {
                    list: ListOperation::new(spec.clone(), storage.clone(), self.timeout),
                    create: CreateOperation::new(
                        spec.clone(),
                        validator.clone(),
                        storage.clone(),
                        self.limiter.clone(),
                        self.currencies.clone(),
                        hooks,
                        self.timeout,
                    ),
                    update: UpdateOperation::new(
                        spec.clone(),
                        validator,
                        storage.clone(),
                        self.currencies.clone(),
                        self.timeout,
                    ),
                    delete: DeleteOperation::new(spec.clone(), storage.clone(), self.timeout),
                    bulk_delete: BulkDeleteOperation::new(spec, storage.clone(), self.timeout),
                }),
            );
            tracing::info!(kind = %kind, "registered entity routes");
        }

        let state = AppState {
            ops: Arc::new(ops),
            auth: self.auth,
        };

        Ok(Router::new()
            .route("/health", get(handlers::health))
            .route("/healthz", get(handlers::health))
            .route(
                "/entities/{kind}",
                get(handlers::list_entities)
                    .post(handlers::create_entity)
                    .delete(handlers::bulk_delete_entities),
            )
            .route(
                "/entities/{kind}/{id}",
                patch(handlers::update_entity).delete(handlers::delete_entity),
            )
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state))
    }

    /// Build and serve until ctrl-c.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .try_init();

        let router = self.build()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutting down");
            })
            .await?;
        Ok(())
    }
}
