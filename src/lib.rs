//! # forma
//!
//! A declarative entity framework: describe each entity kind once, in data,
//! and derive everything else mechanically — validated CRUD endpoints,
//! paginated listings, and headless list/form view models — with uniform
//! authentication, rate limiting, ownership, draft visibility, and bulk
//! selection semantics.
//!
//! The spec is the single point of truth. Adding a kind means writing one
//! [`EntitySpec`] (in code or YAML); no per-kind handlers, validators, or
//! view code exist anywhere.
//!
//! ## Quick start
//!
//! ```no_run
//! use forma::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let spec = EntitySpec {
//!         kind: "listing".to_string(),
//!         storage_name: "listings".to_string(),
//!         column_map: [
//!             ("title".to_string(), "title".to_string()),
//!             ("status".to_string(), "status".to_string()),
//!             ("owner".to_string(), "owner_id".to_string()),
//!         ]
//!         .into_iter()
//!         .collect(),
//!         fields: vec![
//!             FieldDescriptor::new("title", FieldKind::Text, true),
//!             FieldDescriptor {
//!                 constraints: Constraints {
//!                     one_of: Some(vec!["draft".into(), "published".into()]),
//!                     ..Constraints::default()
//!                 },
//!                 ..FieldDescriptor::new("status", FieldKind::Enum, true)
//!             },
//!         ],
//!         visibility: VisibilityRule::FieldEquals {
//!             field: "status".to_string(),
//!             value: json!("published"),
//!         },
//!         owner_field: "owner".to_string(),
//!         defaults: SpecDefaults::default(),
//!         card: CardLayout::titled("title"),
//!         empty_state: Some("No listings yet".to_string()),
//!         guidance: None,
//!     };
//!
//!     ServerBuilder::new()
//!         .register_spec(spec)?
//!         .with_auth_provider(HeaderAuthProvider)
//!         .serve("0.0.0.0:3000")
//!         .await
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`core`] — the spec model, registry, validation compiler, error
//!   taxonomy, and the collaborator traits (auth, rate limiting, currency).
//! - [`ops`] — derived list/create/update/delete/bulk operations.
//! - [`storage`] — the storage trait plus an in-memory backend.
//! - [`server`] — the builder and the uniform axum handlers.
//! - [`surface`] — headless list, form, and bulk-selection view models.
//! - [`config`] — YAML spec-set loading for startup registration.
//!
//! [`EntitySpec`]: core::spec::EntitySpec

pub mod config;
pub mod core;
pub mod ops;
pub mod server;
pub mod storage;
pub mod surface;

pub use crate::config::SpecSet;
pub use crate::core::{
    Actor, AuthProvider, CardLayout, Condition, Constraints, CurrencyProvider, EntitySpec,
    FieldDescriptor, FieldError, FieldKind, FixedWindowLimiter, FrameworkError,
    HeaderAuthProvider, ListQuery, NoAuthProvider, Page, PaginationMeta, QueryParams,
    RateDecision, RateLimiter, Record, Row, SpecDefaults, SpecRegistry, StaticCurrencyProvider,
    Unlimited, ValidationContext, Validator, VisibilityRule,
};
pub use crate::server::ServerBuilder;
pub use crate::storage::{InMemoryStorage, Storage};

/// Convenience re-exports for typical embedders.
pub mod prelude {
    pub use crate::config::SpecSet;
    pub use crate::core::{
        Actor, AuthProvider, CardLayout, Condition, Constraints, EntitySpec, FieldDescriptor,
        FieldKind, FixedWindowLimiter, FrameworkError, HeaderAuthProvider, NoAuthProvider,
        SpecDefaults, VisibilityRule,
    };
    pub use crate::ops::{CreateHooks, PersistHook, TransformHook};
    pub use crate::server::ServerBuilder;
    pub use crate::storage::{InMemoryStorage, Storage};
    pub use crate::surface::{FormSurface, ListState, ListSurface, SelectionController};
}
