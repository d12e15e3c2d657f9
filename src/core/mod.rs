//! Core module containing the spec model, registry, and collaborator traits

pub mod auth;
pub mod currency;
pub mod error;
pub mod query;
pub mod rate_limit;
pub mod record;
pub mod registry;
pub mod spec;
pub mod validation;

pub use auth::{Actor, AuthProvider, HeaderAuthProvider, NoAuthProvider};
pub use currency::{CurrencyProvider, StaticCurrencyProvider};
pub use error::{FieldError, FrameworkError};
pub use query::{ListQuery, Page, PaginationMeta, QueryParams};
pub use rate_limit::{FixedWindowLimiter, RateDecision, RateLimiter, Unlimited};
pub use record::{Record, Row};
pub use registry::SpecRegistry;
pub use spec::{
    CardLayout, Condition, Constraints, EntitySpec, FieldDescriptor, FieldKind, SpecDefaults,
    VisibilityRule,
};
pub use validation::{ValidationContext, Validator};
