//! Declarative field validation
//!
//! Field descriptors compile into a [`Validator`] once at registration time.
//! The same compiled validator backs both the server-side create/update
//! pipelines and the client-side form surface, so the two can never drift.

pub mod compiler;

pub use compiler::{ValidationContext, Validator};
