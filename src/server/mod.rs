//! HTTP exposure
//!
//! The server derives one uniform set of routes per registered kind; no
//! per-kind handlers exist anywhere. [`ServerBuilder`] wires the registry,
//! storage, and collaborator traits into an axum [`axum::Router`].

pub mod builder;
pub mod handlers;

pub use builder::ServerBuilder;
pub use handlers::{AppState, EntityOps};
