//! Headless UI view models
//!
//! The surfaces derive everything from the entity spec: card content for
//! lists, grouped fields for forms, and bulk-selection behavior. They hold
//! state and expose transitions; rendering and styling live elsewhere.

pub mod form;
pub mod list;
pub mod selection;

pub use form::{FormGroup, FormMode, FormSurface};
pub use list::{Card, ListState, ListSurface};
pub use selection::SelectionController;
