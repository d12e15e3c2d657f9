//! Generic form surface
//!
//! Create and edit forms for every kind are the same view model: fields are
//! grouped in declaration order, group visibility follows `conditional_on`
//! over the current values, and submit runs the same compiled validator the
//! server uses. Hidden-group fields never reach the submitted input.

use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::error::FieldError;
use crate::core::record::{Record, RESERVED_FIELDS, record_id};
use crate::core::spec::{EntitySpec, FieldDescriptor};
use crate::core::validation::{ValidationContext, Validator};

/// Whether the form creates a new record or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: Uuid },
}

/// A visible group of fields, in declaration order.
pub struct FormGroup<'a> {
    pub name: Option<&'a str>,
    pub fields: Vec<&'a FieldDescriptor>,
}

/// Headless form view model for one kind.
pub struct FormSurface {
    spec: Arc<EntitySpec>,
    validator: Arc<Validator>,
    mode: FormMode,
    values: Record,
    focused: Option<String>,
}

impl FormSurface {
    /// Blank create form.
    pub fn blank(spec: Arc<EntitySpec>, validator: Arc<Validator>) -> Self {
        Self {
            spec,
            validator,
            mode: FormMode::Create,
            values: Record::new(),
            focused: None,
        }
    }

    /// Edit form pre-populated from an existing record.
    ///
    /// Only declared fields are carried over; framework-managed fields and
    /// the owner stay out of the editable values.
    pub fn edit(spec: Arc<EntitySpec>, validator: Arc<Validator>, record: &Record) -> Self {
        let id = record_id(record).unwrap_or_else(Uuid::nil);
        let values = record
            .iter()
            .filter(|(name, _)| spec.field(name).is_some())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            spec,
            validator,
            mode: FormMode::Edit { id },
            values,
            focused: None,
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Set a declared field's value. Unknown and reserved names are ignored.
    pub fn set_value(&mut self, field: &str, value: Value) {
        if self.spec.field(field).is_none() || RESERVED_FIELDS.contains(&field) {
            return;
        }
        if value.is_null() {
            self.values.shift_remove(field);
        } else {
            self.values.insert(field.to_string(), value);
        }
    }

    /// Merge a partial record into the form, filling only empty fields.
    ///
    /// Lets a "start from template" flow pre-populate without clobbering
    /// anything the user already typed.
    pub fn apply_template(&mut self, template: &Record) {
        for (field, value) in template {
            if self.spec.field(field).is_some() && !self.values.contains_key(field) {
                self.values.insert(field.clone(), value.clone());
            }
        }
    }

    pub fn focus(&mut self, field: impl Into<String>) {
        self.focused = Some(field.into());
    }

    /// Guidance for the focused field, falling back to the kind-level text.
    pub fn guidance(&self) -> Option<&str> {
        self.focused
            .as_deref()
            .and_then(|f| self.spec.field(f))
            .and_then(|f| f.guidance.as_deref())
            .or(self.spec.guidance.as_deref())
    }

    /// Whether a field is currently applicable given the other values.
    pub fn is_field_visible(&self, field: &FieldDescriptor) -> bool {
        field
            .conditional_on
            .as_ref()
            .is_none_or(|c| c.evaluate(&self.values))
    }

    /// Visible groups in declaration order.
    ///
    /// Consecutive fields sharing a group name form one group; a group with
    /// no visible field disappears entirely.
    pub fn visible_groups(&self) -> Vec<FormGroup<'_>> {
        let mut groups: Vec<FormGroup<'_>> = Vec::new();
        for field in &self.spec.fields {
            if !self.is_field_visible(field) {
                continue;
            }
            let name = field.group.as_deref();
            match groups.last_mut() {
                Some(group) if group.name == name => group.fields.push(field),
                _ => groups.push(FormGroup {
                    name,
                    fields: vec![field],
                }),
            }
        }
        groups
    }

    /// Validate the current values and produce the submit payload.
    ///
    /// Hidden-field values are dropped before validation, so a value typed
    /// into a group that a later edit hid can never leak into the request.
    pub fn submit(&self, ctx: &ValidationContext) -> Result<Record, Vec<FieldError>> {
        let input: Map<String, Value> = self
            .spec
            .fields
            .iter()
            .filter(|f| self.is_field_visible(f))
            .filter_map(|f| self.values.get(&f.name).map(|v| (f.name.clone(), v.clone())))
            .collect();
        self.validator.validate(&input, ctx)
    }
}
