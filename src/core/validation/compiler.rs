//! Field descriptor compilation and runtime validation

use regex::Regex;
use serde_json::{Map, Value, json};
use std::sync::OnceLock;

use crate::core::error::{FieldError, FrameworkError};
use crate::core::record::Record;
use crate::core::spec::{Condition, EntitySpec, FieldKind};

/// Per-request context for validation.
///
/// Carries the supported currency set and the already-resolved default code
/// (actor preference → spec override → platform fallback). The validator
/// never performs conversion.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub supported_currencies: Vec<String>,
    pub default_currency: String,
}

impl ValidationContext {
    pub fn new(supported_currencies: Vec<String>, default_currency: impl Into<String>) -> Self {
        Self {
            supported_currencies,
            default_currency: default_currency.into(),
        }
    }
}

#[derive(Debug)]
struct CompiledField {
    name: String,
    kind: FieldKind,
    required: bool,
    conditional_on: Option<Condition>,
    min_len: Option<usize>,
    max_len: Option<usize>,
    min: Option<f64>,
    max: Option<f64>,
    one_of: Option<Vec<String>>,
    pattern: Option<Regex>,
}

/// A compiled validator for one entity kind.
#[derive(Debug)]
pub struct Validator {
    fields: Vec<CompiledField>,
}

impl Validator {
    /// Compile the spec's field descriptors.
    ///
    /// A pattern that fails to compile rejects the whole spec at registration
    /// time; a dropped pattern would let invalid values through at request time.
    pub fn compile(spec: &EntitySpec) -> Result<Self, FrameworkError> {
        let mut fields = Vec::with_capacity(spec.fields.len());
        for f in &spec.fields {
            let pattern = f
                .constraints
                .pattern
                .as_deref()
                .map(Regex::new)
                .transpose()
                .map_err(|error| FrameworkError::InvalidSpec {
                    kind: spec.kind.clone(),
                    message: format!("field '{}' has an invalid pattern: {}", f.name, error),
                })?;
            fields.push(CompiledField {
                name: f.name.clone(),
                kind: f.kind,
                required: f.required,
                conditional_on: f.conditional_on.clone(),
                min_len: f.constraints.min_len,
                max_len: f.constraints.max_len,
                min: f.constraints.min,
                max: f.constraints.max,
                one_of: f.constraints.one_of.clone(),
                pattern,
            });
        }
        Ok(Self { fields })
    }

    /// Validate a full create input.
    ///
    /// All failures are aggregated; unknown fields are rejected rather than
    /// silently dropped, catching client/server drift early. Fields whose
    /// `conditional_on` does not hold must be absent. Returns the normalized
    /// record on success.
    pub fn validate(
        &self,
        input: &Map<String, Value>,
        ctx: &ValidationContext,
    ) -> Result<Record, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut accepted = Record::new();

        self.reject_unknown_fields(input, &mut errors);

        for field in &self.fields {
            // Conditions only reference earlier-declared fields, so the
            // accepted map already holds everything they can read
            let applicable = field
                .conditional_on
                .as_ref()
                .is_none_or(|c| c.evaluate(&accepted));

            let value = input.get(&field.name).filter(|v| !v.is_null());

            if !applicable {
                if value.is_some() {
                    errors.push(FieldError::new(
                        &field.name,
                        "not applicable given the current field values",
                    ));
                }
                continue;
            }

            match value {
                None => {
                    if field.required {
                        errors.push(FieldError::new(&field.name, "field is required"));
                    }
                }
                Some(v) => match field.check(v, ctx) {
                    Ok(normalized) => {
                        accepted.insert(field.name.clone(), normalized);
                    }
                    Err(err) => errors.push(err),
                },
            }
        }

        if errors.is_empty() { Ok(accepted) } else { Err(errors) }
    }

    /// Validate a partial update.
    ///
    /// Only fields present in `changes` are checked; absent fields stay
    /// untouched. An explicit `null` clears a non-required field and is an
    /// error for a required one. Conditions are evaluated against the merged
    /// record, so a patch cannot sneak a value into a group its own changes
    /// just hid. Returns the normalized change set.
    pub fn validate_patch(
        &self,
        changes: &Map<String, Value>,
        existing: &Record,
        ctx: &ValidationContext,
    ) -> Result<Record, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut normalized = Record::new();

        self.reject_unknown_fields(changes, &mut errors);

        // Candidate final state, for conditional evaluation
        let mut merged = existing.clone();
        for (key, value) in changes {
            if value.is_null() {
                merged.shift_remove(key);
            } else {
                merged.insert(key.clone(), value.clone());
            }
        }

        for field in &self.fields {
            let Some(value) = changes.get(&field.name) else {
                continue;
            };

            if value.is_null() {
                if field.required {
                    errors.push(FieldError::new(
                        &field.name,
                        "required field cannot be cleared",
                    ));
                } else {
                    normalized.insert(field.name.clone(), Value::Null);
                }
                continue;
            }

            let applicable = field
                .conditional_on
                .as_ref()
                .is_none_or(|c| c.evaluate(&merged));
            if !applicable {
                errors.push(FieldError::new(
                    &field.name,
                    "not applicable given the current field values",
                ));
                continue;
            }

            match field.check(value, ctx) {
                Ok(value) => {
                    normalized.insert(field.name.clone(), value);
                }
                Err(err) => errors.push(err),
            }
        }

        if errors.is_empty() { Ok(normalized) } else { Err(errors) }
    }

    fn reject_unknown_fields(&self, input: &Map<String, Value>, errors: &mut Vec<FieldError>) {
        for key in input.keys() {
            if !self.fields.iter().any(|f| &f.name == key) {
                errors.push(FieldError::new(key, "unknown field"));
            }
        }
    }
}

impl CompiledField {
    fn check(&self, value: &Value, ctx: &ValidationContext) -> Result<Value, FieldError> {
        match self.kind {
            FieldKind::Text => self.check_string(value, None),
            FieldKind::Enum => {
                let allowed = self.one_of.as_deref().unwrap_or(&[]);
                self.check_string(value, Some(allowed))
            }
            FieldKind::Url => {
                let checked = self.check_string(value, None)?;
                let s = checked.as_str().unwrap_or_default();
                if url_regex().is_match(s) {
                    Ok(checked)
                } else {
                    Err(self.error("must be a valid http(s) URL"))
                }
            }
            FieldKind::Number => self.check_number(value),
            FieldKind::Boolean => {
                if value.is_boolean() {
                    Ok(value.clone())
                } else {
                    Err(self.error("must be a boolean"))
                }
            }
            FieldKind::Array => {
                let Some(items) = value.as_array() else {
                    return Err(self.error("must be an array"));
                };
                if let Some(min) = self.min_len {
                    if items.len() < min {
                        return Err(self.error(format!("must have at least {} items", min)));
                    }
                }
                if let Some(max) = self.max_len {
                    if items.len() > max {
                        return Err(self.error(format!("must have at most {} items", max)));
                    }
                }
                Ok(value.clone())
            }
            FieldKind::Money => self.check_money(value, ctx),
        }
    }

    fn check_string(&self, value: &Value, allowed: Option<&[String]>) -> Result<Value, FieldError> {
        let Some(s) = value.as_str() else {
            return Err(self.error("must be a string"));
        };
        let len = s.chars().count();
        if let Some(min) = self.min_len {
            if len < min {
                return Err(self.error(format!("must be at least {} characters", min)));
            }
        }
        if let Some(max) = self.max_len {
            if len > max {
                return Err(self.error(format!("must be at most {} characters", max)));
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(s) {
                return Err(self.error("does not match the expected format"));
            }
        }
        if let Some(allowed) = allowed.or(self.one_of.as_deref()) {
            if !allowed.is_empty() && !allowed.iter().any(|a| a == s) {
                return Err(self.error(format!("must be one of: {}", allowed.join(", "))));
            }
        }
        Ok(value.clone())
    }

    fn check_number(&self, value: &Value) -> Result<Value, FieldError> {
        let Some(n) = value.as_f64() else {
            return Err(self.error("must be a number"));
        };
        self.check_range(n)?;
        Ok(value.clone())
    }

    fn check_range(&self, n: f64) -> Result<(), FieldError> {
        if let Some(min) = self.min {
            if n < min {
                return Err(self.error(format!("must be at least {}", min)));
            }
        }
        if let Some(max) = self.max {
            if n > max {
                return Err(self.error(format!("must be at most {}", max)));
            }
        }
        Ok(())
    }

    /// Money values: `{ "amount": <number>, "currency": <code?> }`.
    ///
    /// The currency code must belong to the supported set; when omitted, the
    /// resolved default is substituted. No conversion happens here.
    fn check_money(&self, value: &Value, ctx: &ValidationContext) -> Result<Value, FieldError> {
        let Some(object) = value.as_object() else {
            return Err(self.error("must be an object with amount and currency"));
        };
        for key in object.keys() {
            if key != "amount" && key != "currency" {
                return Err(self.error(format!("unexpected money attribute '{}'", key)));
            }
        }
        let Some(amount) = object.get("amount").and_then(Value::as_f64) else {
            return Err(self.error("amount must be a number"));
        };
        self.check_range(amount)?;

        let currency = match object.get("currency") {
            None | Some(Value::Null) => ctx.default_currency.clone(),
            Some(Value::String(code)) => {
                if !ctx.supported_currencies.iter().any(|c| c == code) {
                    return Err(self.error(format!("unsupported currency '{}'", code)));
                }
                code.clone()
            }
            Some(_) => return Err(self.error("currency must be a string code")),
        };

        Ok(json!({ "amount": amount, "currency": currency }))
    }

    fn error(&self, message: impl Into<String>) -> FieldError {
        FieldError::new(&self.name, message)
    }
}

fn url_regex() -> &'static Regex {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    URL_REGEX.get_or_init(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").unwrap())
}
