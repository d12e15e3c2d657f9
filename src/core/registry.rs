//! Entity specification registry
//!
//! The registry is the single point of truth for storage names and column
//! mappings. It is populated once at process start and freezes on first
//! read: late registration fails loudly instead of silently applying a
//! partial spec set.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use regex::Regex;

use crate::core::error::FrameworkError;
use crate::core::record::RESERVED_FIELDS;
use crate::core::spec::EntitySpec;

/// Registry of all entity specs known to the process.
#[derive(Default)]
pub struct SpecRegistry {
    specs: RwLock<HashMap<String, Arc<EntitySpec>>>,
    frozen: AtomicBool,
}

impl SpecRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            specs: RwLock::new(HashMap::new()),
            frozen: AtomicBool::new(false),
        }
    }

    /// Register a spec, validating it first.
    ///
    /// Fails with `DuplicateKind` if the kind is taken, `InvalidSpec` if any
    /// field references an undeclared column or a forward/cyclic
    /// `conditional_on`, and `RegistryFrozen` once the registry has been read.
    ///
    /// Reserved fields (`id`, `created_at`, `updated_at`) get identity column
    /// mappings injected when the spec omits them, so derived operations can
    /// always resolve them through the column map.
    pub fn register(&self, mut spec: EntitySpec) -> Result<(), FrameworkError> {
        if self.frozen.load(Ordering::SeqCst) {
            return Err(FrameworkError::RegistryFrozen);
        }

        for reserved in RESERVED_FIELDS {
            if !spec.column_map.contains_key(reserved) {
                spec.column_map
                    .insert(reserved.to_string(), reserved.to_string());
            }
        }

        Self::validate(&spec)?;

        let mut specs = self
            .specs
            .write()
            .map_err(|e| FrameworkError::Internal(format!("registry lock poisoned: {}", e)))?;

        if specs.contains_key(&spec.kind) {
            return Err(FrameworkError::DuplicateKind { kind: spec.kind });
        }

        specs.insert(spec.kind.clone(), Arc::new(spec));
        Ok(())
    }

    /// Resolve a spec by kind. Freezes the registry.
    pub fn resolve(&self, kind: &str) -> Result<Arc<EntitySpec>, FrameworkError> {
        self.frozen.store(true, Ordering::SeqCst);
        let specs = self
            .specs
            .read()
            .map_err(|e| FrameworkError::Internal(format!("registry lock poisoned: {}", e)))?;
        specs
            .get(kind)
            .cloned()
            .ok_or_else(|| FrameworkError::UnknownKind {
                kind: kind.to_string(),
            })
    }

    /// Physical collection name for a kind.
    pub fn storage_name(&self, kind: &str) -> Result<String, FrameworkError> {
        Ok(self.resolve(kind)?.storage_name.clone())
    }

    /// Physical column for a logical field of a kind.
    pub fn column(&self, kind: &str, field: &str) -> Result<String, FrameworkError> {
        let spec = self.resolve(kind)?;
        spec.column(field)
            .map(str::to_string)
            .ok_or_else(|| FrameworkError::UnknownFilter {
                kind: kind.to_string(),
                field: field.to_string(),
            })
    }

    /// All registered kinds, sorted. Freezes the registry.
    pub fn kinds(&self) -> Vec<String> {
        self.frozen.store(true, Ordering::SeqCst);
        let mut kinds: Vec<String> = match self.specs.read() {
            Ok(specs) => specs.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        kinds.sort();
        kinds
    }

    /// Whether the registry has been read and is thus immutable.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    fn validate(spec: &EntitySpec) -> Result<(), FrameworkError> {
        let invalid = |message: String| FrameworkError::InvalidSpec {
            kind: spec.kind.clone(),
            message,
        };

        if spec.kind.is_empty() {
            return Err(invalid("kind must not be empty".to_string()));
        }
        if spec.storage_name.is_empty() {
            return Err(invalid("storage_name must not be empty".to_string()));
        }

        // Every referenced field must exist in the column map
        for field in &spec.fields {
            if !spec.column_map.contains_key(&field.name) {
                return Err(invalid(format!(
                    "field '{}' has no column mapping",
                    field.name
                )));
            }
        }
        if !spec.column_map.contains_key(&spec.owner_field) {
            return Err(invalid(format!(
                "owner field '{}' has no column mapping",
                spec.owner_field
            )));
        }
        if let Some(field) = spec.visibility.field() {
            if spec.field(field).is_none() {
                return Err(invalid(format!(
                    "visibility rule references undeclared field '{}'",
                    field
                )));
            }
        }
        for field in spec.card.referenced_fields() {
            if !spec.column_map.contains_key(field) {
                return Err(invalid(format!(
                    "card layout references unmapped field '{}'",
                    field
                )));
            }
        }

        // Reserved fields are framework-managed; a descriptor for one would
        // let clients write over it
        for field in &spec.fields {
            if RESERVED_FIELDS.contains(&field.name.as_str()) || field.name == spec.owner_field {
                return Err(invalid(format!(
                    "field '{}' is framework-managed and cannot be declared",
                    field.name
                )));
            }
        }

        // Conditions may only reference earlier-declared fields: no forward
        // or self references, so the visibility graph is acyclic
        for (index, field) in spec.fields.iter().enumerate() {
            if let Some(condition) = &field.conditional_on {
                let target = condition.field();
                let declared_earlier = spec.fields[..index].iter().any(|f| f.name == target);
                if !declared_earlier {
                    return Err(invalid(format!(
                        "field '{}' has conditional_on referencing '{}', which is not declared earlier",
                        field.name, target
                    )));
                }
            }
        }

        // Patterns must compile at registration, not at request time
        for field in &spec.fields {
            if let Some(pattern) = &field.constraints.pattern {
                Regex::new(pattern).map_err(|e| {
                    invalid(format!("field '{}' has invalid pattern: {}", field.name, e))
                })?;
            }
        }

        Ok(())
    }
}
