//! Spec-set configuration
//!
//! Entity specs can be declared in a YAML file and registered once at
//! startup. The file is the full set; there is no merging or hot reload.
//!
//! ```yaml
//! entities:
//!   - kind: listing
//!     storage_name: listings
//!     column_map:
//!       title: title_txt
//!       status: status
//!       owner: owner_id
//!     fields:
//!       - name: title
//!         kind: text
//!         required: true
//!       - name: status
//!         kind: enum
//!         constraints:
//!           one_of: [draft, published]
//!     visibility:
//!       field_equals:
//!         field: status
//!         value: published
//!     owner_field: owner
//!     card:
//!       title_field: title
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::spec::EntitySpec;

/// The full set of entity specs for one deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecSet {
    pub entities: Vec<EntitySpec>,
}

impl SpecSet {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("failed to parse spec set YAML")
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read spec set file {}", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize spec set")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec::{FieldKind, VisibilityRule};

    const EXAMPLE: &str = r#"
entities:
  - kind: listing
    storage_name: listings
    column_map:
      title: title_txt
      status: status
      owner: owner_id
    fields:
      - name: title
        kind: text
        required: true
        constraints:
          min_len: 1
          max_len: 120
      - name: status
        kind: enum
        required: true
        constraints:
          one_of: [draft, published]
    visibility:
      field_equals:
        field: status
        value: published
    owner_field: owner
    card:
      title_field: title
      badge_field: status
    empty_state: "No listings yet"
"#;

    #[test]
    fn test_parse_example() {
        let set = SpecSet::from_yaml_str(EXAMPLE).unwrap();
        assert_eq!(set.entities.len(), 1);

        let spec = &set.entities[0];
        assert_eq!(spec.kind, "listing");
        assert_eq!(spec.column_map.get("title"), Some(&"title_txt".to_string()));
        assert_eq!(spec.fields[1].kind, FieldKind::Enum);
        assert!(matches!(
            spec.visibility,
            VisibilityRule::FieldEquals { .. }
        ));
        assert_eq!(spec.card.title_field, "title");
        assert_eq!(spec.empty_state.as_deref(), Some("No listings yet"));
    }

    #[test]
    fn test_roundtrip() {
        let set = SpecSet::from_yaml_str(EXAMPLE).unwrap();
        let yaml = set.to_yaml().unwrap();
        let restored = SpecSet::from_yaml_str(&yaml).unwrap();
        assert_eq!(restored.entities[0].kind, set.entities[0].kind);
        assert_eq!(restored.entities[0].fields.len(), set.entities[0].fields.len());
    }

    #[test]
    fn test_malformed_yaml_fails() {
        assert!(SpecSet::from_yaml_str("entities: [not a spec]").is_err());
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(SpecSet::from_yaml_file("/nonexistent/specs.yaml").is_err());
    }
}
