//! Declarative entity specifications
//!
//! An [`EntitySpec`] is the single description of one entity kind from which
//! everything else is derived: storage mapping, validation, CRUD operations,
//! and the list/form view models. Specs are plain serde data so they can be
//! registered programmatically or loaded from YAML configuration at startup.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::record::Record;

/// The shape of a single declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free-form text
    Text,
    /// Numeric value (integer or float)
    Number,
    /// String restricted to the `one_of` constraint set
    Enum,
    /// Amount plus currency code: `{ "amount": 12.5, "currency": "EUR" }`
    Money,
    /// URL-formatted string
    Url,
    /// JSON array
    Array,
    /// Boolean flag
    Boolean,
}

/// Declarative constraints attached to a field.
///
/// Which constraints apply depends on the field kind: length bounds apply to
/// text-like fields (element count for arrays), numeric range to numbers and
/// money amounts, `one_of` to enums, `pattern` to text-like fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub one_of: Option<Vec<String>>,
    /// Regex pattern, compiled once at spec registration
    pub pattern: Option<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.min_len.is_none()
            && self.max_len.is_none()
            && self.min.is_none()
            && self.max.is_none()
            && self.one_of.is_none()
            && self.pattern.is_none()
    }
}

/// Visibility predicate over already-declared sibling fields.
///
/// Conditions may only reference fields declared earlier in the same spec;
/// the registry rejects forward or self references at registration time, so
/// evaluation in declaration order always terminates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Sibling field equals the given value
    Equals { field: String, value: Value },
    /// Sibling field equals one of the given values
    OneOf { field: String, values: Vec<Value> },
}

impl Condition {
    /// The sibling field this condition reads.
    pub fn field(&self) -> &str {
        match self {
            Condition::Equals { field, .. } => field,
            Condition::OneOf { field, .. } => field,
        }
    }

    /// Evaluate against the fields accepted so far.
    ///
    /// An absent sibling value never satisfies the condition.
    pub fn evaluate(&self, values: &Record) -> bool {
        match self {
            Condition::Equals { field, value } => values.get(field) == Some(value),
            Condition::OneOf { field, values: allowed } => {
                values.get(field).is_some_and(|v| allowed.contains(v))
            }
        }
    }
}

/// One declared field of an entity kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Logical field name; must exist in the spec's `column_map`
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub constraints: Constraints,
    /// Form layout group this field belongs to
    #[serde(default)]
    pub group: Option<String>,
    /// Predicate controlling whether the field is applicable at all
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub conditional_on: Option<Condition>,
    /// Contextual help text shown by the form surface
    #[serde(default)]
    pub guidance: Option<String>,
}

impl FieldDescriptor {
    /// Minimal descriptor, mostly for tests and programmatic registration.
    pub fn new(name: impl Into<String>, kind: FieldKind, required: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            required,
            constraints: Constraints::default(),
            group: None,
            conditional_on: None,
            guidance: None,
        }
    }
}

/// Rule deciding whether a record is publicly listable.
///
/// Records failing the rule are drafts: excluded from public listings unless
/// the owner explicitly asks for them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityRule {
    /// Every record is listable
    #[default]
    Always,
    /// Listable only when `field` equals `value` (e.g. status == "published")
    FieldEquals { field: String, value: Value },
}

impl VisibilityRule {
    /// Whether the record is publicly listable.
    pub fn is_visible(&self, record: &Record) -> bool {
        match self {
            VisibilityRule::Always => true,
            VisibilityRule::FieldEquals { field, value } => record.get(field) == Some(value),
        }
    }

    /// The field the rule reads, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            VisibilityRule::Always => None,
            VisibilityRule::FieldEquals { field, .. } => Some(field),
        }
    }
}

/// Card metadata used by the generic list surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardLayout {
    pub title_field: String,
    #[serde(default)]
    pub subtitle_field: Option<String>,
    #[serde(default)]
    pub image_field: Option<String>,
    #[serde(default)]
    pub badge_field: Option<String>,
}

impl CardLayout {
    pub fn titled(field: impl Into<String>) -> Self {
        Self {
            title_field: field.into(),
            subtitle_field: None,
            image_field: None,
            badge_field: None,
        }
    }

    /// All fields the layout references, for registration-time checks.
    pub fn referenced_fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title_field.as_str())
            .chain(self.subtitle_field.as_deref())
            .chain(self.image_field.as_deref())
            .chain(self.badge_field.as_deref())
    }
}

/// Spec-level default values resolved at create time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecDefaults {
    /// Overrides the platform-wide default currency for this kind
    pub currency: Option<String>,
}

/// The canonical per-kind configuration.
///
/// Every derived operation and surface resolves physical names through
/// `column_map` instead of hardcoding them, so storage renames never ripple
/// through code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySpec {
    /// Unique kind identifier (e.g. "listing", "loan")
    pub kind: String,
    /// Physical collection name
    pub storage_name: String,
    /// Logical field name → physical column name
    pub column_map: IndexMap<String, String>,
    pub fields: Vec<FieldDescriptor>,
    // singleton_map keeps the plain `field_equals: {...}` map form working
    // in YAML, where externally tagged enums would demand `!field_equals`
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub visibility: VisibilityRule,
    /// Logical field holding the creating actor's id
    pub owner_field: String,
    #[serde(default)]
    pub defaults: SpecDefaults,
    pub card: CardLayout,
    /// Kind-specific empty-state content for the list surface
    #[serde(default)]
    pub empty_state: Option<String>,
    /// Kind-level default guidance for the form surface
    #[serde(default)]
    pub guidance: Option<String>,
}

impl EntitySpec {
    /// Physical column for a logical field, if declared.
    pub fn column(&self, field: &str) -> Option<&str> {
        self.column_map.get(field).map(String::as_str)
    }

    /// Descriptor for a declared field, if any.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_condition_equals() {
        let cond = Condition::Equals {
            field: "color".to_string(),
            value: json!("red"),
        };
        assert!(cond.evaluate(&record(&[("color", json!("red"))])));
        assert!(!cond.evaluate(&record(&[("color", json!("blue"))])));
        assert!(!cond.evaluate(&record(&[])));
    }

    #[test]
    fn test_condition_one_of() {
        let cond = Condition::OneOf {
            field: "status".to_string(),
            values: vec![json!("draft"), json!("review")],
        };
        assert!(cond.evaluate(&record(&[("status", json!("draft"))])));
        assert!(!cond.evaluate(&record(&[("status", json!("published"))])));
    }

    #[test]
    fn test_visibility_field_equals() {
        let rule = VisibilityRule::FieldEquals {
            field: "status".to_string(),
            value: json!("published"),
        };
        assert!(rule.is_visible(&record(&[("status", json!("published"))])));
        assert!(!rule.is_visible(&record(&[("status", json!("draft"))])));
        assert!(!rule.is_visible(&record(&[])));
        assert_eq!(rule.field(), Some("status"));
    }

    #[test]
    fn test_visibility_always() {
        assert!(VisibilityRule::Always.is_visible(&record(&[])));
        assert_eq!(VisibilityRule::Always.field(), None);
    }

    #[test]
    fn test_card_layout_referenced_fields() {
        let card = CardLayout {
            title_field: "name".to_string(),
            subtitle_field: Some("summary".to_string()),
            image_field: None,
            badge_field: Some("status".to_string()),
        };
        let fields: Vec<&str> = card.referenced_fields().collect();
        assert_eq!(fields, vec!["name", "summary", "status"]);
    }

    #[test]
    fn test_spec_yaml_roundtrip() {
        let spec = EntitySpec {
            kind: "listing".to_string(),
            storage_name: "listings".to_string(),
            column_map: [
                ("title".to_string(), "title_txt".to_string()),
                ("status".to_string(), "status".to_string()),
            ]
            .into_iter()
            .collect(),
            fields: vec![
                FieldDescriptor::new("status", FieldKind::Enum, true),
                FieldDescriptor {
                    conditional_on: Some(Condition::Equals {
                        field: "status".to_string(),
                        value: json!("published"),
                    }),
                    ..FieldDescriptor::new("title", FieldKind::Text, true)
                },
            ],
            visibility: VisibilityRule::FieldEquals {
                field: "status".to_string(),
                value: json!("published"),
            },
            owner_field: "owner".to_string(),
            defaults: SpecDefaults::default(),
            card: CardLayout::titled("title"),
            empty_state: None,
            guidance: None,
        };

        let yaml = serde_yaml::to_string(&spec).unwrap();
        let parsed: EntitySpec = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.kind, "listing");
        assert_eq!(parsed.column("title"), Some("title_txt"));
        assert_eq!(parsed.fields.len(), 2);
        assert!(matches!(parsed.visibility, VisibilityRule::FieldEquals { .. }));
        assert!(parsed.fields[1].conditional_on.is_some());
    }

    // Configuration files write these enums as plain maps (and plain
    // strings for unit variants), never `!tag` syntax
    #[test]
    fn test_visibility_and_condition_yaml_map_form() {
        let spec: EntitySpec = serde_yaml::from_str(
            r#"
kind: listing
storage_name: listings
column_map: { status: status, title: title, owner: owner_id }
fields:
  - name: status
    kind: enum
    required: true
  - name: title
    kind: text
    conditional_on:
      one_of: { field: status, values: [draft, published] }
visibility:
  field_equals: { field: status, value: published }
owner_field: owner
card: { title_field: title }
"#,
        )
        .unwrap();
        assert!(matches!(spec.visibility, VisibilityRule::FieldEquals { .. }));
        assert!(matches!(
            spec.fields[1].conditional_on,
            Some(Condition::OneOf { .. })
        ));

        let open: EntitySpec = serde_yaml::from_str(
            r#"
kind: note
storage_name: notes
column_map: { body: body, owner: owner_id }
fields:
  - name: body
    kind: text
    required: true
visibility: always
owner_field: owner
card: { title_field: body }
"#,
        )
        .unwrap();
        assert!(matches!(open.visibility, VisibilityRule::Always));
    }

    #[test]
    fn test_field_kind_lowercase_serde() {
        let kind: FieldKind = serde_yaml::from_str("enum").unwrap();
        assert_eq!(kind, FieldKind::Enum);
        assert_eq!(
            serde_yaml::to_string(&FieldKind::Money).unwrap().trim(),
            "money"
        );
    }
}
