//! Derived list operation

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::core::error::FrameworkError;
use crate::core::query::{ListQuery, Page, PaginationMeta};
use crate::core::record::{CREATED_AT_FIELD, ID_FIELD, Record, from_row, is_owned_by};
use crate::core::spec::EntitySpec;
use crate::storage::Storage;

use super::with_timeout;

/// Paginated, filterable, visibility-aware read operation for one kind.
pub struct ListOperation {
    spec: Arc<EntitySpec>,
    storage: Arc<dyn Storage>,
    timeout: Duration,
}

impl ListOperation {
    pub fn new(spec: Arc<EntitySpec>, storage: Arc<dyn Storage>, timeout: Duration) -> Self {
        Self {
            spec,
            storage,
            timeout,
        }
    }

    /// Execute the query.
    ///
    /// Filter keys must exist in the column map. Drafts are excluded unless
    /// the query is mine-scoped and explicitly asks for them; mine-scoping
    /// restricts results to records owned by the acting actor. Ordering is
    /// deterministic across pages: creation time, tie-broken by id.
    pub async fn execute(&self, query: &ListQuery) -> Result<Page, FrameworkError> {
        let mut equals = Vec::with_capacity(query.filters.len());
        for (field, value) in &query.filters {
            let column =
                self.spec
                    .column(field)
                    .ok_or_else(|| FrameworkError::UnknownFilter {
                        kind: self.spec.kind.clone(),
                        field: field.clone(),
                    })?;
            equals.push((column.to_string(), value.clone()));
        }

        let rows = with_timeout(
            self.timeout,
            "list",
            self.storage.select(&self.spec.storage_name, &equals),
        )
        .await?;

        let mut records: Vec<Record> = rows.iter().map(|row| from_row(&self.spec, row)).collect();
        records.retain(|record| self.passes_visibility(record, query));
        records.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

        let total = records.len();
        let page = query.page.max(1);
        let limit = query.limit.clamp(1, 100);
        let records: Vec<Record> = records
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect();

        Ok(Page {
            records,
            pagination: PaginationMeta::new(page, limit, total),
        })
    }

    fn passes_visibility(&self, record: &Record, query: &ListQuery) -> bool {
        match query.actor_id {
            Some(actor_id) => {
                // Mine scope: only the actor's own records; drafts only on
                // explicit request
                is_owned_by(&self.spec, record, actor_id)
                    && (query.include_drafts || self.spec.visibility.is_visible(record))
            }
            None => self.spec.visibility.is_visible(record),
        }
    }
}

/// Stable sort key: creation time then id.
///
/// Timestamps are RFC 3339 strings in a single fixed format, so the
/// lexicographic order matches chronological order.
fn sort_key(record: &Record) -> (String, String) {
    let as_string = |field: &str| {
        record
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    (as_string(CREATED_AT_FIELD), as_string(ID_FIELD))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::{Row, to_row};
    use crate::core::spec::{
        CardLayout, Constraints, FieldDescriptor, FieldKind, SpecDefaults, VisibilityRule,
    };
    use crate::storage::InMemoryStorage;
    use indexmap::IndexMap;
    use serde_json::json;
    use uuid::Uuid;

    fn spec() -> Arc<EntitySpec> {
        Arc::new(EntitySpec {
            kind: "listing".to_string(),
            storage_name: "listings".to_string(),
            column_map: [
                ("id".to_string(), "id".to_string()),
                ("created_at".to_string(), "created_at".to_string()),
                ("updated_at".to_string(), "updated_at".to_string()),
                ("title".to_string(), "title_txt".to_string()),
                ("status".to_string(), "status".to_string()),
                ("owner".to_string(), "owner_id".to_string()),
            ]
            .into_iter()
            .collect(),
            fields: vec![
                FieldDescriptor::new("title", FieldKind::Text, true),
                FieldDescriptor {
                    constraints: Constraints {
                        one_of: Some(vec!["draft".to_string(), "published".to_string()]),
                        ..Constraints::default()
                    },
                    ..FieldDescriptor::new("status", FieldKind::Enum, true)
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
        })
    }

    async fn seed(
        storage: &InMemoryStorage,
        spec: &EntitySpec,
        title: &str,
        status: &str,
        owner: Uuid,
        created_at: &str,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let record: Record = [
            ("id".to_string(), json!(id.to_string())),
            ("created_at".to_string(), json!(created_at)),
            ("title".to_string(), json!(title)),
            ("status".to_string(), json!(status)),
            ("owner".to_string(), json!(owner.to_string())),
        ]
        .into_iter()
        .collect();
        use crate::storage::Storage as _;
        storage
            .insert(&spec.storage_name, to_row(spec, &record))
            .await
            .unwrap();
        id
    }

    fn op(storage: InMemoryStorage) -> ListOperation {
        ListOperation::new(spec(), Arc::new(storage), Duration::from_secs(5))
    }

    fn query() -> ListQuery {
        ListQuery {
            page: 1,
            limit: 20,
            filters: IndexMap::new(),
            actor_id: None,
            include_drafts: false,
        }
    }

    #[tokio::test]
    async fn test_public_listing_excludes_drafts() {
        let storage = InMemoryStorage::new();
        let owner = Uuid::new_v4();
        let s = spec();
        seed(&storage, &s, "pub", "published", owner, "2026-01-01T00:00:00Z").await;
        seed(&storage, &s, "dra", "draft", owner, "2026-01-02T00:00:00Z").await;

        let page = op(storage).execute(&query()).await.unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.records[0].get("title"), Some(&json!("pub")));
    }

    #[tokio::test]
    async fn test_mine_scope_with_drafts() {
        let storage = InMemoryStorage::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let s = spec();
        seed(&storage, &s, "mine-pub", "published", owner, "2026-01-01T00:00:00Z").await;
        seed(&storage, &s, "mine-dra", "draft", owner, "2026-01-02T00:00:00Z").await;
        seed(&storage, &s, "theirs", "published", other, "2026-01-03T00:00:00Z").await;

        let operation = op(storage);

        // Without include_drafts, mine scope still hides drafts
        let page = operation
            .execute(&ListQuery {
                actor_id: Some(owner),
                ..query()
            })
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1);

        // With include_drafts, the owner sees both
        let page = operation
            .execute(&ListQuery {
                actor_id: Some(owner),
                include_drafts: true,
                ..query()
            })
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 2);
    }

    #[tokio::test]
    async fn test_include_drafts_ignored_without_actor() {
        let storage = InMemoryStorage::new();
        let s = spec();
        seed(&storage, &s, "dra", "draft", Uuid::new_v4(), "2026-01-01T00:00:00Z").await;

        let page = op(storage)
            .execute(&ListQuery {
                include_drafts: true,
                ..query()
            })
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 0);
    }

    #[tokio::test]
    async fn test_unknown_filter_rejected() {
        let storage = InMemoryStorage::new();
        let mut q = query();
        q.filters.insert("bogus".to_string(), json!("x"));

        match op(storage).execute(&q).await {
            Err(FrameworkError::UnknownFilter { field, .. }) => assert_eq!(field, "bogus"),
            other => panic!("expected UnknownFilter, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_filters_translate_to_physical_columns() {
        let storage = InMemoryStorage::new();
        let owner = Uuid::new_v4();
        let s = spec();
        seed(&storage, &s, "a", "published", owner, "2026-01-01T00:00:00Z").await;
        seed(&storage, &s, "b", "published", owner, "2026-01-02T00:00:00Z").await;

        let mut q = query();
        q.filters.insert("title".to_string(), json!("a"));

        let page = op(storage).execute(&q).await.unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.records[0].get("title"), Some(&json!("a")));
    }

    #[tokio::test]
    async fn test_deterministic_ordering_and_pagination() {
        let storage = InMemoryStorage::new();
        let owner = Uuid::new_v4();
        let s = spec();
        // Inserted out of chronological order on purpose
        seed(&storage, &s, "third", "published", owner, "2026-01-03T00:00:00Z").await;
        seed(&storage, &s, "first", "published", owner, "2026-01-01T00:00:00Z").await;
        seed(&storage, &s, "second", "published", owner, "2026-01-02T00:00:00Z").await;

        let operation = op(storage);
        let page1 = operation
            .execute(&ListQuery {
                limit: 2,
                ..query()
            })
            .await
            .unwrap();
        assert_eq!(page1.records[0].get("title"), Some(&json!("first")));
        assert_eq!(page1.records[1].get("title"), Some(&json!("second")));
        assert!(page1.pagination.has_next);

        let page2 = operation
            .execute(&ListQuery {
                page: 2,
                limit: 2,
                ..query()
            })
            .await
            .unwrap();
        assert_eq!(page2.records[0].get("title"), Some(&json!("third")));
        assert!(!page2.pagination.has_next);
    }

    #[tokio::test]
    async fn test_ties_broken_by_id() {
        let storage = InMemoryStorage::new();
        let owner = Uuid::new_v4();
        let s = spec();
        let a = seed(&storage, &s, "a", "published", owner, "2026-01-01T00:00:00Z").await;
        let b = seed(&storage, &s, "b", "published", owner, "2026-01-01T00:00:00Z").await;

        let page = op(storage).execute(&query()).await.unwrap();
        let ids: Vec<&str> = page
            .records
            .iter()
            .map(|r| r.get("id").and_then(Value::as_str).unwrap())
            .collect();
        let mut expected = vec![a.to_string(), b.to_string()];
        expected.sort();
        assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_as_storage_error() {
        struct FailingStorage;

        #[async_trait::async_trait]
        impl Storage for FailingStorage {
            async fn insert(&self, _: &str, _: Row) -> anyhow::Result<Row> {
                Err(anyhow::anyhow!("down"))
            }
            async fn select(
                &self,
                _: &str,
                _: &[(String, Value)],
            ) -> anyhow::Result<Vec<Row>> {
                Err(anyhow::anyhow!("down"))
            }
            async fn get(&self, _: &str, _: &str, _: &Value) -> anyhow::Result<Option<Row>> {
                Err(anyhow::anyhow!("down"))
            }
            async fn update(
                &self,
                _: &str,
                _: &str,
                _: &Value,
                _: Row,
            ) -> anyhow::Result<Option<Row>> {
                Err(anyhow::anyhow!("down"))
            }
            async fn delete(&self, _: &str, _: &str, _: &Value) -> anyhow::Result<bool> {
                Err(anyhow::anyhow!("down"))
            }
        }

        let operation = ListOperation::new(spec(), Arc::new(FailingStorage), Duration::from_secs(1));
        assert!(matches!(
            operation.execute(&query()).await,
            Err(FrameworkError::Storage(_))
        ));
    }
}
