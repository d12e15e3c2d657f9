//! List queries, pagination, and page results

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::core::error::FrameworkError;
use crate::core::record::Record;

/// Query parameters extracted from URL query strings.
///
/// # Example
/// ```text
/// GET /entities/listing?page=2&limit=10
/// GET /entities/listing?filter={"status": "published"}
/// GET /entities/listing?mine=true&include_drafts=true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    /// Page number (starts at 1)
    #[serde(default = "default_page")]
    pub page: usize,

    /// Number of items per page
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Equality filters as a JSON object, e.g. `{"status": "published"}`
    pub filter: Option<String>,

    /// Scope the listing to records owned by the authenticated actor
    pub mine: bool,

    /// Include draft records; only honored together with `mine`
    pub include_drafts: bool,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    20
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            filter: None,
            mine: false,
            include_drafts: false,
        }
    }
}

impl QueryParams {
    /// Page number, minimum 1.
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    /// Page size, clamped to 1..=100.
    pub fn limit(&self) -> usize {
        self.limit.clamp(1, 100)
    }

    /// Parse the filter JSON into field → value equality pairs.
    ///
    /// A filter that is not valid JSON, or not a JSON object, is rejected
    /// rather than silently dropped: a dropped filter would return the full
    /// unfiltered set to a caller who asked for a subset.
    pub fn filters(&self) -> Result<IndexMap<String, Value>, FrameworkError> {
        let Some(raw) = self.filter.as_ref() else {
            return Ok(IndexMap::new());
        };
        let value: Value =
            serde_json::from_str(raw).map_err(|_| FrameworkError::MalformedFilter)?;
        let object = value.as_object().ok_or(FrameworkError::MalformedFilter)?;
        Ok(object
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// The transient request shape consumed by a derived list operation.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: usize,
    pub limit: usize,
    /// Field → value equality filters; keys must exist in the column map
    pub filters: IndexMap<String, Value>,
    /// Present for "mine"-scoped queries
    pub actor_id: Option<Uuid>,
    /// Only honored when `actor_id` is set
    pub include_drafts: bool,
}

impl ListQuery {
    pub fn from_params(
        params: &QueryParams,
        actor_id: Option<Uuid>,
    ) -> Result<Self, FrameworkError> {
        Ok(Self {
            page: params.page(),
            limit: params.limit(),
            filters: params.filters()?,
            actor_id: if params.mine { actor_id } else { None },
            include_drafts: params.include_drafts,
        })
    }
}

/// One page of records plus pagination metadata.
#[derive(Debug, Serialize)]
pub struct Page {
    pub records: Vec<Record>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata returned alongside every page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Total number of records after filtering
    pub total: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let limit = limit.max(1);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(limit) };
        let start = (page - 1) * limit;

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start + limit < total,
            has_prev: page > 1,
        }
    }
}
