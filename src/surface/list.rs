//! Generic list surface
//!
//! One view model serves every kind: cards are projected through the spec's
//! [`CardLayout`], the empty state uses the kind's configured text, and a
//! ticket-based guard discards responses from superseded fetches so a slow
//! earlier request can never overwrite a newer one.
//!
//! [`CardLayout`]: crate::core::spec::CardLayout

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use crate::core::error::FrameworkError;
use crate::core::query::{Page, PaginationMeta};
use crate::core::record::{Record, record_id};
use crate::core::spec::EntitySpec;
use crate::surface::selection::SelectionController;

const DEFAULT_EMPTY_STATE: &str = "Nothing here yet";

/// One rendered card, projected from a record via the spec's card layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub image: Option<String>,
    pub badge: Option<String>,
}

/// What the list is currently showing.
///
/// `Empty` only means "this kind has no records at all": a filtered query
/// with zero hits stays `Populated` so the UI shows "no results" next to the
/// active filters instead of the kind's empty state. `Error` is always
/// distinct from `Empty`.
#[derive(Debug, Clone, PartialEq)]
pub enum ListState {
    Loading,
    Empty { message: String },
    Error { message: String },
    Populated {
        cards: Vec<Card>,
        pagination: PaginationMeta,
    },
}

/// Headless list view model for one kind.
pub struct ListSurface {
    spec: Arc<EntitySpec>,
    state: ListState,
    latest_ticket: u64,
    filters: IndexMap<String, Value>,
    page: usize,
    pub selection: SelectionController,
}

impl ListSurface {
    pub fn new(spec: Arc<EntitySpec>) -> Self {
        Self {
            spec,
            state: ListState::Loading,
            latest_ticket: 0,
            filters: IndexMap::new(),
            page: 1,
            selection: SelectionController::new(),
        }
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn filters(&self) -> &IndexMap<String, Value> {
        &self.filters
    }

    /// Start a fetch; the returned ticket must be passed to `apply_result`.
    ///
    /// Tickets are monotonically increasing; only the latest one is ever
    /// applied.
    pub fn begin_fetch(&mut self) -> u64 {
        self.latest_ticket += 1;
        self.state = ListState::Loading;
        self.latest_ticket
    }

    /// Apply a fetch outcome. Returns false when the ticket was stale and
    /// the result was discarded.
    pub fn apply_result(
        &mut self,
        ticket: u64,
        result: Result<Page, FrameworkError>,
    ) -> bool {
        if ticket != self.latest_ticket {
            tracing::debug!(kind = %self.spec.kind, ticket, "discarding stale list result");
            return false;
        }

        self.state = match result {
            Ok(page) if page.records.is_empty() && self.filters.is_empty() => ListState::Empty {
                message: self
                    .spec
                    .empty_state
                    .clone()
                    .unwrap_or_else(|| DEFAULT_EMPTY_STATE.to_string()),
            },
            Ok(page) => ListState::Populated {
                cards: page
                    .records
                    .iter()
                    .filter_map(|record| self.card(record))
                    .collect(),
                pagination: page.pagination,
            },
            Err(error) => ListState::Error {
                message: error.to_string(),
            },
        };
        true
    }

    /// Replace one equality filter. Clears the selection and resets to page 1.
    pub fn set_filter(&mut self, field: impl Into<String>, value: Value) {
        self.filters.insert(field.into(), value);
        self.page = 1;
        self.selection.clear();
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.page = 1;
        self.selection.clear();
    }

    /// Navigate to another page. Clears the selection.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
        self.selection.clear();
    }

    /// Ids of the currently loaded page, the universe for select-all.
    pub fn loaded_ids(&self) -> Vec<Uuid> {
        match &self.state {
            ListState::Populated { cards, .. } => cards.iter().map(|c| c.id).collect(),
            _ => Vec::new(),
        }
    }

    fn card(&self, record: &Record) -> Option<Card> {
        let id = record_id(record)?;
        let text = |field: &Option<String>| {
            field
                .as_deref()
                .and_then(|f| record.get(f))
                .map(display_value)
        };
        Some(Card {
            id,
            title: record
                .get(&self.spec.card.title_field)
                .map(display_value)
                .unwrap_or_default(),
            subtitle: text(&self.spec.card.subtitle_field),
            image: text(&self.spec.card.image_field),
            badge: text(&self.spec.card.badge_field),
        })
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
