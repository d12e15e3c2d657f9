//! Bulk selection controller
//!
//! A small state machine shared by every list surface. Selection only exists
//! while the mode is active; leaving the mode, finishing a bulk action, or
//! changing the backing list always drops the selected set, so stale ids can
//! never be submitted against a different page.

use std::collections::HashSet;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Inactive,
    Active,
}

/// Selection state for one list surface.
#[derive(Debug, Default)]
pub struct SelectionController {
    mode: SelectionMode,
    selected: HashSet<Uuid>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.mode == SelectionMode::Active
    }

    pub fn activate(&mut self) {
        self.mode = SelectionMode::Active;
    }

    /// Explicit cancel: deactivates and drops the selection.
    pub fn cancel(&mut self) {
        self.mode = SelectionMode::Inactive;
        self.selected.clear();
    }

    /// Called after a bulk action completed (even partially).
    pub fn complete_bulk_action(&mut self) {
        self.cancel();
    }

    /// Called on navigation away from the list.
    pub fn navigate_away(&mut self) {
        self.cancel();
    }

    /// Drop the selection but keep the mode; used when the backing list's
    /// filter or page changes.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Toggle one id. No-op while inactive.
    pub fn toggle(&mut self, id: Uuid) {
        if !self.is_active() {
            return;
        }
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    /// Select every id of the currently loaded page. No-op while inactive.
    pub fn select_all(&mut self, loaded_page: &[Uuid]) {
        if !self.is_active() {
            return;
        }
        self.selected.extend(loaded_page.iter().copied());
    }

    pub fn is_selected(&self, id: Uuid) -> bool {
        self.selected.contains(&id)
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    /// The selected ids, in no particular order.
    pub fn selected(&self) -> Vec<Uuid> {
        self.selected.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_inactive_and_toggle_is_noop() {
        let mut selection = SelectionController::new();
        assert!(!selection.is_active());

        selection.toggle(Uuid::new_v4());
        assert_eq!(selection.count(), 0);
    }

    #[test]
    fn test_toggle_selects_and_deselects() {
        let mut selection = SelectionController::new();
        selection.activate();
        let id = Uuid::new_v4();

        selection.toggle(id);
        assert!(selection.is_selected(id));
        selection.toggle(id);
        assert!(!selection.is_selected(id));
    }

    #[test]
    fn test_select_all_covers_loaded_page_only() {
        let mut selection = SelectionController::new();
        selection.activate();
        let page: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        selection.select_all(&page);
        assert_eq!(selection.count(), 3);
        assert!(page.iter().all(|id| selection.is_selected(*id)));
    }

    #[test]
    fn test_cancel_deactivates_and_clears() {
        let mut selection = SelectionController::new();
        selection.activate();
        selection.toggle(Uuid::new_v4());

        selection.cancel();
        assert!(!selection.is_active());
        assert_eq!(selection.count(), 0);
    }

    #[test]
    fn test_bulk_completion_clears_and_deactivates() {
        let mut selection = SelectionController::new();
        selection.activate();
        selection.toggle(Uuid::new_v4());

        selection.complete_bulk_action();
        assert!(!selection.is_active());
        assert_eq!(selection.count(), 0);
    }

    #[test]
    fn test_clear_keeps_mode() {
        let mut selection = SelectionController::new();
        selection.activate();
        selection.toggle(Uuid::new_v4());

        selection.clear();
        assert!(selection.is_active());
        assert_eq!(selection.count(), 0);
    }
}
