//! Search overlay: expand everything while a query is highlighted.

use super::controller::{ThreadController, ToggleMode};
use super::surface::Surface;

impl<S: Surface> ThreadController<S> {
    /// Highlight `query`, expanding hidden messages while it is active.
    ///
    /// With no match every message goes back to the state it had before.
    pub fn search(&mut self, query: &str) -> usize {
        self.reset_search();

        for key in self.keys().collect::<Vec<_>>() {
            let hidden = self.is_hidden(key);
            if let Some(state) = self.states.get_mut(&key) {
                state.search_expanded = hidden;
            }
            if hidden {
                self.toggle_hidden(key, ToggleMode::ShowOnly);
            }
        }

        let matches = self.surface.mark_matches(query);
        log::debug!("tv: search: {} matches for {:?}", matches, query);
        self.search.active = matches > 0;

        if self.search.active {
            self.search.query = query.to_string();
            self.next_match();
        } else {
            self.restore_search_expanded(false);
        }
        matches
    }

    /// Drop the highlight and collapse what the search expanded,
    /// except the focused message.
    pub fn reset_search(&mut self) {
        if self.search.active {
            self.restore_search_expanded(true);
        }
        self.surface.clear_matches();
        self.search.active = false;
        self.search.in_match = false;
        self.search.query.clear();
    }

    fn restore_search_expanded(&mut self, keep_focused: bool) {
        for key in self.keys().collect::<Vec<_>>() {
            let expanded = self.states.get(&key).is_some_and(|s| s.search_expanded);
            if expanded && !(keep_focused && self.focused == Some(key)) {
                self.toggle_hidden(key, ToggleMode::HideOnly);
            }
            if let Some(state) = self.states.get_mut(&key) {
                state.search_expanded = false;
            }
        }
    }

    pub fn next_match(&mut self) -> bool {
        self.step_match(true)
    }

    pub fn prev_match(&mut self) -> bool {
        self.step_match(false)
    }

    fn step_match(&mut self, forward: bool) -> bool {
        if !self.search.active {
            return false;
        }
        let query = self.search.query.clone();
        let found = self.surface.find_match(&query, forward);
        self.search.in_match = found;
        found
    }

    /// Search again with the current query, or jump to the next match.
    pub fn search_or_next(&mut self, query: Option<&str>) -> bool {
        match query {
            Some(q) if !self.search.active || q != self.search.query => self.search(q) > 0,
            _ => self.next_match(),
        }
    }
}
