//! Cursor movement and scrolling.
//!
//! Geometry comes from the surface; the controller never computes layout.

use super::controller::{PendingScroll, ThreadController, ToggleMode};
use super::state::{Element, ElementKind, MessageKey};
use super::surface::{Surface, Target, Viewport};
use crate::mail::types::TAG_UNREAD;

impl<S: Surface> ThreadController<S> {
    fn element_target(key: MessageKey, element: &Element) -> Target {
        match (element.kind, element.chunk_id) {
            (ElementKind::Empty, _) | (_, None) => Target::Message(key),
            (_, Some(chunk_id)) => Target::Element(key, chunk_id),
        }
    }

    /// Target of the cursor inside a message.
    pub fn current_target(&self, key: MessageKey) -> Target {
        match self.states.get(&key) {
            Some(state) => Self::element_target(key, state.current()),
            None => Target::Message(key),
        }
    }

    /// Surfaces without paging show everything, so everything is in view.
    fn fully_in_view(&self, target: Target) -> bool {
        match self.surface.viewport() {
            Some(vp) if vp.page_size > 0.0 => self
                .surface
                .bounds(target)
                .is_some_and(|b| vp.contains_fully(&b)),
            _ => true,
        }
    }

    /// Scroll by `delta`, clamped. Returns whether the position changed.
    pub(super) fn scroll_by(&mut self, delta: f64) -> bool {
        self.scroll_with(|vp| vp.value + delta)
    }

    fn scroll_with<F: FnOnce(&Viewport) -> f64>(&mut self, f: F) -> bool {
        let Some(vp) = self.surface.viewport() else {
            return false;
        };
        let value = vp.clamp(f(&vp));
        if value == vp.value {
            return false;
        }
        self.surface.set_scroll(value);
        true
    }

    /// Step to the next element of the focused message, or scroll.
    ///
    /// Returns the newly focused element or message, if focus moved.
    pub fn focus_next_element(&mut self, force: bool) -> Option<Target> {
        let key = self.focused?;

        if !self.is_hidden(key) || self.edit_mode {
            let state = self.states.get(&key)?;
            let current = state.current_element();
            if current < state.last_index() {
                let next = *state.element(current + 1)?;
                let target = Self::element_target(key, &next);
                if force || self.fully_in_view(target) {
                    if let Some(state) = self.states.get_mut(&key) {
                        state.set_current(current + 1);
                    }
                    self.update_focus_status();
                    return Some(target);
                }
            }
        }

        let step = self.surface.viewport().map_or(0.0, |vp| vp.step);
        let moved = self.scroll_by(step);
        if force || !moved {
            let last = self.position(key) == Some(self.messages.len().saturating_sub(1));
            if !last {
                return self.focus_next();
            }
            None
        } else {
            self.update_focus_to_view();
            None
        }
    }

    /// Step to the previous element, entering the previous message from below.
    pub fn focus_previous_element(&mut self, force: bool) -> Option<Target> {
        let key = self.focused?;

        if !self.is_hidden(key) || self.edit_mode {
            let state = self.states.get(&key)?;
            let current = state.current_element();
            if current > 0 {
                let prev = *state.element(current - 1)?;
                let target = Self::element_target(key, &prev);
                let change =
                    force || prev.kind == ElementKind::Empty || self.fully_in_view(target);
                if change {
                    if let Some(state) = self.states.get_mut(&key) {
                        state.set_current(current - 1);
                    }
                    self.update_focus_status();
                    return Some(target);
                }
            }
        }

        let at_top = self
            .surface
            .viewport()
            .is_none_or(|vp| vp.value <= vp.lower);
        if force || at_top {
            self.focus_previous(false);
            self.focused.map(|k| self.current_target(k))
        } else {
            let step = self.surface.viewport().map_or(0.0, |vp| vp.step);
            self.scroll_by(-step);
            self.update_focus_to_view();
            None
        }
    }

    /// Move to the next message, entering at its top.
    pub fn focus_next(&mut self) -> Option<Target> {
        if self.edit_mode {
            return None;
        }
        let key = self.focused?;
        let pos = self.position(key)?;
        if pos + 1 < self.messages.len() {
            let next = MessageKey(pos + 1);
            self.focused = Some(next);
            if let Some(state) = self.states.get_mut(&next) {
                state.set_current(0);
            }
            self.update_focus_status();
        }
        self.focused.map(Target::Message)
    }

    /// Move to the previous message, entering at its last element unless
    /// `focus_top` is set or the message is collapsed.
    pub fn focus_previous(&mut self, focus_top: bool) -> Option<Target> {
        if self.edit_mode {
            return None;
        }
        let key = self.focused?;
        let pos = self.position(key)?;
        if pos > 0 {
            let prev = MessageKey(pos - 1);
            self.focused = Some(prev);
            let hidden = self.is_hidden(prev);
            if let Some(state) = self.states.get_mut(&prev) {
                let index = if focus_top || hidden {
                    0
                } else {
                    state.last_index()
                };
                state.set_current(index);
            }
            self.update_focus_status();
        }
        self.focused.map(Target::Message)
    }

    /// Collapse a message that was only opened for traversal.
    fn leave_scroll_expanded(&mut self) {
        let Some(key) = self.focused else {
            return;
        };
        if self.states.get(&key).is_some_and(|s| s.scroll_expanded) {
            self.toggle_hidden(key, ToggleMode::HideOnly);
            if let Some(state) = self.states.get_mut(&key) {
                state.scroll_expanded = false;
            }
        }
    }

    fn enter_scroll_expanded(&mut self) {
        let Some(key) = self.focused else {
            return;
        };
        if self.is_hidden(key) {
            self.toggle_hidden(key, ToggleMode::ShowOnly);
            if let Some(state) = self.states.get_mut(&key) {
                state.scroll_expanded = true;
            }
        }
        self.scroll_to_message(key, false);
    }

    /// Next message, expanding it for the visit.
    pub fn focus_next_expand(&mut self) {
        self.leave_scroll_expanded();
        self.focus_next();
        self.enter_scroll_expanded();
    }

    /// Previous message, expanding it for the visit.
    pub fn focus_previous_expand(&mut self) {
        self.leave_scroll_expanded();
        self.focus_previous(false);
        self.enter_scroll_expanded();
    }

    pub fn next_message(&mut self) {
        self.focus_next();
        if let Some(key) = self.focused {
            self.scroll_to_message(key, false);
        }
    }

    pub fn previous_message(&mut self) {
        self.focus_previous(true);
        if let Some(key) = self.focused {
            self.scroll_to_message(key, false);
        }
    }

    pub fn next_unread(&mut self) -> bool {
        let Some(pos) = self.focused.and_then(|k| self.position(k)) else {
            return false;
        };
        let found = (pos + 1..self.messages.len())
            .find(|&i| self.messages[i].has_tag(TAG_UNREAD));
        self.jump_to(found)
    }

    pub fn previous_unread(&mut self) -> bool {
        let Some(pos) = self.focused.and_then(|k| self.position(k)) else {
            return false;
        };
        let found = (0..pos)
            .rev()
            .find(|&i| self.messages[i].has_tag(TAG_UNREAD));
        self.jump_to(found)
    }

    fn jump_to(&mut self, pos: Option<usize>) -> bool {
        let Some(pos) = pos else {
            return false;
        };
        self.scroll_to_message(MessageKey(pos), false)
    }

    /// Focus a message and scroll it into view.
    pub fn scroll_to_message(&mut self, key: MessageKey, scroll_when_visible: bool) -> bool {
        if self.position(key).is_none() {
            log::warn!("tv: focusing: no such message {:?}", key);
            return false;
        }
        self.focused = Some(key);
        if self.edit_mode {
            return false;
        }
        self.scroll_to_element(Target::Message(key), scroll_when_visible)
    }

    /// Bring `target` into view and refresh focus.
    ///
    /// Returns false when the surface has no layout yet; the scroll is
    /// retried on the next viewport change.
    pub fn scroll_to_element(&mut self, target: Target, scroll_when_visible: bool) -> bool {
        let viewport = self.surface.viewport();
        let bounds = self.surface.bounds(target);

        if let (Some(vp), Some(b)) = (viewport, bounds) {
            if vp.page_size > 0.0 {
                let value = if scroll_when_visible {
                    if b.top + b.height - vp.page_size > vp.upper {
                        vp.upper
                    } else {
                        b.top
                    }
                } else if b.top < vp.value {
                    b.top
                } else if b.bottom() > vp.bottom() {
                    if b.height < vp.page_size {
                        b.bottom() - vp.page_size
                    } else {
                        b.top
                    }
                } else {
                    vp.value
                };
                let value = vp.clamp(value);
                if value != vp.value {
                    self.surface.set_scroll(value);
                }
            }
        }

        self.update_focus_status();

        if viewport.is_none() || bounds.is_none() {
            let (key, chunk_id) = match target {
                Target::Message(key) => (key, None),
                Target::Element(key, chunk) => (key, Some(chunk)),
            };
            log::debug!("tv: layout not ready, deferring scroll");
            self.pending_scroll = Some(PendingScroll {
                key,
                chunk_id,
                scroll_when_visible,
            });
            return false;
        }
        true
    }

    pub fn scroll_down(&mut self) {
        let step = self.surface.viewport().map_or(0.0, |vp| vp.step);
        if self.scroll_by(step) {
            self.update_focus_to_view();
        }
    }

    pub fn scroll_up(&mut self) {
        let step = self.surface.viewport().map_or(0.0, |vp| vp.step);
        if self.scroll_by(-step) {
            self.update_focus_to_view();
        }
    }

    pub fn page_down(&mut self) {
        if self.scroll_with(|vp| vp.value + vp.page_increment) {
            self.update_focus_to_view();
        }
    }

    pub fn page_up(&mut self) {
        if self.scroll_with(|vp| vp.value - vp.page_increment) {
            self.update_focus_to_view();
        }
    }

    /// Scroll to the top and focus the first message.
    pub fn home(&mut self) {
        self.scroll_with(|vp| vp.lower);
        if !self.messages.is_empty() {
            self.focused = Some(MessageKey(0));
            self.update_focus_status();
        }
    }

    /// Scroll to the bottom and focus the last message.
    pub fn end(&mut self) {
        self.scroll_with(|vp| vp.upper);
        if let Some(last) = self.messages.len().checked_sub(1) {
            self.focused = Some(MessageKey(last));
            self.update_focus_status();
        }
    }

    /// Keep focus on a message that is at least partly visible.
    ///
    /// When the focused message left the view, the first visible message
    /// takes over, or the last visible one above it if it went below.
    pub fn update_focus_to_view(&mut self) {
        if self.edit_mode || self.messages.is_empty() {
            return;
        }
        let Some(vp) = self.surface.viewport() else {
            return;
        };

        let focused = match self.focused {
            Some(k) => k,
            None => {
                self.focused = Some(MessageKey(0));
                self.update_focus_status();
                MessageKey(0)
            }
        };

        let in_view = |s: &Self, key: MessageKey| {
            vp.page_size == 0.0
                || s.surface
                    .bounds(Target::Message(key))
                    .is_some_and(|b| b.top <= vp.bottom() && b.bottom() >= vp.value)
        };

        if in_view(self, focused) {
            return;
        }

        let mut found = None;
        for key in self.keys() {
            if (found.is_none() || key < focused) && in_view(self, key) {
                found = Some(key);
            }
        }

        if let Some(key) = found {
            self.focused = Some(key);
            self.update_focus_status();
        }
    }

    /// Focus the message under the vertical center of the view.
    pub fn update_focus_to_center(&mut self) {
        if self.edit_mode {
            return;
        }
        if let Some(vp) = self.surface.viewport() {
            let center = vp.center();
            let hit = self.keys().find(|&key| {
                self.surface
                    .bounds(Target::Message(key))
                    .is_some_and(|b| b.top < center && b.bottom() > center)
            });
            if let Some(key) = hit {
                self.focused = Some(key);
            }
        }
        self.update_focus_status();
    }

    /// The surface reports that layout or scroll position changed.
    pub fn on_viewport_changed(&mut self) {
        if let Some(pending) = self.pending_scroll.take() {
            log::debug!("tv: re-doing scroll");
            let target = match pending.chunk_id {
                Some(chunk) => Target::Element(pending.key, chunk),
                None => Target::Message(pending.key),
            };
            if self.scroll_to_element(target, pending.scroll_when_visible) {
                self.arm_unread_timer();
            }
        }

        if self.search.active && self.search.in_match {
            self.update_focus_to_center();
            self.search.in_match = false;
        }
    }

    /// Focus a message the user clicked on.
    pub fn focus_message(&mut self, key: MessageKey) {
        if self.position(key).is_none() {
            return;
        }
        self.focused = Some(key);
        self.update_focus_status();
    }
}
