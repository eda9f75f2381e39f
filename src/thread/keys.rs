//! Named actions of the thread view and the tables that resolve them.
//!
//! Key bindings belong to the host; these tables only map action names
//! to handlers over a controller.

use super::controller::{ThreadController, ToggleMode};
use super::notify::{ElementAction, IndexAction};
use super::surface::Surface;

pub type Handler<S> = fn(&mut ThreadController<S>) -> bool;

pub struct Action<S: Surface> {
    pub name: &'static str,
    pub help: &'static str,
    pub handler: Handler<S>,
}

pub struct ActionTable<S: Surface> {
    actions: Vec<Action<S>>,
}

impl<S: Surface> ActionTable<S> {
    fn from_entries(actions: Vec<Action<S>>) -> Self {
        Self { actions }
    }

    pub fn get(&self, name: &str) -> Option<&Action<S>> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Run the named action. Returns false for unknown names or when
    /// the action did not apply.
    pub fn dispatch(&self, name: &str, controller: &mut ThreadController<S>) -> bool {
        match self.get(name) {
            Some(action) => (action.handler)(controller),
            None => {
                log::warn!("tv: unknown action: {}", name);
                false
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action<S>> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions of the thread view itself.
    pub fn thread_view() -> Self {
        Self::from_entries(vec![
            action("next_element", "Focus next element or scroll down", |c| {
                c.focus_next_element(false);
                true
            }),
            action("next_element_force", "Focus next element", |c| {
                if let Some(target) = c.focus_next_element(true) {
                    c.scroll_to_element(target, false);
                }
                true
            }),
            action("previous_element", "Focus previous element or scroll up", |c| {
                c.focus_previous_element(false);
                true
            }),
            action("previous_element_force", "Focus previous element", |c| {
                if let Some(target) = c.focus_previous_element(true) {
                    c.scroll_to_element(target, false);
                }
                true
            }),
            action("scroll_down", "Scroll down", |c| {
                c.scroll_down();
                true
            }),
            action("scroll_up", "Scroll up", |c| {
                c.scroll_up();
                true
            }),
            action("page_down", "Page down", |c| {
                c.page_down();
                true
            }),
            action("page_up", "Page up", |c| {
                c.page_up();
                true
            }),
            action("home", "Scroll home", |c| {
                c.home();
                true
            }),
            action("end", "Scroll to end", |c| {
                c.end();
                true
            }),
            action("activate", "Open/expand/activate focused element", |c| {
                c.element_action(ElementAction::Enter)
            }),
            action("save", "Save attachment or message", |c| {
                c.element_action(ElementAction::Save)
            }),
            action("delete_attachment", "Delete attachment (if editing)", |c| {
                c.is_edit_mode() && c.element_action(ElementAction::Delete)
            }),
            action("expand", "Toggle expand", |c| match c.focused() {
                Some(key) if !c.is_edit_mode() => {
                    c.toggle_hidden(key, ToggleMode::Toggle);
                    true
                }
                _ => false,
            }),
            action("toggle_expand_all", "Toggle expand on all messages", |c| {
                if c.is_edit_mode() {
                    return false;
                }
                c.toggle_expand_all();
                true
            }),
            action("mark", "Mark or unmark message", |c| c.toggle_mark()),
            action("toggle_mark_all", "Toggle mark on all messages", |c| {
                c.toggle_mark_all()
            }),
            action("save_all_attachments", "Save all attachments", |c| {
                c.save_all_attachments()
            }),
            action("next_message", "Focus next message", |c| {
                c.next_message();
                true
            }),
            action("next_message_expand", "Focus next message (and expand if necessary)", |c| {
                c.focus_next_expand();
                true
            }),
            action("previous_message", "Focus previous message", |c| {
                c.previous_message();
                true
            }),
            action(
                "previous_message_expand",
                "Focus previous message (and expand if necessary)",
                |c| {
                    c.focus_previous_expand();
                    true
                },
            ),
            action("next_unread", "Focus the next unread message", |c| {
                c.next_unread();
                true
            }),
            action("previous_unread", "Focus the previous unread message", |c| {
                c.previous_unread();
                true
            }),
            action("toggle_unread", "Toggle unread", |c| c.toggle_unread()),
            action("flag", "Toggle flagged", |c| c.toggle_flagged()),
            action("archive", "Toggle 'inbox' tag on the whole thread", |c| {
                c.toggle_archive()
            }),
            action("tag", "Tag message", |c| c.edit_tags()),
            action("print", "Print focused message", |c| c.print_focused()),
            action("toggle_flat", "Toggle flat or indented view of messages", |c| {
                c.toggle_flat();
                true
            }),
            action("yank_mid", "Yank message id", |c| {
                c.yank_mid();
                true
            }),
            action("yank", "Yank current element or message text", |c| {
                c.element_action(ElementAction::Yank)
            }),
            action("yank_raw", "Yank raw content of current element or message", |c| {
                c.element_action(ElementAction::YankRaw)
            }),
            action("search_next", "Go to next match", |c| c.next_match()),
            action("search_previous", "Go to previous match", |c| c.prev_match()),
            action("search_cancel", "Cancel current search", |c| {
                c.reset_search();
                true
            }),
            action("archive_then_next", "Archive, goto next", |c| {
                c.archive_then(IndexAction::Next)
            }),
            action("archive_then_next_unread", "Archive, goto next unread", |c| {
                c.archive_then(IndexAction::NextUnread)
            }),
            action("close", "Close the thread view", |c| {
                c.index_action(IndexAction::Close)
            }),
        ])
    }

    /// Actions over the marked messages.
    pub fn multi() -> Self {
        Self::from_entries(vec![
            action("unmark_all", "Unmark all messages", |c| {
                c.unmark_all();
                true
            }),
            action("tag", "Tag marked messages", |c| c.multi_tag()),
            action("yank_mids", "Yank message ids of marked messages", |c| {
                c.multi_yank_mids()
            }),
            action("yank", "Yank marked messages", |c| c.multi_yank()),
            action("yank_raw", "Yank raw marked messages as mbox", |c| {
                c.multi_yank_raw()
            }),
            action("save", "Save marked messages", |c| c.multi_save()),
            action("print", "Print marked messages", |c| c.multi_print()),
        ])
    }

    /// Actions that leave this thread for another one.
    pub fn next_thread() -> Self {
        Self::from_entries(vec![
            action("archive_next", "Archive, goto next", |c| {
                c.archive_then(IndexAction::Next)
            }),
            action("archive_next_unread", "Archive, goto next unread", |c| {
                c.archive_then(IndexAction::NextUnread)
            }),
            action("archive_close", "Archive, close", |c| {
                c.archive_then(IndexAction::Close)
            }),
            action("next", "Goto next", |c| c.index_action(IndexAction::Next)),
            action("previous", "Goto previous", |c| {
                c.index_action(IndexAction::Previous)
            }),
            action("next_unread", "Goto next unread", |c| {
                c.index_action(IndexAction::NextUnread)
            }),
            action("previous_unread", "Goto previous unread", |c| {
                c.index_action(IndexAction::PreviousUnread)
            }),
        ])
    }
}

fn action<S: Surface>(name: &'static str, help: &'static str, handler: Handler<S>) -> Action<S> {
    Action {
        name,
        help,
        handler,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread::surface::{Bounds, Class, Target, Viewport};
    use crate::thread::state::MessageKey;
    use crate::mail::types::ChunkId;
    use crate::render::document::MessageDocument;

    struct NullSurface;

    impl Surface for NullSurface {
        fn add_message(&mut self, _: MessageKey, _: &MessageDocument) {}
        fn bounds(&self, _: Target) -> Option<Bounds> {
            None
        }
        fn viewport(&self) -> Option<Viewport> {
            None
        }
        fn set_scroll(&mut self, _: f64) {}
        fn set_class(&mut self, _: Target, _: Class, _: bool) {}
        fn set_indent(&mut self, _: bool) {}
        fn display_part(&mut self, _: MessageKey, _: ChunkId) {}
        fn set_tags(&mut self, _: MessageKey, _: &[String]) {}
        fn mark_matches(&mut self, _: &str) -> usize {
            0
        }
        fn clear_matches(&mut self) {}
        fn find_match(&mut self, _: &str, _: bool) -> bool {
            false
        }
        fn print(&mut self, _: &[MessageKey]) {}
    }

    #[test]
    fn test_action_names_are_unique() {
        for table in [
            ActionTable::<NullSurface>::thread_view(),
            ActionTable::<NullSurface>::multi(),
            ActionTable::<NullSurface>::next_thread(),
        ] {
            let mut names: Vec<_> = table.iter().map(|a| a.name).collect();
            let len = names.len();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), len);
            assert!(!table.is_empty());
        }
    }

    #[test]
    fn test_dispatch_unknown_action() {
        let table = ActionTable::<NullSurface>::thread_view();
        let mut c = ThreadController::new(NullSurface, Default::default()).unwrap();
        assert!(!table.dispatch("no_such_action", &mut c));
        assert!(table.get("next_element").is_some());
    }
}
