//! Element actions, marking, tagging and batch commands.

use chrono::{DateTime, Local};

use super::controller::{ThreadController, ToggleMode};
use super::links::{self, LinkTarget};
use super::notify::{ElementAction, IndexAction, Notification};
use super::state::{ElementKind, MessageKey};
use super::surface::{Class, Surface, Target};
use crate::mail::types::{Message, TAG_FLAGGED, TAG_INBOX, TAG_UNREAD};
use crate::render::mime_tree::{self, PlainText, RenderNode};

impl<S: Surface> ThreadController<S> {
    /// Act on the focused message or on its selected element.
    pub fn element_action(&mut self, action: ElementAction) -> bool {
        let Some(key) = self.focused else {
            log::error!("tv: element action: no message focused");
            return false;
        };
        let Some(state) = self.states.get(&key) else {
            return false;
        };
        let hidden = state.hidden;
        let index = state.current_element();
        let element = *state.current();

        if index == 0 {
            match action {
                ElementAction::Enter => {
                    if hidden || !self.edit_mode {
                        self.toggle_hidden(key, ToggleMode::Toggle);
                    }
                }
                ElementAction::Save => self.emit(Notification::SaveMessages(vec![key])),
                ElementAction::YankRaw => {
                    if let Some(msg) = self.message(key) {
                        let text = msg.raw_unix();
                        self.yank(text);
                    }
                }
                ElementAction::Yank => {
                    if let Some(msg) = self.message(key) {
                        let text = msg.viewable_text();
                        self.yank(text);
                    }
                }
                ElementAction::Delete => {}
            }
            return true;
        }

        let Some(chunk_id) = element.chunk_id else {
            log::error!("tv: element {} has no chunk", index);
            return false;
        };
        let Some(chunk) = self.message(key).and_then(|m| m.chunk(chunk_id)) else {
            log::error!("tv: could not find chunk for element {}", index);
            return false;
        };

        match action {
            ElementAction::Yank => {
                if chunk.viewable {
                    let text = chunk.text.clone().unwrap_or_default();
                    self.yank(text);
                } else {
                    log::error!("tv: cannot yank text of non-viewable part");
                }
            }
            ElementAction::YankRaw => {
                let text = chunk.raw_unix();
                self.yank(text);
            }
            ElementAction::Enter => match element.kind {
                ElementKind::Attachment => self.emit(Notification::OpenChunk { key, chunk_id }),
                ElementKind::Part => {
                    if self.config.open_html_part_external {
                        self.emit(Notification::OpenChunk { key, chunk_id });
                    } else {
                        self.display_part(key, index);
                    }
                }
                ElementKind::MimeMessage => {
                    self.emit(Notification::OpenEmbedded { key, chunk_id })
                }
                ElementKind::Empty => {}
            },
            ElementAction::Save => self.emit(Notification::SaveChunk { key, chunk_id }),
            ElementAction::Delete => {}
        }

        self.emit(Notification::ElementAction {
            key,
            element: index,
            action,
        });
        true
    }

    /// Show an inline part in place of its placeholder.
    ///
    /// The placeholder element goes away and the part's own collapsed
    /// alternatives become new elements.
    pub fn display_part(&mut self, key: MessageKey, index: usize) {
        let Some(state) = self.states.get_mut(&key) else {
            return;
        };
        let Some(removed) = state.remove_element(index) else {
            log::error!("tv: display part: no element {}", index);
            return;
        };
        let Some(chunk_id) = removed.chunk_id else {
            return;
        };
        self.surface.display_part(key, chunk_id);

        let nested: Vec<_> = self
            .messages
            .get(key.0)
            .and_then(|m| m.chunk(chunk_id))
            .and_then(|c| mime_tree::build(c, false, &PlainText))
            .map(|node| match node {
                RenderNode::Part(part) => part
                    .children
                    .iter()
                    .flat_map(|c| c.collapsed_parts())
                    .map(|p| p.chunk_id)
                    .collect(),
                RenderNode::Group { .. } => Vec::new(),
            })
            .unwrap_or_default();

        if let Some(state) = self.states.get_mut(&key) {
            for id in nested {
                state.add_element(ElementKind::Part, id);
            }
        }
        self.update_focus_status();
    }

    fn yank(&mut self, text: String) {
        self.emit(Notification::Yank(text));
    }

    pub fn yank_mid(&mut self) {
        if let Some(mid) = self.focused.and_then(|k| self.message(k)).map(|m| m.mid.clone()) {
            self.yank(mid);
        }
    }

    pub fn marked(&self) -> Vec<MessageKey> {
        self.keys()
            .filter(|k| self.states.get(k).is_some_and(|s| s.marked))
            .collect()
    }

    fn set_marked(&mut self, key: MessageKey, marked: bool) {
        if let Some(state) = self.states.get_mut(&key) {
            state.marked = marked;
            self.surface
                .set_class(Target::Message(key), Class::Marked, marked);
        }
    }

    pub fn toggle_mark(&mut self) -> bool {
        if self.edit_mode {
            return false;
        }
        let Some(key) = self.focused else {
            return false;
        };
        let marked = self.states.get(&key).is_some_and(|s| s.marked);
        self.set_marked(key, !marked);
        true
    }

    /// Mark the rest when some but not all are marked; otherwise flip every mark.
    pub fn toggle_mark_all(&mut self) -> bool {
        if self.edit_mode {
            return false;
        }
        let keys: Vec<MessageKey> = self.keys().collect();
        let marked = self.marked().len();
        let union = marked > 0 && marked < keys.len();
        for key in keys {
            let value = union || !self.states.get(&key).is_some_and(|s| s.marked);
            self.set_marked(key, value);
        }
        true
    }

    pub fn unmark_all(&mut self) {
        for key in self.keys().collect::<Vec<_>>() {
            self.set_marked(key, false);
        }
    }

    /// Flip the unread tag; the read timer leaves this message alone afterwards.
    pub fn toggle_unread(&mut self) -> bool {
        let Some(key) = self.focused else {
            return false;
        };
        if let Some(state) = self.states.get_mut(&key) {
            state.unread_checked = true;
        }
        self.toggle_tag(key, TAG_UNREAD);
        true
    }

    pub fn toggle_flagged(&mut self) -> bool {
        let Some(key) = self.focused else {
            return false;
        };
        self.toggle_tag(key, TAG_FLAGGED);
        true
    }

    fn toggle_tag(&mut self, key: MessageKey, tag: &str) {
        let has = self.message(key).is_some_and(|m| m.has_tag(tag));
        if has {
            self.change_tags(key, &[], &[tag]);
        } else {
            self.change_tags(key, &[tag], &[]);
        }
    }

    /// Drop the thread from the inbox, or put it back if it already left.
    pub fn toggle_archive(&mut self) -> bool {
        if self.messages.is_empty() {
            return false;
        }
        let in_inbox = self.messages.iter().any(|m| m.has_tag(TAG_INBOX));
        for key in self.keys().collect::<Vec<_>>() {
            if in_inbox {
                self.change_tags(key, &[], &[TAG_INBOX]);
            } else {
                self.change_tags(key, &[TAG_INBOX], &[]);
            }
        }
        true
    }

    /// Ask the host for a tag editor on the focused message.
    pub fn edit_tags(&mut self) -> bool {
        let Some(key) = self.focused else {
            return false;
        };
        if let Some(state) = self.states.get_mut(&key) {
            state.unread_checked = true;
        }
        self.emit(Notification::EditTags(vec![key]));
        true
    }

    pub fn save_all_attachments(&mut self) -> bool {
        if self.edit_mode {
            return false;
        }
        let Some(key) = self.focused else {
            return false;
        };
        self.emit(Notification::SaveAttachments(vec![key]));
        true
    }

    pub fn index_action(&mut self, action: IndexAction) -> bool {
        self.emit(Notification::IndexAction(action));
        true
    }

    pub fn archive_then(&mut self, action: IndexAction) -> bool {
        self.toggle_archive();
        self.index_action(action)
    }

    pub fn print_focused(&mut self) -> bool {
        let Some(key) = self.focused else {
            return false;
        };
        self.print(vec![key]);
        true
    }

    /// Print with every message shown and indentation off, then restore both.
    pub fn print(&mut self, keys: Vec<MessageKey>) {
        for &key in &keys {
            if self.is_hidden(key) {
                let was_shown = self.toggle_hidden(key, ToggleMode::ShowOnly);
                if let Some(state) = self.states.get_mut(&key) {
                    state.print_expanded = !was_shown;
                }
            }
        }

        let indent = self.indent;
        if indent {
            self.surface.set_indent(false);
        }
        self.surface.print(&keys);
        if indent {
            self.surface.set_indent(true);
        }

        for &key in &keys {
            let transient = self.states.get(&key).is_some_and(|s| s.print_expanded);
            if transient {
                self.toggle_hidden(key, ToggleMode::HideOnly);
                if let Some(state) = self.states.get_mut(&key) {
                    state.print_expanded = false;
                }
            }
        }
    }

    pub fn multi_tag(&mut self) -> bool {
        let keys = self.marked();
        for key in &keys {
            if let Some(state) = self.states.get_mut(key) {
                state.unread_checked = true;
            }
        }
        self.emit(Notification::EditTags(keys));
        true
    }

    pub fn multi_yank_mids(&mut self) -> bool {
        let mids: Vec<String> = self
            .marked()
            .into_iter()
            .filter_map(|k| self.message(k).map(|m| m.mid.clone()))
            .collect();
        self.yank(mids.join(", "));
        true
    }

    pub fn multi_yank(&mut self) -> bool {
        let texts: Vec<String> = self
            .marked()
            .into_iter()
            .filter_map(|k| self.message(k).map(Message::viewable_text))
            .collect();
        self.yank(texts.join("\n"));
        true
    }

    /// Marked messages as an mbox.
    pub fn multi_yank_raw(&mut self) -> bool {
        let mbox: String = self
            .marked()
            .into_iter()
            .filter_map(|k| self.message(k).map(mbox_entry))
            .collect();
        self.yank(mbox);
        true
    }

    pub fn multi_save(&mut self) -> bool {
        let keys = self.marked();
        self.emit(Notification::SaveMessages(keys));
        true
    }

    pub fn multi_print(&mut self) -> bool {
        let keys = self.marked();
        self.print(keys);
        true
    }

    /// React to a link activated on the surface.
    pub fn open_link(&mut self, uri: &str) {
        match links::classify(uri) {
            LinkTarget::Mailto(to) => self.emit(Notification::Compose { to }),
            LinkTarget::MessageId(mid) => self.emit(Notification::OpenMessageId(mid)),
            LinkTarget::External(uri) => {
                links::open_external(&self.config.open_external_link, &uri);
            }
            LinkTarget::Unknown(uri) => log::error!("tv: unknown uri scheme: {}", uri),
        }
    }
}

fn mbox_entry(msg: &Message) -> String {
    let sender = msg.from.as_ref().map(|a| a.addr.as_str()).unwrap_or("");
    let date = DateTime::from_timestamp(msg.timestamp, 0)
        .map(|d| d.with_timezone(&Local).format("%a %b %e %H:%M:%S %Y").to_string())
        .unwrap_or_default();
    format!("From {}  {}\n{}\n", sender, date, msg.raw_unix())
}
