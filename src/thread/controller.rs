use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use anyhow::Result;

use super::notify::Notification;
use super::state::{ElementKind, MessageKey, MessageState};
use super::surface::{Class, Clock, Surface, SystemClock, Target};
use super::timer::{self, UnreadTimer};
use crate::config::ThreadViewConfig;
use crate::mail::types::{ChunkId, Message, TAG_FLAGGED, TAG_UNREAD};
use crate::render::document::{CodeFilter, CodeTags, MessageDocument};
use crate::render::mime_tree::{ContentRenderer, PlainText};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleMode {
    Toggle,
    ShowOnly,
    HideOnly,
}

/// A scroll that could not be done because the surface had no layout yet.
#[derive(Debug, Clone, Copy)]
pub(super) struct PendingScroll {
    pub key: MessageKey,
    pub chunk_id: Option<ChunkId>,
    pub scroll_when_visible: bool,
}

#[derive(Debug, Default)]
pub(super) struct SearchState {
    pub active: bool,
    pub query: String,
    /// A match was just jumped to; refocus once the viewport settles.
    pub in_match: bool,
}

/// Interaction state of one open thread.
pub struct ThreadController<S: Surface> {
    pub(super) surface: S,
    pub(super) clock: Box<dyn Clock>,
    pub(super) config: ThreadViewConfig,
    code_tags: Option<CodeTags>,
    renderer: Box<dyn ContentRenderer>,
    pub(super) messages: Vec<Message>,
    pub(super) states: HashMap<MessageKey, MessageState>,
    pub(super) focused: Option<MessageKey>,
    pub(super) ready: bool,
    pub(super) edit_mode: bool,
    pub(super) indent: bool,
    pub(super) search: SearchState,
    pub(super) focus_time: Instant,
    pub(super) read_delay: f64,
    unread_setup: bool,
    timer: Option<UnreadTimer>,
    pub(super) pending_scroll: Option<PendingScroll>,
    shown_focus: Option<Target>,
    pub(super) outbox: Vec<Notification>,
}

impl<S: Surface> ThreadController<S> {
    pub fn new(surface: S, config: ThreadViewConfig) -> Result<Self> {
        Self::with_clock(surface, config, Box::new(SystemClock))
    }

    /// Fails when the code prettifier is misconfigured.
    pub fn with_clock(surface: S, config: ThreadViewConfig, clock: Box<dyn Clock>) -> Result<Self> {
        let code_tags = config.code_tags()?;
        let now = clock.now();
        Ok(Self {
            surface,
            clock,
            code_tags,
            renderer: Box::new(PlainText),
            messages: Vec::new(),
            states: HashMap::new(),
            focused: None,
            ready: false,
            edit_mode: false,
            indent: config.indent_messages,
            search: SearchState::default(),
            focus_time: now,
            read_delay: config.mark_unread_delay,
            unread_setup: false,
            timer: None,
            pending_scroll: None,
            shown_focus: None,
            outbox: Vec::new(),
            config,
        })
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn ContentRenderer>) {
        self.renderer = renderer;
    }

    /// Tags are shown read-only and nothing is marked read.
    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.edit_mode = edit_mode;
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn config(&self) -> &ThreadViewConfig {
        &self.config
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, key: MessageKey) -> Option<&Message> {
        self.messages.get(key.0)
    }

    pub fn state(&self, key: MessageKey) -> Option<&MessageState> {
        self.states.get(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = MessageKey> + use<S> {
        (0..self.messages.len()).map(MessageKey)
    }

    pub fn focused(&self) -> Option<MessageKey> {
        self.focused
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_hidden(&self, key: MessageKey) -> bool {
        self.states.get(&key).is_none_or(|s| s.hidden)
    }

    pub fn is_indented(&self) -> bool {
        self.indent
    }

    pub fn search_active(&self) -> bool {
        self.search.active
    }

    pub fn search_query(&self) -> &str {
        &self.search.query
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    pub(super) fn emit(&mut self, n: Notification) {
        self.outbox.push(n);
    }

    pub(super) fn position(&self, key: MessageKey) -> Option<usize> {
        (key.0 < self.messages.len()).then_some(key.0)
    }

    /// Render the thread and settle the initial focus.
    ///
    /// Unread messages start expanded, flagged ones too when configured.
    /// The first unread message takes focus, else the newest one is shown.
    pub fn load(&mut self, messages: Vec<Message>) {
        self.ready = false;
        self.unread_setup = false;
        self.timer = None;
        self.states.clear();
        self.focused = None;
        self.shown_focus = None;
        self.search = SearchState::default();
        self.messages = messages;

        for pos in 0..self.messages.len() {
            self.add_message(MessageKey(pos));
        }
        self.surface.set_indent(self.indent);

        let mut candidate = None;
        for key in self.keys() {
            let Some(msg) = self.message(key) else {
                continue;
            };
            let unread = msg.has_tag(TAG_UNREAD);
            let flagged = self.config.expand_flagged && msg.has_tag(TAG_FLAGGED);
            if unread || flagged {
                self.toggle_hidden(key, ToggleMode::ShowOnly);
            }
            if unread && candidate.is_none() {
                candidate = Some(key);
            }
        }

        let focus = match candidate {
            Some(key) => Some(key),
            None => {
                let newest = self
                    .keys()
                    .max_by_key(|k| self.messages[k.0].timestamp);
                if let Some(key) = newest {
                    log::debug!("tv: no unread message, showing newest");
                    self.toggle_hidden(key, ToggleMode::ShowOnly);
                }
                newest
            }
        };

        self.ready = true;
        let Some(key) = focus else {
            log::warn!("tv: empty thread");
            self.emit(Notification::Ready);
            return;
        };

        let scrolled = self.scroll_to_message(key, true);
        self.emit(Notification::Ready);
        if scrolled {
            self.arm_unread_timer();
        }
    }

    /// Unload the thread; a running read timer stops at its next tick.
    pub fn unload(&mut self) {
        self.ready = false;
        self.states.clear();
        self.focused = None;
        self.pending_scroll = None;
    }

    fn add_message(&mut self, key: MessageKey) {
        let Some(msg) = self.messages.get(key.0) else {
            return;
        };
        log::debug!("tv: adding message: {}", msg.mid);

        let doc = match &self.code_tags {
            Some(tags) => {
                let filter = CodeFilter {
                    tags,
                    inner: self.renderer.as_ref(),
                };
                MessageDocument::build(msg, &filter)
            }
            None => MessageDocument::build(msg, self.renderer.as_ref()),
        };

        let mut state = MessageState::new();
        for a in &doc.attachments {
            state.add_element(ElementKind::Attachment, a.chunk_id);
        }
        for m in &doc.mime_messages {
            state.add_element(ElementKind::MimeMessage, m.chunk_id);
        }
        for p in &doc.inline_parts {
            state.add_element(ElementKind::Part, p.chunk_id);
        }

        self.surface.add_message(key, &doc);
        self.surface
            .set_class(Target::Message(key), Class::Hidden, state.hidden);
        self.states.insert(key, state);
    }

    pub(super) fn arm_unread_timer(&mut self) {
        if self.unread_setup {
            return;
        }
        self.unread_setup = true;
        match timer::interval_for(self.read_delay) {
            Some(interval) => {
                self.timer = Some(UnreadTimer::start(interval, self.clock.now()));
            }
            None => {
                self.unread_check();
            }
        }
    }

    /// Run the read check if due. Returns false once the timer has stopped.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now();
        let Some(timer) = self.timer.as_mut() else {
            return false;
        };
        if !timer.is_due(now) {
            return true;
        }
        timer.reschedule(now);
        if !self.unread_check() {
            log::debug!("tv: stopping read timer");
            self.timer = None;
            return false;
        }
        true
    }

    /// Time until the next `tick` has work to do.
    pub fn next_tick_in(&self) -> Option<Duration> {
        self.timer.map(|t| t.remaining(self.clock.now()))
    }

    /// Mark the focused message read once it has been shown long enough.
    ///
    /// Returns false when the thread is no longer loaded.
    pub fn unread_check(&mut self) -> bool {
        if !self.ready {
            return false;
        }
        if self.edit_mode {
            return true;
        }
        let Some(key) = self.focused else {
            return true;
        };
        let Some(msg) = self.messages.get(key.0) else {
            return true;
        };
        if !msg.in_store {
            return true;
        }
        let Some(state) = self.states.get(&key) else {
            return true;
        };
        if state.unread_checked || state.hidden {
            return true;
        }

        let elapsed = self
            .clock
            .now()
            .saturating_duration_since(self.focus_time)
            .as_secs_f64();
        if (self.read_delay == 0.0 || elapsed >= self.read_delay) && msg.has_tag(TAG_UNREAD) {
            self.change_tags(key, &[], &[TAG_UNREAD]);
            if let Some(state) = self.states.get_mut(&key) {
                state.unread_checked = true;
            }
        }
        true
    }

    /// Apply a tag change and tell the surface and the host about it.
    pub(super) fn change_tags(&mut self, key: MessageKey, add: &[&str], remove: &[&str]) {
        let Some(msg) = self.messages.get_mut(key.0) else {
            log::error!("tv: tag change for unknown message {:?}", key);
            return;
        };
        let mut added = BTreeSet::new();
        let mut removed = BTreeSet::new();
        for tag in add {
            if msg.tags.insert(tag.to_string()) {
                added.insert(tag.to_string());
            }
        }
        for tag in remove {
            if msg.tags.remove(*tag) {
                removed.insert(tag.to_string());
            }
        }
        if added.is_empty() && removed.is_empty() {
            return;
        }
        log::info!(
            "tv: tags {}: +{:?} -{:?}",
            msg.mid,
            added.iter().collect::<Vec<_>>(),
            removed.iter().collect::<Vec<_>>()
        );
        let tags: Vec<String> = msg.tags.iter().cloned().collect();
        if !self.edit_mode {
            self.surface.set_tags(key, &tags);
        }
        self.emit(Notification::TagsChanged {
            key,
            added,
            removed,
        });
    }

    /// Apply a tag edit to several messages, e.g. from a tag editor.
    pub fn apply_tags(&mut self, keys: &[MessageKey], add: &[&str], remove: &[&str]) {
        for &key in keys {
            self.change_tags(key, add, remove);
        }
    }

    /// The store moved the message file.
    pub fn relocate(&mut self, key: MessageKey, path: std::path::PathBuf) {
        if let Some(msg) = self.messages.get_mut(key.0) {
            msg.file_path = Some(path);
        }
    }

    /// Tags changed outside the view, e.g. by another client.
    pub fn on_tags_changed(&mut self, mid: &str, tags: BTreeSet<String>) {
        if self.edit_mode || !self.ready {
            return;
        }
        let Some(pos) = self.messages.iter().position(|m| m.mid == mid) else {
            return;
        };
        log::debug!("tv: got message updated: {}", mid);
        let shown: Vec<String> = tags.iter().cloned().collect();
        self.messages[pos].tags = tags;
        self.surface.set_tags(MessageKey(pos), &shown);
    }

    /// Push focus classes for the current cursor and restart the read delay.
    pub(super) fn update_focus_status(&mut self) {
        let target = self.focused.map(|key| {
            let chunk = self
                .states
                .get(&key)
                .filter(|s| s.current_element() > 0)
                .and_then(|s| s.current().chunk_id);
            match chunk {
                Some(chunk_id) => Target::Element(key, chunk_id),
                None => Target::Message(key),
            }
        });

        if target != self.shown_focus {
            if let Some(old) = self.shown_focus.take() {
                self.set_focus_class(old, false);
            }
            if let Some(new) = target {
                self.set_focus_class(new, true);
            }
            self.shown_focus = target;
        }

        self.focus_time = self.clock.now();
        if self.read_delay == 0.0 {
            self.unread_check();
        }
    }

    fn set_focus_class(&mut self, target: Target, on: bool) {
        let message = match target {
            Target::Message(key) | Target::Element(key, _) => key,
        };
        if !self.edit_mode {
            self.surface
                .set_class(Target::Message(message), Class::Focused, on);
        }
        if let Target::Element(..) = target {
            self.surface.set_class(target, Class::Focused, on);
        }
    }

    /// Show or hide a message. Returns whether it was shown before.
    pub fn toggle_hidden(&mut self, key: MessageKey, mode: ToggleMode) -> bool {
        let Some(state) = self.states.get_mut(&key) else {
            log::error!("tv: toggle of unknown message {:?}", key);
            return false;
        };
        let was_shown = !state.hidden;
        state.set_current(0);

        let hide = match mode {
            ToggleMode::Toggle => !state.hidden,
            ToggleMode::ShowOnly => false,
            ToggleMode::HideOnly => true,
        };
        state.hidden = hide;
        self.surface
            .set_class(Target::Message(key), Class::Hidden, hide);

        if self.focused == Some(key) {
            self.update_focus_status();
        } else if self.read_delay == 0.0 {
            self.unread_check();
        }
        was_shown
    }

    /// Show all messages when every one is hidden, otherwise hide all.
    pub fn toggle_expand_all(&mut self) {
        let all_hidden = self.keys().all(|k| self.is_hidden(k));
        let mode = if all_hidden {
            ToggleMode::ShowOnly
        } else {
            ToggleMode::HideOnly
        };
        for key in self.keys().collect::<Vec<_>>() {
            self.toggle_hidden(key, mode);
        }
    }

    /// Switch reply indentation.
    pub fn toggle_flat(&mut self) {
        self.indent = !self.indent;
        self.surface.set_indent(self.indent);
    }
}

