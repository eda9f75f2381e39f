use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;

use threadview::config::Config;
use threadview::mail::client;
use threadview::mail::crypto::{Unverified, Verifier};
use threadview::mail::types::{Chunk, Message};
use threadview::render::mime_tree::ContentRenderer;
use threadview::thread::links;
use threadview::thread::{ActionTable, IndexAction, MessageKey, Notification, ThreadController};
use threadview::ui::{Mode, TerminalSurface};

pub type Controller = ThreadController<TerminalSurface>;

/// HTML goes through w3m, everything else is shown as decoded.
struct TerminalRenderer;

impl ContentRenderer for TerminalRenderer {
    fn render(&self, chunk: &Chunk) -> String {
        let text = chunk.text.clone().unwrap_or_default();
        if chunk.mime_type() != "text/html" {
            return text;
        }
        match client::render_html(&text) {
            Ok(rendered) if !rendered.trim().is_empty() => rendered,
            Ok(_) => text,
            Err(e) => {
                log::debug!("w3m unavailable: {}", e);
                text
            }
        }
    }
}

/// One open thread; embedded messages stack on top of their parent.
pub struct View {
    pub title: String,
    pub controller: Controller,
}

pub struct App {
    pub config: Config,
    pub views: Vec<View>,
    pub mode: Mode,
    pub input: String,
    pub status_message: Option<String>,
    pub yank_buffer: Option<String>,
    pub should_quit: bool,
    thread_actions: ActionTable<TerminalSurface>,
    multi_actions: ActionTable<TerminalSurface>,
    next_thread_actions: ActionTable<TerminalSurface>,
    tag_targets: Vec<MessageKey>,
    verifier: Box<dyn Verifier>,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            views: Vec::new(),
            mode: Mode::Normal,
            input: String::new(),
            status_message: None,
            yank_buffer: None,
            should_quit: false,
            thread_actions: ActionTable::thread_view(),
            multi_actions: ActionTable::multi(),
            next_thread_actions: ActionTable::next_thread(),
            tag_targets: Vec::new(),
            verifier: Box::new(Unverified),
        }
    }

    /// Open a thread view over `messages`.
    pub fn open(&mut self, title: String, messages: Vec<Message>) -> Result<()> {
        let surface = TerminalSurface::new(self.config.thread_view.save_dir());
        let mut controller = ThreadController::new(surface, self.config.thread_view.clone())?;
        controller.set_renderer(Box::new(TerminalRenderer));
        controller.load(messages);
        self.views.push(View { title, controller });
        self.drain_notifications();
        Ok(())
    }

    pub fn view(&self) -> Option<&View> {
        self.views.last()
    }

    pub fn controller(&mut self) -> Option<&mut Controller> {
        self.views.last_mut().map(|v| &mut v.controller)
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some(msg.to_string());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Give the thread its text area; layout-dependent work resumes once known.
    pub fn resize(&mut self, width: u16, height: u16) {
        if let Some(c) = self.controller() {
            if c.surface_mut().set_size(width, height) {
                c.on_viewport_changed();
            }
        }
        self.drain_notifications();
    }

    /// Run the read timer.
    pub fn tick(&mut self) {
        if let Some(c) = self.controller() {
            c.tick();
        }
        self.drain_notifications();
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match self.mode {
            Mode::Search | Mode::Tags => self.handle_input_key(key),
            Mode::Multi => {
                self.mode = Mode::Normal;
                if let Some(name) = multi_action(key) {
                    self.dispatch(Mode::Multi, name);
                }
            }
            Mode::NextThread => {
                self.mode = Mode::Normal;
                if let Some(name) = next_thread_action(key) {
                    self.dispatch(Mode::NextThread, name);
                }
            }
            Mode::Normal => match key.code {
                KeyCode::Char('/') => {
                    self.mode = Mode::Search;
                    self.input.clear();
                }
                KeyCode::Char(';') => self.mode = Mode::Multi,
                KeyCode::Char(':') => self.mode = Mode::NextThread,
                _ => {
                    let searching = self.view().is_some_and(|v| v.controller.search_active());
                    if let Some(name) = thread_action(key, searching) {
                        self.dispatch(Mode::Normal, name);
                    }
                }
            },
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.input.clear();
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Enter => {
                let input = std::mem::take(&mut self.input);
                let mode = std::mem::replace(&mut self.mode, Mode::Normal);
                if mode == Mode::Search {
                    self.search(&input);
                } else {
                    self.apply_tag_input(&input);
                }
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn search(&mut self, query: &str) {
        let Some(c) = self.controller() else {
            return;
        };
        let before = c.surface().scroll_position();
        let found = if query.is_empty() {
            c.reset_search();
            false
        } else {
            c.search_or_next(Some(query))
        };
        if c.surface().scroll_position() != before {
            c.on_viewport_changed();
        }
        if !query.is_empty() && !found {
            self.set_status("No matches");
        }
        self.drain_notifications();
    }

    /// `+tag` adds, `-tag` removes; bare words add.
    fn apply_tag_input(&mut self, input: &str) {
        let mut add = Vec::new();
        let mut remove = Vec::new();
        for word in input.split_whitespace() {
            match word.strip_prefix('-') {
                Some(tag) if !tag.is_empty() => remove.push(tag),
                _ => {
                    let tag = word.trim_start_matches('+');
                    if !tag.is_empty() {
                        add.push(tag);
                    }
                }
            }
        }
        let keys = std::mem::take(&mut self.tag_targets);
        if let Some(c) = self.controller() {
            c.apply_tags(&keys, &add, &remove);
        }
        self.drain_notifications();
    }

    fn dispatch(&mut self, mode: Mode, name: &str) {
        let Some(view) = self.views.last_mut() else {
            return;
        };
        let table = match mode {
            Mode::Multi => &self.multi_actions,
            Mode::NextThread => &self.next_thread_actions,
            _ => &self.thread_actions,
        };
        let c = &mut view.controller;
        let before = c.surface().scroll_position();
        if !table.dispatch(name, c) {
            log::debug!("action {} did not apply", name);
        }
        if c.surface().scroll_position() != before {
            c.on_viewport_changed();
        }
        self.drain_notifications();
    }

    fn drain_notifications(&mut self) {
        loop {
            let Some(c) = self.controller() else {
                return;
            };
            let pending = c.take_notifications();
            if pending.is_empty() {
                return;
            }
            for n in pending {
                if let Err(e) = self.handle_notification(n) {
                    log::error!("{:#}", e);
                    self.set_status(&format!("Error: {}", e));
                }
            }
        }
    }

    fn handle_notification(&mut self, n: Notification) -> Result<()> {
        let save_dir = self.config.thread_view.save_dir();
        let open_program = self.config.thread_view.open_external_link.clone();
        let Some(c) = self.controller() else {
            return Ok(());
        };

        match n {
            Notification::Ready => {
                let count = c.messages().len();
                self.set_status(&format!("{} message(s)", count));
            }
            Notification::ElementAction {
                key,
                element,
                action,
            } => {
                log::debug!("element action {:?} on {:?}:{}", action, key, element);
            }
            Notification::IndexAction(IndexAction::Close) => {
                self.views.pop();
                if self.views.is_empty() {
                    self.should_quit = true;
                }
            }
            Notification::IndexAction(action) => {
                self.set_status(&format!("No thread list for {:?}", action));
            }
            Notification::TagsChanged {
                key,
                added,
                removed,
            } => {
                let path = c.message(key).and_then(|m| m.file_path.clone());
                if let Some(path) = path {
                    if let Some(new_path) = client::persist_tags(&path, &added, &removed)? {
                        c.relocate(key, new_path);
                    }
                }
            }
            Notification::EditTags(keys) => {
                if !keys.is_empty() {
                    self.tag_targets = keys;
                    self.input.clear();
                    self.mode = Mode::Tags;
                }
            }
            Notification::SaveMessages(keys) => {
                let saved: Vec<PathBuf> = keys
                    .iter()
                    .filter_map(|&k| c.message(k))
                    .map(|m| client::save_message(m, &save_dir))
                    .collect::<Result<_>>()?;
                self.set_status(&format!("Saved {} message(s)", saved.len()));
            }
            Notification::SaveChunk { key, chunk_id } => {
                let chunk = c.message(key).and_then(|m| m.chunk(chunk_id));
                if let Some(chunk) = chunk {
                    let path = client::save_chunk(chunk, &save_dir)?;
                    self.set_status(&format!("Saved {}", path.display()));
                }
            }
            Notification::SaveAttachments(keys) => {
                let mut count = 0;
                for msg in keys.iter().filter_map(|&k| c.message(k)) {
                    count += client::save_attachments(msg, &save_dir)?.len();
                }
                self.set_status(&format!("Saved {} attachment(s)", count));
            }
            Notification::OpenChunk { key, chunk_id } => {
                let chunk = c.message(key).and_then(|m| m.chunk(chunk_id));
                if let Some(chunk) = chunk {
                    let path = client::write_temp(chunk)?;
                    links::open_external(&open_program, &path.to_string_lossy());
                }
            }
            Notification::OpenEmbedded { key, chunk_id } => {
                let raw = c
                    .message(key)
                    .and_then(|m| m.chunk(chunk_id))
                    .map(|chunk| chunk.raw.clone());
                if let Some(raw) = raw {
                    let message = client::parse_message(&raw, self.verifier.as_ref())?;
                    let title = message.subject.clone();
                    self.open(title, vec![message])?;
                }
            }
            Notification::OpenMessageId(mid) => {
                let key = c
                    .keys()
                    .find(|&k| c.message(k).is_some_and(|m| m.mid == mid));
                match key {
                    Some(key) => {
                        c.focus_message(key);
                        c.scroll_to_message(key, false);
                    }
                    None => self.set_status(&format!("{} is not in this thread", mid)),
                }
            }
            Notification::Compose { to } => {
                let uri = format!("mailto:{}", urlencoding::encode(&to));
                links::open_external(&open_program, &uri);
            }
            Notification::Yank(text) => {
                if links::copy_to_clipboard(&text) {
                    self.set_status(&format!("Copied {} bytes to clipboard", text.len()));
                } else {
                    self.keep_yank(text);
                }
            }
        }
        Ok(())
    }

    /// Without a clipboard, yanks pile up and are printed on exit.
    fn keep_yank(&mut self, text: String) {
        let len = text.len();
        match &mut self.yank_buffer {
            Some(buffer) => {
                if !buffer.ends_with('\n') {
                    buffer.push('\n');
                }
                buffer.push_str(&text);
            }
            None => self.yank_buffer = Some(text),
        }
        self.set_status(&format!(
            "No clipboard: {} bytes kept, printed on exit",
            len
        ));
    }
}

fn ctrl(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
}

fn thread_action(key: KeyEvent, searching: bool) -> Option<&'static str> {
    let name = match key.code {
        KeyCode::Char('n') if searching => "search_next",
        KeyCode::Char('P') if searching => "search_previous",
        KeyCode::Esc if searching => "search_cancel",
        KeyCode::Char('j') if ctrl(&key) => "next_element_force",
        KeyCode::Char('k') if ctrl(&key) => "previous_element_force",
        KeyCode::Char('n') if ctrl(&key) => "next_message",
        KeyCode::Char('p') if ctrl(&key) => "previous_message",
        KeyCode::Char('y') if ctrl(&key) => "yank_mid",
        KeyCode::Char('P') => "print",
        KeyCode::Char('j') | KeyCode::Down => "next_element",
        KeyCode::Char('k') | KeyCode::Up => "previous_element",
        KeyCode::Char('J') => "scroll_down",
        KeyCode::Char('K') => "scroll_up",
        KeyCode::Char(' ') | KeyCode::PageDown => "page_down",
        KeyCode::Backspace | KeyCode::PageUp => "page_up",
        KeyCode::Char('1') | KeyCode::Home => "home",
        KeyCode::Char('0') | KeyCode::End => "end",
        KeyCode::Enter => "activate",
        KeyCode::Char('s') => "save",
        KeyCode::Char('d') => "delete_attachment",
        KeyCode::Char('e') => "expand",
        KeyCode::Char('E') => "toggle_expand_all",
        KeyCode::Char('t') => "mark",
        KeyCode::Char('T') => "toggle_mark_all",
        KeyCode::Char('S') => "save_all_attachments",
        KeyCode::Char('n') => "next_message_expand",
        KeyCode::Char('p') => "previous_message_expand",
        KeyCode::Tab => "next_unread",
        KeyCode::BackTab => "previous_unread",
        KeyCode::Char('N') => "toggle_unread",
        KeyCode::Char('*') => "flag",
        KeyCode::Char('a') => "archive",
        KeyCode::Char('+') => "tag",
        KeyCode::Char('f') => "toggle_flat",
        KeyCode::Char('y') => "yank",
        KeyCode::Char('Y') => "yank_raw",
        KeyCode::Char('x') => "archive_then_next",
        KeyCode::Char('X') => "archive_then_next_unread",
        KeyCode::Char('q') | KeyCode::Esc => "close",
        _ => return None,
    };
    Some(name)
}

fn multi_action(key: KeyEvent) -> Option<&'static str> {
    let name = match key.code {
        KeyCode::Char('y') if ctrl(&key) => "yank_mids",
        KeyCode::Char('t') => "unmark_all",
        KeyCode::Char('+') => "tag",
        KeyCode::Char('y') => "yank",
        KeyCode::Char('Y') => "yank_raw",
        KeyCode::Char('s') => "save",
        KeyCode::Char('p') => "print",
        _ => return None,
    };
    Some(name)
}

fn next_thread_action(key: KeyEvent) -> Option<&'static str> {
    let name = match key.code {
        KeyCode::Char('a') => "archive_next",
        KeyCode::Char('A') => "archive_next_unread",
        KeyCode::Char('x') => "archive_close",
        KeyCode::Char('j') => "next",
        KeyCode::Char('k') => "previous",
        KeyCode::Char('J') => "next_unread",
        KeyCode::Char('K') => "previous_unread",
        _ => return None,
    };
    Some(name)
}
