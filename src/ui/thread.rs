//! Line-based terminal rendering of a thread.
//!
//! Every message is laid out into lines up front; a line is one unit of
//! scroll, so bounds and the viewport map directly onto rows.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use super::pane::Pane;
use crate::config::ThemeConfig;
use crate::mail::threading::tree_prefix;
use crate::mail::types::{Address, ChunkId, TAG_UNREAD};
use crate::render::crypto_status::SigStatus;
use crate::render::document::MessageDocument;
use crate::render::mime_tree::{Part, RenderNode};
use crate::thread::{Bounds, Class, MessageKey, Surface, Target, Viewport};

const MAX_INDENT: usize = 4;
const DEFAULT_WIDTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Header,
    Detail,
    Preview,
    Crypto,
    Body,
    Placeholder,
    Attachment,
    Blank,
}

#[derive(Debug, Clone)]
pub struct LaidLine {
    pub key: MessageKey,
    pub element: Option<ChunkId>,
    pub kind: LineKind,
    pub text: String,
}

struct Entry {
    doc: MessageDocument,
    hidden: bool,
    marked: bool,
    focused: bool,
    shown_parts: HashSet<ChunkId>,
}

/// A [`Surface`] drawn with ratatui.
pub struct TerminalSurface {
    entries: BTreeMap<MessageKey, Entry>,
    indent: bool,
    width: usize,
    height: Option<usize>,
    scroll: f64,
    focused_element: Option<(MessageKey, ChunkId)>,
    lines: Vec<LaidLine>,
    query: String,
    matches: Vec<usize>,
    current_match: Option<usize>,
    print_dir: PathBuf,
}

impl TerminalSurface {
    pub fn new(print_dir: PathBuf) -> Self {
        Self {
            entries: BTreeMap::new(),
            indent: true,
            width: DEFAULT_WIDTH,
            height: None,
            scroll: 0.0,
            focused_element: None,
            lines: Vec::new(),
            query: String::new(),
            matches: Vec::new(),
            current_match: None,
            print_dir,
        }
    }

    /// Set the text area size. Returns true when it changed.
    pub fn set_size(&mut self, width: u16, height: u16) -> bool {
        let width = usize::from(width).max(20);
        let height = usize::from(height).max(1);
        if self.width == width && self.height == Some(height) {
            return false;
        }
        self.width = width;
        self.height = Some(height);
        self.relayout();
        true
    }

    pub fn scroll_position(&self) -> f64 {
        self.scroll
    }

    pub fn lines(&self) -> &[LaidLine] {
        &self.lines
    }

    /// Text of a message as currently laid out.
    pub fn message_text(&self, key: MessageKey) -> String {
        let mut out = String::new();
        for line in self.lines.iter().filter(|l| l.key == key) {
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }

    fn relayout(&mut self) {
        let mut lines = Vec::new();
        for (&key, entry) in &self.entries {
            layout_message(key, entry, self.indent, self.width, &mut lines);
        }
        self.lines = lines;
        if !self.query.is_empty() {
            let query = self.query.clone();
            self.collect_matches(&query);
        }
        if let Some(vp) = self.viewport() {
            self.scroll = vp.clamp(self.scroll);
        }
    }

    fn collect_matches(&mut self, query: &str) -> usize {
        let needle = query.to_lowercase();
        let mut count = 0;
        self.matches.clear();
        for (i, line) in self.lines.iter().enumerate() {
            let n = line.text.to_lowercase().matches(needle.as_str()).count();
            if n > 0 {
                self.matches.push(i);
                count += n;
            }
        }
        if self.current_match.is_some_and(|m| m >= self.matches.len()) {
            self.current_match = None;
        }
        count
    }

    fn span_of(&self, pred: impl Fn(&LaidLine) -> bool) -> Option<Bounds> {
        let first = self.lines.iter().position(&pred)?;
        let last = self.lines.iter().rposition(&pred)?;
        Some(Bounds {
            top: first as f64,
            height: (last + 1 - first) as f64,
        })
    }
}

fn indent_of(doc: &MessageDocument, indent: bool) -> String {
    if indent {
        "  ".repeat(doc.level.min(MAX_INDENT))
    } else {
        String::new()
    }
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(10);
    let mut out = Vec::new();
    for line in text.lines() {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            out.push(String::new());
            continue;
        }
        for piece in chars.chunks(width) {
            out.push(piece.iter().collect());
        }
    }
    out
}

fn address_list(addrs: &[Address]) -> String {
    addrs
        .iter()
        .map(Address::full)
        .collect::<Vec<_>>()
        .join(", ")
}

fn layout_message(
    key: MessageKey,
    entry: &Entry,
    indent: bool,
    width: usize,
    out: &mut Vec<LaidLine>,
) {
    let doc = &entry.doc;
    let pad = indent_of(doc, indent);
    let inner = width.saturating_sub(pad.chars().count() + 2);
    let push = |out: &mut Vec<LaidLine>, kind: LineKind, element: Option<ChunkId>, text: String| {
        out.push(LaidLine {
            key,
            element,
            kind,
            text: format!("{}{}", pad, text),
        });
    };

    let from = doc
        .from
        .as_ref()
        .map(Address::display)
        .unwrap_or_else(|| "(unknown)".to_string());
    let prefix = if indent { tree_prefix(doc.level) } else { String::new() };
    let mut header = format!("{}{}  {}", prefix, from, doc.date.pretty);
    if !doc.tags.is_empty() {
        header.push_str(&format!("  [{}]", doc.tags.join(", ")));
    }
    if doc.patch {
        header.push_str("  (patch)");
    }
    out.push(LaidLine {
        key,
        element: None,
        kind: LineKind::Header,
        text: header,
    });

    if entry.hidden {
        let preview = html_escape::decode_html_entities(&doc.preview).replace('\n', " ");
        for line in wrap(&preview, inner).into_iter().take(2) {
            push(out, LineKind::Preview, None, line);
        }
        push(out, LineKind::Blank, None, String::new());
        return;
    }

    push(out, LineKind::Detail, None, format!("Subject: {}", doc.subject));
    if !doc.to.is_empty() {
        push(out, LineKind::Detail, None, format!("To: {}", address_list(&doc.to)));
    }
    if !doc.cc.is_empty() {
        push(out, LineKind::Detail, None, format!("Cc: {}", address_list(&doc.cc)));
    }
    if !doc.bcc.is_empty() {
        push(out, LineKind::Detail, None, format!("Bcc: {}", address_list(&doc.bcc)));
    }
    push(out, LineKind::Detail, None, format!("Date: {}", doc.date.verbose));
    push(out, LineKind::Blank, None, String::new());

    if doc.missing_content {
        push(out, LineKind::Crypto, None, "Message content is missing.".to_string());
    }

    let mut body = Vec::new();
    layout_node(&doc.body, &entry.shown_parts, inner, &mut body);
    for (kind, element, text) in body {
        push(out, kind, element, text);
    }

    for a in &doc.attachments {
        push(
            out,
            LineKind::Attachment,
            Some(a.chunk_id),
            format!("[attachment] {} ({}, {})", a.filename, a.mime_type, a.human_size),
        );
    }
    for m in &doc.mime_messages {
        push(
            out,
            LineKind::Attachment,
            Some(m.chunk_id),
            format!("[message] {} ({})", m.filename, m.human_size),
        );
    }
    push(out, LineKind::Blank, None, String::new());
}

type BodyLine = (LineKind, Option<ChunkId>, String);

fn layout_node(node: &RenderNode, shown: &HashSet<ChunkId>, width: usize, out: &mut Vec<BodyLine>) {
    match node {
        RenderNode::Group { items } => {
            for item in items {
                layout_node(item, shown, width, out);
            }
        }
        RenderNode::Part(part) if !part.preferred && !shown.contains(&part.chunk_id) => {
            out.push((
                LineKind::Placeholder,
                Some(part.chunk_id),
                format!("[{} part hidden, press Enter to show]", part.mime_type),
            ));
        }
        RenderNode::Part(part) => layout_part(part, shown, width, out),
    }
}

fn layout_part(part: &Part, shown: &HashSet<ChunkId>, width: usize, out: &mut Vec<BodyLine>) {
    let element = (!part.preferred).then_some(part.chunk_id);
    if let Some(sig) = &part.signature {
        let who: Vec<String> = sig
            .signatures
            .iter()
            .map(|s| {
                let name = s.name.as_deref().or(s.email.as_deref()).unwrap_or("unknown key");
                let errors: Vec<&str> = s.errors.iter().map(|e| e.as_str()).collect();
                if errors.is_empty() {
                    name.to_string()
                } else {
                    format!("{} ({})", name, errors.join(", "))
                }
            })
            .collect();
        let verdict = if !sig.verified {
            "Signature could not be verified"
        } else if sig.signatures.iter().all(|s| s.status == SigStatus::Good) {
            "Signature good"
        } else {
            "Signature bad"
        };
        out.push((LineKind::Crypto, element, format!("{}: {}", verdict, who.join("; "))));
    }
    if let Some(enc) = &part.encryption {
        let text = if enc.decrypted {
            let to: Vec<&str> = enc
                .recipients
                .iter()
                .filter_map(|r| r.email.as_deref().or(r.key_id.as_deref()))
                .collect();
            format!("Encrypted to: {}", to.join(", "))
        } else {
            "Encrypted, could not decrypt".to_string()
        };
        out.push((LineKind::Crypto, element, text));
    }
    for line in wrap(&part.content, width) {
        out.push((LineKind::Body, element, line));
    }
    for child in &part.children {
        layout_node(child, shown, width, out);
    }
}

impl Surface for TerminalSurface {
    fn add_message(&mut self, key: MessageKey, doc: &MessageDocument) {
        self.entries.insert(
            key,
            Entry {
                doc: doc.clone(),
                hidden: true,
                marked: false,
                focused: false,
                shown_parts: HashSet::new(),
            },
        );
        self.relayout();
    }

    fn bounds(&self, target: Target) -> Option<Bounds> {
        match target {
            Target::Message(key) => self.span_of(|l| l.key == key),
            Target::Element(key, chunk) => {
                self.span_of(|l| l.key == key && l.element == Some(chunk))
            }
        }
    }

    fn viewport(&self) -> Option<Viewport> {
        let height = self.height? as f64;
        Some(Viewport {
            value: self.scroll,
            page_size: height,
            lower: 0.0,
            upper: self.lines.len() as f64,
            step: 1.0,
            page_increment: (height - 1.0).max(1.0),
        })
    }

    fn set_scroll(&mut self, value: f64) {
        self.scroll = match self.viewport() {
            Some(vp) => vp.clamp(value),
            None => value.max(0.0),
        }
        .round();
    }

    fn set_class(&mut self, target: Target, class: Class, on: bool) {
        match target {
            Target::Message(key) => {
                let Some(entry) = self.entries.get_mut(&key) else {
                    return;
                };
                match class {
                    Class::Hidden => {
                        if entry.hidden != on {
                            entry.hidden = on;
                            self.relayout();
                        }
                    }
                    Class::Marked => entry.marked = on,
                    Class::Focused => entry.focused = on,
                }
            }
            Target::Element(key, chunk) => {
                if class == Class::Focused {
                    if on {
                        self.focused_element = Some((key, chunk));
                    } else if self.focused_element == Some((key, chunk)) {
                        self.focused_element = None;
                    }
                }
            }
        }
    }

    fn set_indent(&mut self, indent: bool) {
        if self.indent != indent {
            self.indent = indent;
            self.relayout();
        }
    }

    fn display_part(&mut self, key: MessageKey, chunk_id: ChunkId) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.shown_parts.insert(chunk_id);
            self.relayout();
        }
    }

    fn set_tags(&mut self, key: MessageKey, tags: &[String]) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.doc.tags = tags.to_vec();
            self.relayout();
        }
    }

    fn mark_matches(&mut self, query: &str) -> usize {
        self.current_match = None;
        if query.is_empty() {
            self.clear_matches();
            return 0;
        }
        self.query = query.to_string();
        let count = self.collect_matches(query);
        if count == 0 {
            self.query.clear();
        }
        count
    }

    fn clear_matches(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.current_match = None;
    }

    fn find_match(&mut self, query: &str, forward: bool) -> bool {
        if query != self.query && self.mark_matches(query) == 0 {
            return false;
        }
        if self.matches.is_empty() {
            return false;
        }
        let len = self.matches.len();
        let next = match self.current_match {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None if forward => self
                .matches
                .iter()
                .position(|&l| l as f64 >= self.scroll)
                .unwrap_or(0),
            None => self
                .matches
                .iter()
                .rposition(|&l| (l as f64) < self.scroll)
                .unwrap_or(len - 1),
        };
        self.current_match = Some(next);
        let line = self.matches[next] as f64;
        let half = self.height.map(|h| (h / 2) as f64).unwrap_or(0.0);
        self.set_scroll(line - half);
        true
    }

    fn print(&mut self, keys: &[MessageKey]) {
        let Some(first) = keys.first().and_then(|k| self.entries.get(k)) else {
            return;
        };
        let name: String = first
            .doc
            .subject
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let path = self.print_dir.join(format!("{}.txt", name));
        let text: String = keys.iter().map(|&k| self.message_text(k)).collect();
        let written = std::fs::create_dir_all(&self.print_dir)
            .and_then(|_| std::fs::write(&path, text));
        match written {
            Ok(()) => log::info!("printed {} message(s) to {}", keys.len(), path.display()),
            Err(e) => log::error!("could not print to {}: {}", path.display(), e),
        }
    }
}

/// Draw the thread into `area`.
pub fn render_thread(
    f: &mut Frame,
    area: Rect,
    surface: &TerminalSurface,
    title: &str,
    theme: &ThemeConfig,
) {
    let block = Pane::new(title, true, theme).block();
    let inner = block.inner(area);
    f.render_widget(block, area);

    let start = surface.scroll.max(0.0) as usize;
    let height = usize::from(inner.height);
    let current_match = surface.current_match.map(|i| surface.matches[i]);

    let lines: Vec<Line> = surface
        .lines
        .iter()
        .enumerate()
        .skip(start)
        .take(height)
        .map(|(i, laid)| {
            let Some(entry) = surface.entries.get(&laid.key) else {
                return Line::raw(laid.text.clone());
            };
            let mut style = match laid.kind {
                LineKind::Header if entry.doc.tags.iter().any(|t| t == TAG_UNREAD) => Style::default()
                    .fg(theme.unread())
                    .add_modifier(Modifier::BOLD),
                LineKind::Header => Style::default().fg(theme.fg()).add_modifier(Modifier::BOLD),
                LineKind::Detail | LineKind::Preview => Style::default().fg(theme.fg_muted()),
                LineKind::Crypto => Style::default().fg(theme.warning()),
                LineKind::Placeholder => Style::default().fg(theme.fg_subtle()),
                LineKind::Attachment => Style::default().fg(theme.attachment()),
                LineKind::Body | LineKind::Blank => Style::default().fg(theme.fg()),
            };
            let element_focused = laid.element.is_some()
                && surface.focused_element == laid.element.map(|c| (laid.key, c));
            if element_focused || (laid.kind == LineKind::Header && entry.focused) {
                style = style.bg(theme.selected_bg());
            }

            let gutter = if entry.marked {
                Span::styled("▌", Style::default().fg(theme.marked()))
            } else if entry.focused {
                Span::styled("│", Style::default().fg(theme.border_active()))
            } else {
                Span::raw(" ")
            };

            let mut spans = vec![gutter];
            spans.extend(highlight(
                &laid.text,
                &surface.query,
                style,
                Style::default()
                    .bg(theme.search_match())
                    .add_modifier(if current_match == Some(i) {
                        Modifier::BOLD | Modifier::UNDERLINED
                    } else {
                        Modifier::empty()
                    }),
            ));
            Line::from(spans)
        })
        .collect();

    let paragraph = Paragraph::new(lines).style(Style::default().bg(theme.bg()));
    f.render_widget(paragraph, inner);
}

/// Split `text` into spans with every case-insensitive occurrence of `query` highlighted.
fn highlight(text: &str, query: &str, base: Style, hit: Style) -> Vec<Span<'static>> {
    if query.is_empty() {
        return vec![Span::styled(text.to_string(), base)];
    }
    let lower = text.to_lowercase();
    let needle = query.to_lowercase();
    // Lowercasing can change byte lengths; fall back to no highlight then.
    if lower.len() != text.len() {
        return vec![Span::styled(text.to_string(), base)];
    }
    let mut spans = Vec::new();
    let mut last = 0;
    for (pos, m) in lower.match_indices(needle.as_str()) {
        let end = pos + m.len();
        if pos < last || !text.is_char_boundary(pos) || !text.is_char_boundary(end) {
            continue;
        }
        if pos > last {
            spans.push(Span::styled(text[last..pos].to_string(), base));
        }
        spans.push(Span::styled(text[pos..end].to_string(), base.patch(hit)));
        last = end;
    }
    if last < text.len() {
        spans.push(Span::styled(text[last..].to_string(), base));
    }
    spans
}
