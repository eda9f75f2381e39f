//! Thread view scenarios against a scripted surface and a manual clock.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use std::time::{Duration, Instant};

use threadview::config::ThreadViewConfig;
use threadview::mail::types::{Chunk, ChunkId, Message, TAG_FLAGGED, TAG_INBOX, TAG_UNREAD};
use threadview::render::document::MessageDocument;
use threadview::thread::*;

#[derive(Clone)]
struct ManualClock(Rc<Cell<Instant>>);

impl ManualClock {
    fn new() -> Self {
        Self(Rc::new(Cell::new(Instant::now())))
    }

    fn advance(&self, secs: f64) {
        self.0.set(self.0.get() + Duration::from_secs_f64(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.0.get()
    }
}

/// Each message is a header line plus, when shown, four body lines and
/// one line per element.
#[derive(Default)]
struct ScriptedSurface {
    order: Vec<MessageKey>,
    elements: HashMap<MessageKey, Vec<ChunkId>>,
    hidden: HashSet<MessageKey>,
    classes: HashSet<(Target, Class)>,
    page_size: Option<f64>,
    scroll: f64,
    indent_calls: Vec<bool>,
    displayed: Vec<(MessageKey, ChunkId)>,
    tags: HashMap<MessageKey, Vec<String>>,
    match_count: usize,
    printed: Rc<RefCell<Vec<Vec<MessageKey>>>>,
    hidden_while_printing: Rc<RefCell<Vec<bool>>>,
}

impl ScriptedSurface {
    fn sized(page_size: f64) -> Self {
        Self {
            page_size: Some(page_size),
            ..Default::default()
        }
    }

    fn height(&self, key: MessageKey) -> f64 {
        if self.hidden.contains(&key) {
            1.0
        } else {
            5.0 + self.elements.get(&key).map_or(0, Vec::len) as f64
        }
    }

    fn top(&self, key: MessageKey) -> f64 {
        self.order
            .iter()
            .take_while(|&&k| k != key)
            .map(|&k| self.height(k))
            .sum()
    }

    fn total(&self) -> f64 {
        self.order.iter().map(|&k| self.height(k)).sum()
    }

    fn has(&self, target: Target, class: Class) -> bool {
        self.classes.contains(&(target, class))
    }
}

impl Surface for ScriptedSurface {
    fn add_message(&mut self, key: MessageKey, doc: &MessageDocument) {
        self.order.push(key);
        let mut ids: Vec<ChunkId> = doc.attachments.iter().map(|a| a.chunk_id).collect();
        ids.extend(doc.mime_messages.iter().map(|m| m.chunk_id));
        ids.extend(doc.inline_parts.iter().map(|p| p.chunk_id));
        self.elements.insert(key, ids);
    }

    fn bounds(&self, target: Target) -> Option<Bounds> {
        match target {
            Target::Message(key) => Some(Bounds {
                top: self.top(key),
                height: self.height(key),
            }),
            Target::Element(key, chunk) => {
                if self.hidden.contains(&key) {
                    return None;
                }
                let i = self.elements.get(&key)?.iter().position(|&c| c == chunk)?;
                Some(Bounds {
                    top: self.top(key) + 5.0 + i as f64,
                    height: 1.0,
                })
            }
        }
    }

    fn viewport(&self) -> Option<Viewport> {
        let page_size = self.page_size?;
        Some(Viewport {
            value: self.scroll,
            page_size,
            lower: 0.0,
            upper: self.total(),
            step: 1.0,
            page_increment: page_size - 1.0,
        })
    }

    fn set_scroll(&mut self, value: f64) {
        self.scroll = value;
    }

    fn set_class(&mut self, target: Target, class: Class, on: bool) {
        if class == Class::Hidden {
            if let Target::Message(key) = target {
                if on {
                    self.hidden.insert(key);
                } else {
                    self.hidden.remove(&key);
                }
            }
        }
        if on {
            self.classes.insert((target, class));
        } else {
            self.classes.remove(&(target, class));
        }
    }

    fn set_indent(&mut self, indent: bool) {
        self.indent_calls.push(indent);
    }

    fn display_part(&mut self, key: MessageKey, chunk_id: ChunkId) {
        self.displayed.push((key, chunk_id));
    }

    fn set_tags(&mut self, key: MessageKey, tags: &[String]) {
        self.tags.insert(key, tags.to_vec());
    }

    fn mark_matches(&mut self, _query: &str) -> usize {
        self.match_count
    }

    fn clear_matches(&mut self) {}

    fn find_match(&mut self, _query: &str, _forward: bool) -> bool {
        self.match_count > 0
    }

    fn print(&mut self, keys: &[MessageKey]) {
        self.printed.borrow_mut().push(keys.to_vec());
        let hidden = keys.iter().any(|k| self.hidden.contains(k));
        self.hidden_while_printing.borrow_mut().push(hidden);
    }
}

fn text(id: ChunkId, body: &str) -> Chunk {
    Chunk {
        id,
        content_type: Some("text/plain".into()),
        viewable: true,
        preferred: true,
        text: Some(body.into()),
        raw: body.as_bytes().to_vec(),
        ..Default::default()
    }
}

fn message(n: usize, tags: &[&str]) -> Message {
    Message {
        mid: format!("m{}@test", n),
        subject: format!("message {}", n),
        timestamp: 1_000 + n as i64,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        root: text(0, &format!("body {}", n)),
        raw: format!("Subject: message {}\r\n\r\nbody {}\r\n", n, n).into_bytes(),
        in_store: true,
        ..Default::default()
    }
}

/// A message with an attachment, an embedded message and an HTML alternative.
fn rich_message(n: usize) -> Message {
    let mut msg = message(n, &[]);
    let html = Chunk {
        id: 3,
        content_type: Some("text/html".into()),
        viewable: true,
        preferred: false,
        text: Some("<p>body</p>".into()),
        ..Default::default()
    };
    let alternative = Chunk {
        id: 1,
        content_type: Some("multipart/alternative".into()),
        preferred: true,
        children: vec![text(2, "body"), html],
        ..Default::default()
    };
    let pdf = Chunk {
        id: 4,
        content_type: Some("application/pdf".into()),
        filename: Some("a.pdf".into()),
        attachment: true,
        preferred: true,
        raw: b"%PDF".to_vec(),
        ..Default::default()
    };
    let embedded = Chunk {
        id: 5,
        content_type: Some("message/rfc822".into()),
        attachment: true,
        mime_message: true,
        preferred: true,
        raw: b"Subject: inner\r\n\r\nhi\r\n".to_vec(),
        ..Default::default()
    };
    msg.root = Chunk {
        id: 0,
        content_type: Some("multipart/mixed".into()),
        preferred: true,
        children: vec![alternative, pdf, embedded],
        ..Default::default()
    };
    msg
}

fn controller(
    surface: ScriptedSurface,
    config: ThreadViewConfig,
) -> (ThreadController<ScriptedSurface>, ManualClock) {
    let clock = ManualClock::new();
    let c = ThreadController::with_clock(surface, config, Box::new(clock.clone())).unwrap();
    (c, clock)
}

fn loaded(messages: Vec<Message>) -> (ThreadController<ScriptedSurface>, ManualClock) {
    let (mut c, clock) = controller(ScriptedSurface::sized(100.0), ThreadViewConfig::default());
    c.load(messages);
    (c, clock)
}

fn tag_changes(notifications: &[Notification]) -> usize {
    notifications
        .iter()
        .filter(|n| matches!(n, Notification::TagsChanged { .. }))
        .count()
}

#[test]
fn test_load_focuses_first_unread() {
    let (mut c, _) = loaded(vec![
        message(0, &[]),
        message(1, &[TAG_UNREAD]),
        message(2, &[TAG_UNREAD]),
    ]);
    assert!(c.is_ready());
    assert_eq!(c.focused(), Some(MessageKey(1)));
    assert!(c.is_hidden(MessageKey(0)));
    assert!(!c.is_hidden(MessageKey(1)));
    assert!(!c.is_hidden(MessageKey(2)));
    assert_eq!(c.take_notifications(), vec![Notification::Ready]);
    assert!(c.surface().has(Target::Message(MessageKey(1)), Class::Focused));
}

#[test]
fn test_load_without_unread_shows_newest() {
    let mut newest = message(0, &[TAG_FLAGGED]);
    newest.timestamp = 9_999;
    let (c, _) = loaded(vec![newest, message(1, &[]), message(2, &[])]);
    assert_eq!(c.focused(), Some(MessageKey(0)));
    assert!(!c.is_hidden(MessageKey(0)));
    assert!(c.is_hidden(MessageKey(1)));
}

#[test]
fn test_flagged_stays_collapsed_when_not_configured() {
    let config = ThreadViewConfig {
        expand_flagged: false,
        ..Default::default()
    };
    let (mut c, _) = controller(ScriptedSurface::sized(100.0), config);
    c.load(vec![message(0, &[TAG_FLAGGED]), message(1, &[TAG_UNREAD])]);
    assert!(c.is_hidden(MessageKey(0)));
    assert_eq!(c.focused(), Some(MessageKey(1)));
}

#[test]
fn test_read_after_delay_only_once() {
    let (mut c, clock) = loaded(vec![message(0, &[TAG_UNREAD])]);
    c.take_notifications();
    assert!(c.next_tick_in().is_some());

    clock.advance(0.3);
    assert!(c.tick());
    assert!(c.message(MessageKey(0)).unwrap().has_tag(TAG_UNREAD));

    clock.advance(0.3);
    assert!(c.tick());
    assert!(!c.message(MessageKey(0)).unwrap().has_tag(TAG_UNREAD));

    clock.advance(1.0);
    c.tick();
    let notifications = c.take_notifications();
    assert_eq!(tag_changes(&notifications), 1);
    assert!(matches!(
        &notifications[0],
        Notification::TagsChanged { removed, .. } if removed.contains(TAG_UNREAD)
    ));
    assert_eq!(
        c.surface().tags.get(&MessageKey(0)),
        Some(&Vec::<String>::new())
    );
}

#[test]
fn test_refocus_restarts_read_delay() {
    let (mut c, clock) = loaded(vec![message(0, &[TAG_UNREAD]), message(1, &[TAG_UNREAD])]);
    clock.advance(0.4);
    c.tick();
    c.next_message();
    clock.advance(0.3);
    c.tick();
    assert!(c.message(MessageKey(0)).unwrap().has_tag(TAG_UNREAD));
    assert!(c.message(MessageKey(1)).unwrap().has_tag(TAG_UNREAD));
    clock.advance(0.3);
    c.tick();
    assert!(!c.message(MessageKey(1)).unwrap().has_tag(TAG_UNREAD));
    assert!(c.message(MessageKey(0)).unwrap().has_tag(TAG_UNREAD));
}

#[test]
fn test_zero_delay_marks_read_immediately() {
    let config = ThreadViewConfig {
        mark_unread_delay: 0.0,
        ..Default::default()
    };
    let (mut c, _) = controller(ScriptedSurface::sized(100.0), config);
    c.load(vec![message(0, &[]), message(1, &[TAG_UNREAD]), message(2, &[TAG_UNREAD])]);
    assert!(!c.message(MessageKey(1)).unwrap().has_tag(TAG_UNREAD));
    assert!(c.message(MessageKey(2)).unwrap().has_tag(TAG_UNREAD));
    assert!(c.next_tick_in().is_none());

    c.focus_next();
    assert!(!c.message(MessageKey(2)).unwrap().has_tag(TAG_UNREAD));
}

#[test]
fn test_hidden_and_edit_mode_are_never_marked_read() {
    let (mut c, clock) = loaded(vec![message(0, &[TAG_UNREAD])]);
    c.toggle_hidden(MessageKey(0), ToggleMode::HideOnly);
    clock.advance(2.0);
    c.tick();
    assert!(c.message(MessageKey(0)).unwrap().has_tag(TAG_UNREAD));

    c.toggle_hidden(MessageKey(0), ToggleMode::ShowOnly);
    c.set_edit_mode(true);
    clock.advance(2.0);
    c.tick();
    assert!(c.message(MessageKey(0)).unwrap().has_tag(TAG_UNREAD));
}

#[test]
fn test_messages_outside_store_keep_tags() {
    let mut msg = message(0, &[TAG_UNREAD]);
    msg.in_store = false;
    let (mut c, clock) = loaded(vec![msg]);
    clock.advance(2.0);
    c.tick();
    assert!(c.message(MessageKey(0)).unwrap().has_tag(TAG_UNREAD));
}

#[test]
fn test_timer_stops_after_unload() {
    let (mut c, clock) = loaded(vec![message(0, &[TAG_UNREAD])]);
    c.unload();
    clock.advance(1.0);
    assert!(!c.tick());
    assert!(c.next_tick_in().is_none());
}

#[test]
fn test_toggle_hidden_twice_restores() {
    let (mut c, _) = loaded(vec![message(0, &[]), message(1, &[])]);
    let key = MessageKey(0);
    let before = c.is_hidden(key);
    let first = c.toggle_hidden(key, ToggleMode::Toggle);
    let second = c.toggle_hidden(key, ToggleMode::Toggle);
    assert_eq!(c.is_hidden(key), before);
    assert_eq!(first, !before);
    assert_eq!(second, before);
    assert_eq!(c.surface().hidden.contains(&key), before);
}

#[test]
fn test_toggle_expand_all() {
    let (mut c, _) = loaded(vec![message(0, &[]), message(1, &[])]);
    c.toggle_expand_all();
    assert!(c.keys().all(|k| c.is_hidden(k)));
    c.toggle_expand_all();
    assert!(c.keys().all(|k| !c.is_hidden(k)));
}

#[test]
fn test_toggle_mark_all_union_then_flip() {
    let (mut c, _) = loaded(vec![message(0, &[]), message(1, &[]), message(2, &[])]);
    c.focus_message(MessageKey(1));
    c.toggle_mark();
    assert_eq!(c.marked(), vec![MessageKey(1)]);

    c.toggle_mark_all();
    assert_eq!(c.marked().len(), 3);
    c.toggle_mark_all();
    assert!(c.marked().is_empty());
    c.toggle_mark_all();
    assert_eq!(c.marked().len(), 3);
    assert!(c.surface().has(Target::Message(MessageKey(0)), Class::Marked));

    c.unmark_all();
    assert!(c.marked().is_empty());
}

#[test]
fn test_element_cursor_walks_elements_then_next_message() {
    let (mut c, _) = loaded(vec![rich_message(0), message(1, &[])]);
    c.focus_message(MessageKey(0));
    c.toggle_hidden(MessageKey(0), ToggleMode::ShowOnly);

    let kinds: Vec<ElementKind> = c
        .state(MessageKey(0))
        .unwrap()
        .elements()
        .iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            ElementKind::Empty,
            ElementKind::Attachment,
            ElementKind::MimeMessage,
            ElementKind::Part
        ]
    );

    for expected in 1..=3 {
        c.focus_next_element(true);
        assert_eq!(c.state(MessageKey(0)).unwrap().current_element(), expected);
    }
    assert!(c.surface().has(Target::Element(MessageKey(0), 3), Class::Focused));

    c.focus_next_element(true);
    assert_eq!(c.focused(), Some(MessageKey(1)));
    assert!(!c.surface().has(Target::Element(MessageKey(0), 3), Class::Focused));

    c.focus_previous_element(true);
    assert_eq!(c.focused(), Some(MessageKey(0)));
    assert_eq!(c.state(MessageKey(0)).unwrap().current_element(), 3);
}

#[test]
fn test_element_walk_follows_viewport() {
    let (mut c, _) = controller(ScriptedSurface::sized(6.0), ThreadViewConfig::default());
    c.load(vec![rich_message(0), message(1, &[])]);
    c.focus_message(MessageKey(0));
    c.toggle_hidden(MessageKey(0), ToggleMode::ShowOnly);
    c.home();
    assert_eq!(c.surface().scroll, 0.0);

    // Attachment line sits on the last visible row.
    assert_eq!(
        c.focus_next_element(false),
        Some(Target::Element(MessageKey(0), 4))
    );

    // Embedded message is below the view: scroll one step instead.
    assert_eq!(c.focus_next_element(false), None);
    assert_eq!(c.surface().scroll, 1.0);
    assert_eq!(c.focused(), Some(MessageKey(0)));
    assert_eq!(c.state(MessageKey(0)).unwrap().current_element(), 1);

    assert_eq!(
        c.focus_next_element(false),
        Some(Target::Element(MessageKey(0), 5))
    );

    let mut calls = 0;
    while c.focused() == Some(MessageKey(0)) {
        c.focus_next_element(false);
        calls += 1;
        assert!(calls < 20);
    }
    assert_eq!(c.surface().scroll, 7.0);
    assert_eq!(c.focused(), Some(MessageKey(1)));
    assert_eq!(c.state(MessageKey(0)).unwrap().current_element(), 3);
}

#[test]
fn test_previous_element_scrolls_until_visible() {
    let (mut c, _) = controller(ScriptedSurface::sized(6.0), ThreadViewConfig::default());
    c.load(vec![rich_message(0), message(1, &[])]);
    c.focus_message(MessageKey(0));
    c.toggle_hidden(MessageKey(0), ToggleMode::ShowOnly);
    for _ in 0..3 {
        c.focus_next_element(true);
    }
    c.end();
    c.focus_message(MessageKey(0));
    assert_eq!(c.surface().scroll, 7.0);
    assert_eq!(c.state(MessageKey(0)).unwrap().current_element(), 3);

    assert_eq!(c.focus_previous_element(false), None);
    assert_eq!(c.surface().scroll, 6.0);
    assert_eq!(c.focused(), Some(MessageKey(0)));
    assert_eq!(c.state(MessageKey(0)).unwrap().current_element(), 3);

    assert_eq!(
        c.focus_previous_element(false),
        Some(Target::Element(MessageKey(0), 5))
    );
    assert_eq!(c.focus_previous_element(false), None);
    assert_eq!(c.surface().scroll, 5.0);
    assert_eq!(
        c.focus_previous_element(false),
        Some(Target::Element(MessageKey(0), 4))
    );
    // The message itself is always reachable.
    assert_eq!(
        c.focus_previous_element(false),
        Some(Target::Message(MessageKey(0)))
    );
    assert_eq!(c.state(MessageKey(0)).unwrap().current_element(), 0);
}

#[test]
fn test_focus_next_keeps_collapsed_messages_collapsed() {
    let config = ThreadViewConfig {
        mark_unread_delay: 0.0,
        ..Default::default()
    };
    let (mut c, _) = controller(ScriptedSurface::sized(100.0), config);
    c.load(vec![message(0, &[]), message(1, &[TAG_UNREAD]), message(2, &[TAG_UNREAD])]);
    c.apply_tags(&[MessageKey(1)], &[TAG_UNREAD], &[]);
    c.toggle_hidden(MessageKey(1), ToggleMode::HideOnly);
    assert_eq!(c.focused(), Some(MessageKey(1)));
    assert!(c.is_hidden(MessageKey(0)));
    assert!(!c.is_hidden(MessageKey(2)));
    assert!(c.message(MessageKey(2)).unwrap().has_tag(TAG_UNREAD));
    c.take_notifications();

    c.focus_next();
    assert_eq!(c.focused(), Some(MessageKey(2)));
    assert!(c.is_hidden(MessageKey(0)));
    assert!(c.is_hidden(MessageKey(1)));
    assert!(c.message(MessageKey(1)).unwrap().has_tag(TAG_UNREAD));
    assert!(!c.message(MessageKey(2)).unwrap().has_tag(TAG_UNREAD));
    assert_eq!(tag_changes(&c.take_notifications()), 1);

    assert!(c.unread_check());
    assert_eq!(tag_changes(&c.take_notifications()), 0);
    assert!(!c.message(MessageKey(2)).unwrap().has_tag(TAG_UNREAD));
}

#[test]
fn test_toggle_hidden_resets_cursor_both_ways() {
    let (mut c, _) = loaded(vec![rich_message(0)]);
    let key = MessageKey(0);
    assert!(!c.is_hidden(key));
    c.focus_next_element(true);
    c.focus_next_element(true);
    assert_eq!(c.state(key).unwrap().current_element(), 2);

    c.toggle_hidden(key, ToggleMode::Toggle);
    assert!(c.is_hidden(key));
    assert_eq!(c.state(key).unwrap().current_element(), 0);

    c.set_edit_mode(true);
    c.focus_next_element(true);
    c.set_edit_mode(false);
    assert_eq!(c.state(key).unwrap().current_element(), 1);

    c.toggle_hidden(key, ToggleMode::Toggle);
    assert!(!c.is_hidden(key));
    assert_eq!(c.state(key).unwrap().current_element(), 0);
}

#[test]
fn test_cursor_stays_in_range() {
    let (mut c, _) = loaded(vec![rich_message(0)]);
    c.toggle_hidden(MessageKey(0), ToggleMode::ShowOnly);
    for _ in 0..10 {
        c.focus_next_element(true);
        let state = c.state(MessageKey(0)).unwrap();
        assert!(state.current_element() <= state.last_index());
    }
    for _ in 0..10 {
        c.focus_previous_element(true);
    }
    assert_eq!(c.state(MessageKey(0)).unwrap().current_element(), 0);
    assert_eq!(c.focused(), Some(MessageKey(0)));
}

#[test]
fn test_element_actions_notify_host() {
    let (mut c, _) = loaded(vec![rich_message(0)]);
    c.take_notifications();

    c.element_action(ElementAction::Save);
    assert_eq!(
        c.take_notifications(),
        vec![Notification::SaveMessages(vec![MessageKey(0)])]
    );

    c.focus_next_element(true);
    c.element_action(ElementAction::Enter);
    assert_eq!(
        c.take_notifications(),
        vec![
            Notification::OpenChunk {
                key: MessageKey(0),
                chunk_id: 4
            },
            Notification::ElementAction {
                key: MessageKey(0),
                element: 1,
                action: ElementAction::Enter
            },
        ]
    );

    c.focus_next_element(true);
    c.element_action(ElementAction::Enter);
    assert!(c.take_notifications().contains(&Notification::OpenEmbedded {
        key: MessageKey(0),
        chunk_id: 5
    }));

    c.element_action(ElementAction::YankRaw);
    assert!(
        c.take_notifications()
            .contains(&Notification::Yank("Subject: inner\n\nhi\n".into()))
    );
}

#[test]
fn test_enter_on_inline_part_displays_it() {
    let (mut c, _) = loaded(vec![rich_message(0)]);
    c.toggle_hidden(MessageKey(0), ToggleMode::ShowOnly);
    for _ in 0..3 {
        c.focus_next_element(true);
    }
    c.element_action(ElementAction::Enter);

    assert_eq!(c.surface().displayed, vec![(MessageKey(0), 3)]);
    let state = c.state(MessageKey(0)).unwrap();
    assert_eq!(state.last_index(), 2);
    assert_eq!(state.current_element(), 0);
    assert!(state.find_chunk(3).is_none());
}

#[test]
fn test_inline_part_opens_externally_when_configured() {
    let config = ThreadViewConfig {
        open_html_part_external: true,
        ..Default::default()
    };
    let (mut c, _) = controller(ScriptedSurface::sized(100.0), config);
    c.load(vec![rich_message(0)]);
    c.take_notifications();
    for _ in 0..3 {
        c.focus_next_element(true);
    }
    c.element_action(ElementAction::Enter);
    assert!(c.surface().displayed.is_empty());
    assert!(c.take_notifications().contains(&Notification::OpenChunk {
        key: MessageKey(0),
        chunk_id: 3
    }));
}

#[test]
fn test_search_without_matches_restores_hidden() {
    let (mut c, _) = loaded(vec![message(0, &[]), message(1, &[TAG_UNREAD]), message(2, &[])]);
    let before: Vec<bool> = c.keys().map(|k| c.is_hidden(k)).collect();
    assert_eq!(c.search("nothing"), 0);
    assert!(!c.search_active());
    let after: Vec<bool> = c.keys().map(|k| c.is_hidden(k)).collect();
    assert_eq!(before, after);
}

#[test]
fn test_search_expands_until_reset() {
    let mut surface = ScriptedSurface::sized(100.0);
    surface.match_count = 2;
    let (mut c, _) = controller(surface, ThreadViewConfig::default());
    c.load(vec![message(0, &[]), message(1, &[TAG_UNREAD]), message(2, &[])]);

    assert_eq!(c.search("body"), 2);
    assert!(c.search_active());
    assert_eq!(c.search_query(), "body");
    assert!(c.keys().all(|k| !c.is_hidden(k)));

    c.focus_message(MessageKey(2));
    c.reset_search();
    assert!(!c.search_active());
    assert!(c.is_hidden(MessageKey(0)));
    assert!(!c.is_hidden(MessageKey(1)));
    assert!(!c.is_hidden(MessageKey(2)));
}

#[test]
fn test_print_expands_and_restores() {
    let surface = ScriptedSurface::sized(100.0);
    let printed = surface.printed.clone();
    let hidden_while_printing = surface.hidden_while_printing.clone();
    let (mut c, _) = controller(surface, ThreadViewConfig::default());
    c.load(vec![message(0, &[]), message(1, &[TAG_UNREAD])]);

    c.focus_message(MessageKey(0));
    c.toggle_mark_all();
    c.multi_print();

    assert_eq!(*printed.borrow(), vec![vec![MessageKey(0), MessageKey(1)]]);
    assert_eq!(*hidden_while_printing.borrow(), vec![false]);
    assert_eq!(c.surface().indent_calls, vec![true, false, true]);
    assert!(c.is_hidden(MessageKey(0)));
    assert!(!c.is_hidden(MessageKey(1)));
}

#[test]
fn test_toggle_unread_stops_auto_read() {
    let (mut c, clock) = loaded(vec![message(0, &[TAG_UNREAD])]);
    c.toggle_unread();
    c.toggle_unread();
    clock.advance(2.0);
    c.tick();
    assert!(c.message(MessageKey(0)).unwrap().has_tag(TAG_UNREAD));
}

#[test]
fn test_archive_toggles_whole_thread() {
    let (mut c, _) = loaded(vec![message(0, &[TAG_INBOX]), message(1, &[])]);
    c.take_notifications();
    c.toggle_archive();
    assert!(c.keys().all(|k| !c.message(k).unwrap().has_tag(TAG_INBOX)));
    assert_eq!(tag_changes(&c.take_notifications()), 1);
    c.toggle_archive();
    assert!(c.keys().all(|k| c.message(k).unwrap().has_tag(TAG_INBOX)));
}

#[test]
fn test_multi_yank_formats() {
    let (mut c, _) = loaded(vec![message(0, &[]), message(1, &[])]);
    c.toggle_mark_all();
    c.take_notifications();

    c.multi_yank_mids();
    c.multi_yank();
    let yanks = c.take_notifications();
    assert_eq!(
        yanks,
        vec![
            Notification::Yank("m0@test, m1@test".into()),
            Notification::Yank("body 0\nbody 1".into()),
        ]
    );

    c.multi_yank_raw();
    let Some(Notification::Yank(mbox)) = c.take_notifications().pop() else {
        panic!("expected a yank");
    };
    assert_eq!(mbox.matches("\nFrom ").count() + 1, 2);
    assert!(mbox.starts_with("From "));
}

#[test]
fn test_scroll_waits_for_layout() {
    let (mut c, clock) = controller(ScriptedSurface::default(), ThreadViewConfig::default());
    c.load(vec![message(0, &[TAG_UNREAD])]);
    assert_eq!(c.focused(), Some(MessageKey(0)));
    assert!(c.next_tick_in().is_none());

    c.surface_mut().page_size = Some(50.0);
    c.on_viewport_changed();
    assert!(c.next_tick_in().is_some());
    clock.advance(1.0);
    c.tick();
    assert!(!c.message(MessageKey(0)).unwrap().has_tag(TAG_UNREAD));
}

#[test]
fn test_next_and_previous_unread() {
    let (mut c, _) = loaded(vec![
        message(0, &[TAG_UNREAD]),
        message(1, &[]),
        message(2, &[TAG_UNREAD]),
    ]);
    assert_eq!(c.focused(), Some(MessageKey(0)));
    assert!(c.next_unread());
    assert_eq!(c.focused(), Some(MessageKey(2)));
    assert!(!c.next_unread());
    assert!(c.previous_unread());
    assert_eq!(c.focused(), Some(MessageKey(0)));
}

#[test]
fn test_expanding_traversal_collapses_behind() {
    let (mut c, _) = loaded(vec![message(0, &[TAG_UNREAD]), message(1, &[]), message(2, &[])]);
    c.focus_next_expand();
    assert_eq!(c.focused(), Some(MessageKey(1)));
    assert!(!c.is_hidden(MessageKey(1)));
    c.focus_next_expand();
    assert!(c.is_hidden(MessageKey(1)));
    assert!(!c.is_hidden(MessageKey(2)));
    assert!(!c.is_hidden(MessageKey(0)));
}

#[test]
fn test_links_reach_host() {
    let (mut c, _) = loaded(vec![message(0, &[])]);
    c.take_notifications();
    c.open_link("mailto:ann%40example.org");
    c.open_link("id:<m0@test>");
    c.open_link("gopher://nowhere");
    assert_eq!(
        c.take_notifications(),
        vec![
            Notification::Compose {
                to: "ann@example.org".into()
            },
            Notification::OpenMessageId("m0@test".into()),
        ]
    );
}

#[test]
fn test_tags_changed_elsewhere_reach_surface() {
    let (mut c, _) = loaded(vec![message(0, &[])]);
    let tags: BTreeSet<String> = ["todo".to_string()].into();
    c.on_tags_changed("m0@test", tags.clone());
    assert_eq!(c.message(MessageKey(0)).unwrap().tags, tags);
    assert_eq!(
        c.surface().tags.get(&MessageKey(0)),
        Some(&vec!["todo".to_string()])
    );
}

#[test]
fn test_action_table_drives_controller() {
    let (mut c, _) = loaded(vec![message(0, &[]), message(1, &[])]);
    let table = ActionTable::thread_view();
    c.focus_message(MessageKey(0));
    assert!(table.dispatch("mark", &mut c));
    assert!(table.dispatch("next_message", &mut c));
    assert_eq!(c.focused(), Some(MessageKey(1)));
    assert!(ActionTable::multi().dispatch("unmark_all", &mut c));
    assert!(c.marked().is_empty());
}
