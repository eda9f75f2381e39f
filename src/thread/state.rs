use serde::Serialize;

use crate::mail::types::ChunkId;

/// Position of a message in the thread; stable for the lifetime of the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MessageKey(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementKind {
    /// The message itself, no sub-element selected.
    Empty,
    Attachment,
    /// Placeholder for an inline part that is not shown yet.
    Part,
    MimeMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Element {
    pub index: usize,
    pub kind: ElementKind,
    pub chunk_id: Option<ChunkId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageState {
    elements: Vec<Element>,
    current_element: usize,
    pub hidden: bool,
    pub marked: bool,
    pub unread_checked: bool,
    /// Expanded by an expanding traversal, collapsed again when left.
    pub scroll_expanded: bool,
    pub print_expanded: bool,
    pub search_expanded: bool,
}

impl Default for MessageState {
    fn default() -> Self {
        Self {
            elements: vec![Element {
                index: 0,
                kind: ElementKind::Empty,
                chunk_id: None,
            }],
            current_element: 0,
            hidden: true,
            marked: false,
            unread_checked: false,
            scroll_expanded: false,
            print_expanded: false,
            search_expanded: false,
        }
    }
}

impl MessageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&mut self, kind: ElementKind, chunk_id: ChunkId) -> Element {
        let element = Element {
            index: self.elements.len(),
            kind,
            chunk_id: Some(chunk_id),
        };
        self.elements.push(element);
        element
    }

    /// Drop a displayed placeholder. Later elements move up and the cursor returns to 0.
    pub fn remove_element(&mut self, index: usize) -> Option<Element> {
        if index == 0 || index >= self.elements.len() {
            return None;
        }
        let removed = self.elements.remove(index);
        for (i, e) in self.elements.iter_mut().enumerate().skip(index) {
            e.index = i;
        }
        self.current_element = 0;
        Some(removed)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn current_element(&self) -> usize {
        self.current_element
    }

    pub fn current(&self) -> &Element {
        &self.elements[self.current_element]
    }

    pub fn last_index(&self) -> usize {
        self.elements.len() - 1
    }

    /// Clamped to the valid range.
    pub fn set_current(&mut self, index: usize) {
        self.current_element = index.min(self.last_index());
    }

    pub fn find_chunk(&self, chunk_id: ChunkId) -> Option<&Element> {
        self.elements.iter().find(|e| e.chunk_id == Some(chunk_id))
    }
}
