//! What the controller needs from whatever draws the thread.

use std::time::Instant;

use super::state::MessageKey;
use crate::mail::types::ChunkId;
use crate::render::document::MessageDocument;

/// Something on the surface with a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Message(MessageKey),
    Element(MessageKey, ChunkId),
}

/// Vertical extent in surface units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub top: f64,
    pub height: f64,
}

impl Bounds {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub value: f64,
    pub page_size: f64,
    pub lower: f64,
    pub upper: f64,
    pub step: f64,
    pub page_increment: f64,
}

impl Viewport {
    pub fn bottom(&self) -> f64 {
        self.value + self.page_size
    }

    /// Largest reachable scroll value.
    pub fn max_value(&self) -> f64 {
        (self.upper - self.page_size).max(self.lower)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.max_value())
    }

    pub fn contains_fully(&self, b: &Bounds) -> bool {
        b.top >= self.value && b.bottom() <= self.bottom()
    }

    pub fn overlaps(&self, b: &Bounds) -> bool {
        b.bottom() > self.value && b.top < self.bottom()
    }

    pub fn center(&self) -> f64 {
        self.value + self.page_size / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    Hidden,
    Marked,
    Focused,
}

/// Rendering surface driven by the controller.
///
/// Geometry queries must not call back into the controller.
pub trait Surface {
    fn add_message(&mut self, key: MessageKey, doc: &MessageDocument);

    /// `None` until the target has been laid out.
    fn bounds(&self, target: Target) -> Option<Bounds>;

    /// `None` until the surface has a size.
    fn viewport(&self) -> Option<Viewport>;

    fn set_scroll(&mut self, value: f64);

    fn set_class(&mut self, target: Target, class: Class, on: bool);

    fn set_indent(&mut self, indent: bool);

    /// Replace the placeholder of an inline part by its content.
    fn display_part(&mut self, key: MessageKey, chunk_id: ChunkId);

    fn set_tags(&mut self, key: MessageKey, tags: &[String]);

    /// Highlight every occurrence and return how many were found.
    fn mark_matches(&mut self, query: &str) -> usize;

    fn clear_matches(&mut self);

    /// Scroll to the next or previous highlighted match.
    fn find_match(&mut self, query: &str, forward: bool) -> bool;

    fn print(&mut self, keys: &[MessageKey]);
}

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp(value: f64) -> Viewport {
        Viewport {
            value,
            page_size: 10.0,
            lower: 0.0,
            upper: 50.0,
            step: 1.0,
            page_increment: 8.0,
        }
    }

    #[test]
    fn test_contains_and_overlaps() {
        let v = vp(10.0);
        let inside = Bounds { top: 12.0, height: 3.0 };
        let partial = Bounds { top: 18.0, height: 5.0 };
        let outside = Bounds { top: 30.0, height: 1.0 };
        assert!(v.contains_fully(&inside));
        assert!(!v.contains_fully(&partial));
        assert!(v.overlaps(&partial));
        assert!(!v.overlaps(&outside));
    }

    #[test]
    fn test_clamp_to_scroll_range() {
        let v = vp(0.0);
        assert_eq!(v.max_value(), 40.0);
        assert_eq!(v.clamp(100.0), 40.0);
        assert_eq!(v.clamp(-3.0), 0.0);
    }
}
