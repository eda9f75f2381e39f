use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::crypto::Verification;

/// Identifier of a MIME chunk, unique within one message.
pub type ChunkId = u32;

pub const TAG_UNREAD: &str = "unread";
pub const TAG_FLAGGED: &str = "flagged";
pub const TAG_INBOX: &str = "inbox";
pub const TAG_REPLIED: &str = "replied";
pub const TAG_DRAFT: &str = "draft";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Address {
    pub name: Option<String>,
    pub addr: String,
}

impl Address {
    pub fn new(name: Option<&str>, addr: &str) -> Self {
        Self {
            name: name.map(str::to_string).filter(|n| !n.is_empty()),
            addr: addr.to_string(),
        }
    }

    pub fn display(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.addr.clone())
    }

    /// `Name <addr>` when a display name is known.
    pub fn full(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.addr),
            None => self.addr.clone(),
        }
    }
}

/// A node of a decoded MIME structure.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub id: ChunkId,
    pub content_type: Option<String>,
    pub filename: Option<String>,
    /// Has a text representation that can be shown inline.
    pub viewable: bool,
    pub attachment: bool,
    /// Chosen alternative among siblings of a multipart/alternative.
    pub preferred: bool,
    pub signed: bool,
    pub encrypted: bool,
    /// Embedded message/rfc822.
    pub mime_message: bool,
    /// Decoded text for viewable chunks.
    pub text: Option<String>,
    /// Undecoded contents as found in the message.
    pub raw: Vec<u8>,
    pub children: Vec<Chunk>,
    pub crypto: Option<Verification>,
}

impl Chunk {
    pub fn mime_type(&self) -> &str {
        self.content_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }

    pub fn size(&self) -> usize {
        self.raw.len()
    }

    pub fn find(&self, id: ChunkId) -> Option<&Chunk> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Pre-order walk over this chunk and all descendants.
    pub fn walk(&self) -> Vec<&Chunk> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }

    /// Attachments that are not embedded messages, in document order.
    pub fn attachments(&self) -> Vec<&Chunk> {
        self.walk()
            .into_iter()
            .filter(|c| c.attachment && !c.mime_message)
            .collect()
    }

    pub fn mime_messages(&self) -> Vec<&Chunk> {
        self.walk().into_iter().filter(|c| c.mime_message).collect()
    }

    /// Display text of a viewable chunk and its viewable descendants.
    pub fn viewable_text(&self) -> String {
        let mut out = String::new();
        if self.viewable && self.preferred {
            if let Some(text) = &self.text {
                out.push_str(text);
            }
        }
        for child in &self.children {
            if child.attachment {
                continue;
            }
            let text = child.viewable_text();
            if !text.is_empty() {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&text);
            }
        }
        out
    }

    /// Raw contents with CRLF line endings folded to LF.
    pub fn raw_unix(&self) -> String {
        unixify(&self.raw)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Message {
    pub mid: String,
    pub subject: String,
    pub from: Option<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    /// Seconds since the epoch.
    pub timestamp: i64,
    pub in_reply_to: Option<String>,
    pub references: Vec<String>,
    pub tags: BTreeSet<String>,
    pub root: Chunk,
    pub raw: Vec<u8>,
    pub file_path: Option<PathBuf>,
    /// Depth in the reply tree.
    pub level: usize,
    /// Backing content could not be read.
    pub missing_content: bool,
    /// Message belongs to the store and can carry tags.
    pub in_store: bool,
}

impl Message {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_patch(&self) -> bool {
        let subject = self.subject.to_lowercase();
        if subject.contains("[patch") {
            return true;
        }
        self.root.walk().iter().any(|c| {
            matches!(
                c.mime_type(),
                "text/x-diff" | "text/x-patch" | "text/x-diff-patch"
            )
        })
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.root.find(id)
    }

    pub fn viewable_text(&self) -> String {
        self.root.viewable_text()
    }

    pub fn raw_unix(&self) -> String {
        unixify(&self.raw)
    }

    pub fn from_display(&self) -> String {
        match &self.from {
            Some(addr) => addr.display(),
            None => "(unknown)".to_string(),
        }
    }
}

fn unixify(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: ChunkId, mime: &str) -> Chunk {
        Chunk {
            id,
            content_type: Some(mime.to_string()),
            viewable: mime.starts_with("text/"),
            preferred: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_mime_type_fallback() {
        let chunk = Chunk::default();
        assert_eq!(chunk.mime_type(), "application/octet-stream");
    }

    #[test]
    fn test_attachments_skip_embedded_messages() {
        let mut root = leaf(0, "multipart/mixed");
        root.viewable = false;
        let mut pdf = leaf(1, "application/pdf");
        pdf.attachment = true;
        let mut rfc = leaf(2, "message/rfc822");
        rfc.attachment = true;
        rfc.mime_message = true;
        root.children = vec![leaf(3, "text/plain"), pdf, rfc];

        let ids: Vec<_> = root.attachments().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1]);
        let ids: Vec<_> = root.mime_messages().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(root.find(3).map(|c| c.id), Some(3));
        assert!(root.find(9).is_none());
    }

    #[test]
    fn test_viewable_text_skips_alternatives_and_attachments() {
        let mut root = leaf(0, "multipart/alternative");
        root.viewable = false;
        let mut plain = leaf(1, "text/plain");
        plain.text = Some("hello".into());
        let mut html = leaf(2, "text/html");
        html.text = Some("<p>hello</p>".into());
        html.preferred = false;
        let mut att = leaf(3, "text/plain");
        att.attachment = true;
        att.text = Some("attached".into());
        root.children = vec![plain, html, att];

        assert_eq!(root.viewable_text(), "hello");
    }

    #[test]
    fn test_address_display() {
        let a = Address::new(Some("Ann"), "ann@example.org");
        assert_eq!(a.display(), "Ann");
        assert_eq!(a.full(), "Ann <ann@example.org>");
        let b = Address::new(Some(""), "bob@example.org");
        assert_eq!(b.full(), "bob@example.org");
    }

    #[test]
    fn test_patch_detection() {
        let msg = Message {
            subject: "[PATCH 1/2] fix things".into(),
            ..Default::default()
        };
        assert!(msg.is_patch());
        let msg = Message {
            subject: "re: lunch".into(),
            ..Default::default()
        };
        assert!(!msg.is_patch());
    }
}
