//! Flattening of a MIME chunk tree into the body tree handed to a surface.

use serde::Serialize;

use super::crypto_status::{self, EncryptionStatus, SignatureStatus};
use crate::mail::types::{Chunk, ChunkId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderNode {
    Part(Part),
    /// Transparent wrapper left behind by a non-viewable container.
    Group { items: Vec<RenderNode> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Part {
    pub chunk_id: ChunkId,
    pub mime_type: String,
    pub preferred: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionStatus>,
    pub content: String,
    pub children: Vec<RenderNode>,
}

impl Part {
    fn empty(chunk_id: ChunkId) -> Self {
        Part {
            chunk_id,
            mime_type: "text/plain".to_string(),
            preferred: true,
            signature: None,
            encryption: None,
            content: String::new(),
            children: Vec::new(),
        }
    }
}

impl RenderNode {
    /// Parts in document order, descending into groups and part children.
    pub fn parts(&self) -> Vec<&Part> {
        let mut out = Vec::new();
        self.collect_parts(&mut out);
        out
    }

    fn collect_parts<'a>(&'a self, out: &mut Vec<&'a Part>) {
        match self {
            RenderNode::Part(part) => {
                out.push(part);
                for child in &part.children {
                    child.collect_parts(out);
                }
            }
            RenderNode::Group { items } => {
                for item in items {
                    item.collect_parts(out);
                }
            }
        }
    }

    /// Non-preferred parts whose ancestors are all shown. Their own
    /// children stay out of the list until they are displayed.
    pub fn collapsed_parts(&self) -> Vec<&Part> {
        let mut out = Vec::new();
        self.collect_collapsed(&mut out);
        out
    }

    fn collect_collapsed<'a>(&'a self, out: &mut Vec<&'a Part>) {
        match self {
            RenderNode::Part(part) if !part.preferred => out.push(part),
            RenderNode::Part(part) => {
                for child in &part.children {
                    child.collect_collapsed(out);
                }
            }
            RenderNode::Group { items } => {
                for item in items {
                    item.collect_collapsed(out);
                }
            }
        }
    }

    pub fn is_empty_group(&self) -> bool {
        matches!(self, RenderNode::Group { items } if items.is_empty())
    }
}

/// Produces the displayed text of a viewable leaf.
pub trait ContentRenderer {
    fn render(&self, chunk: &Chunk) -> String;
}

impl<F> ContentRenderer for F
where
    F: Fn(&Chunk) -> String,
{
    fn render(&self, chunk: &Chunk) -> String {
        self(chunk)
    }
}

/// Uses the decoded text as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl ContentRenderer for PlainText {
    fn render(&self, chunk: &Chunk) -> String {
        chunk.text.clone().unwrap_or_default()
    }
}

/// Build the body tree of the message rooted at `chunk`.
pub fn build_body(chunk: &Chunk, renderer: &dyn ContentRenderer) -> RenderNode {
    build(chunk, true, renderer).unwrap_or(RenderNode::Group { items: Vec::new() })
}

/// Returns `None` for attachments below the root, which never enter the body.
pub fn build(chunk: &Chunk, is_root: bool, renderer: &dyn ContentRenderer) -> Option<RenderNode> {
    if chunk.attachment {
        return is_root.then(|| RenderNode::Part(Part::empty(chunk.id)));
    }

    let children: Vec<RenderNode> = chunk
        .children
        .iter()
        .filter_map(|c| build(c, false, renderer))
        .filter(|n| !n.is_empty_group())
        .collect();

    if chunk.viewable {
        Some(RenderNode::Part(Part {
            chunk_id: chunk.id,
            mime_type: chunk.mime_type().to_string(),
            preferred: chunk.preferred,
            signature: chunk.signed.then(|| crypto_status::signature(chunk)),
            encryption: chunk.encrypted.then(|| crypto_status::encryption(chunk)),
            content: renderer.render(chunk),
            children,
        }))
    } else {
        Some(RenderNode::Group { items: children })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(id: ChunkId, body: &str) -> Chunk {
        Chunk {
            id,
            content_type: Some("text/plain".into()),
            viewable: true,
            preferred: true,
            text: Some(body.into()),
            ..Default::default()
        }
    }

    fn container(id: ChunkId, mime: &str, children: Vec<Chunk>) -> Chunk {
        Chunk {
            id,
            content_type: Some(mime.into()),
            children,
            ..Default::default()
        }
    }

    fn attachment(id: ChunkId, body: &str) -> Chunk {
        Chunk {
            id,
            content_type: Some("text/plain".into()),
            viewable: true,
            attachment: true,
            text: Some(body.into()),
            ..Default::default()
        }
    }

    fn contents(node: &RenderNode) -> Vec<String> {
        node.parts().iter().map(|p| p.content.clone()).collect()
    }

    #[test]
    fn test_attachment_root_gives_empty_part() {
        let root = attachment(0, "secret");
        let node = build_body(&root, &PlainText);
        let RenderNode::Part(part) = node else {
            panic!("expected a part");
        };
        assert_eq!(part.mime_type, "text/plain");
        assert!(part.preferred);
        assert!(part.content.is_empty());
        assert!(part.children.is_empty());
    }

    #[test]
    fn test_attachment_child_is_omitted() {
        assert!(build(&attachment(3, "x"), false, &PlainText).is_none());
    }

    #[test]
    fn test_group_splices_viewable_leaves_in_order() {
        let root = container(
            0,
            "multipart/mixed",
            vec![
                text(1, "one"),
                attachment(2, "never shown"),
                container(3, "multipart/related", vec![text(4, "two"), text(5, "three")]),
            ],
        );
        let node = build_body(&root, &PlainText);
        assert!(matches!(node, RenderNode::Group { .. }));
        assert_eq!(contents(&node), vec!["one", "two", "three"]);
        assert!(!contents(&node).iter().any(|c| c == "never shown"));
    }

    #[test]
    fn test_empty_groups_are_dropped() {
        let root = container(
            0,
            "multipart/mixed",
            vec![
                container(1, "multipart/related", vec![attachment(2, "a")]),
                text(3, "body"),
            ],
        );
        let RenderNode::Group { items } = build_body(&root, &PlainText) else {
            panic!("expected a group");
        };
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], RenderNode::Part(p) if p.chunk_id == 3));
    }

    #[test]
    fn test_part_carries_crypto_and_fallback_type() {
        let mut chunk = text(0, "signed body");
        chunk.content_type = None;
        chunk.signed = true;
        chunk.children = vec![text(1, "inner")];
        let RenderNode::Part(part) = build_body(&chunk, &PlainText) else {
            panic!("expected a part");
        };
        assert_eq!(part.mime_type, "application/octet-stream");
        assert!(part.signature.is_some());
        assert!(part.encryption.is_none());
        assert_eq!(part.children.len(), 1);
    }

    #[test]
    fn test_collapsed_parts_stop_at_first_alternative() {
        let mut html = text(3, "<p>hi</p>");
        html.content_type = Some("text/html".into());
        html.preferred = false;
        let mut nested = text(4, "nested");
        nested.preferred = false;
        html.children = vec![nested];
        let root = container(
            0,
            "multipart/alternative",
            vec![text(1, "hi"), html],
        );
        let node = build_body(&root, &PlainText);
        let ids: Vec<_> = node.collapsed_parts().iter().map(|p| p.chunk_id).collect();
        assert_eq!(ids, vec![3]);
        assert_eq!(node.parts().len(), 3);
    }

    #[test]
    fn test_closure_renderer() {
        let upper = |c: &Chunk| c.text.clone().unwrap_or_default().to_uppercase();
        let node = build_body(&text(0, "hi"), &upper);
        assert_eq!(contents(&node), vec!["HI"]);
    }
}
