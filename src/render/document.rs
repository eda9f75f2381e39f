//! The declaration of one message handed to a rendering surface.

use anyhow::{Result, bail};
use base64::Engine;
use chrono::{DateTime, Datelike, Local};
use serde::Serialize;

use super::mime_tree::{self, ContentRenderer, RenderNode};
use crate::mail::types::{Address, Chunk, ChunkId, Message};

/// Maximum length of the collapsed-message preview, ellipsis included.
pub const MAX_PREVIEW_LEN: usize = 150;

/// Images larger than this are listed without an inline thumbnail.
const THUMBNAIL_MAX_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct DateInfo {
    pub pretty: String,
    pub verbose: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentEntry {
    pub chunk_id: ChunkId,
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
    pub human_size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlinePartEntry {
    pub chunk_id: ChunkId,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageDocument {
    pub mid: String,
    pub from: Option<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    pub date: DateInfo,
    pub subject: String,
    pub tags: Vec<String>,
    pub in_reply_to: Option<String>,
    pub level: usize,
    pub patch: bool,
    pub missing_content: bool,
    pub preview: String,
    pub body: RenderNode,
    pub attachments: Vec<AttachmentEntry>,
    pub mime_messages: Vec<AttachmentEntry>,
    /// Alternatives that are not shown until asked for.
    pub inline_parts: Vec<InlinePartEntry>,
}

impl MessageDocument {
    pub fn build(message: &Message, renderer: &dyn ContentRenderer) -> Self {
        let body = mime_tree::build_body(&message.root, renderer);
        let inline_parts = body
            .collapsed_parts()
            .into_iter()
            .map(|p| InlinePartEntry {
                chunk_id: p.chunk_id,
                mime_type: p.mime_type.clone(),
            })
            .collect();

        Self {
            mid: message.mid.clone(),
            from: message.from.clone(),
            to: message.to.clone(),
            cc: message.cc.clone(),
            bcc: message.bcc.clone(),
            date: date_info(message.timestamp),
            subject: message.subject.clone(),
            tags: message.tags.iter().cloned().collect(),
            in_reply_to: message.in_reply_to.clone(),
            level: message.level,
            patch: message.is_patch(),
            missing_content: message.missing_content,
            preview: preview(&message.viewable_text()),
            body,
            attachments: message
                .root
                .attachments()
                .into_iter()
                .map(attachment_entry)
                .collect(),
            mime_messages: message
                .root
                .mime_messages()
                .into_iter()
                .map(attachment_entry)
                .collect(),
            inline_parts,
        }
    }
}

fn attachment_entry(chunk: &Chunk) -> AttachmentEntry {
    let mime_type = chunk.mime_type().to_string();
    let thumbnail = (mime_type.starts_with("image/") && chunk.size() <= THUMBNAIL_MAX_BYTES)
        .then(|| {
            format!(
                "data:{};base64,{}",
                mime_type,
                base64::engine::general_purpose::STANDARD.encode(&chunk.raw)
            )
        });
    AttachmentEntry {
        chunk_id: chunk.id,
        filename: chunk
            .filename
            .clone()
            .unwrap_or_else(|| format!("part-{}", chunk.id)),
        mime_type,
        size: chunk.size(),
        human_size: format_size(chunk.size()),
        thumbnail,
    }
}

/// Single-paragraph preview: truncated, `<br>` stripped, then escaped.
pub fn preview(text: &str) -> String {
    let mut bp: String = if text.chars().count() > MAX_PREVIEW_LEN {
        let mut cut: String = text.chars().take(MAX_PREVIEW_LEN - 3).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    };
    bp = bp.replace("<br>", "");
    html_escape::encode_safe(&bp).into_owned()
}

pub fn format_size(size: usize) -> String {
    if size < 1024 {
        format!("{} B", size)
    } else if size < 1024 * 1024 {
        format!("{:.1} KB", size as f64 / 1024.0)
    } else {
        format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
    }
}

pub fn date_info(timestamp: i64) -> DateInfo {
    let Some(utc) = DateTime::from_timestamp(timestamp, 0) else {
        return DateInfo {
            pretty: String::new(),
            verbose: String::new(),
            timestamp,
        };
    };
    let local = utc.with_timezone(&Local);
    let now = Local::now();
    let pretty = if local.date_naive() == now.date_naive() {
        local.format("%H:%M").to_string()
    } else if local.year() == now.year() {
        local.format("%b %d").to_string()
    } else {
        local.format("%Y-%m-%d").to_string()
    };
    DateInfo {
        pretty,
        verbose: local.format("%a, %d %b %Y %H:%M:%S %z").to_string(),
        timestamp,
    }
}

/// Replaces pairs of a code delimiter with start and stop markup.
#[derive(Debug, Clone)]
pub struct CodeTags {
    code: String,
    start: String,
    stop: String,
}

impl CodeTags {
    pub fn new(code: &str, start: &str, stop: &str) -> Result<Self> {
        if code.is_empty() {
            bail!("cannot have a code tag with length 0");
        }
        Ok(Self {
            code: code.to_string(),
            start: start.to_string(),
            stop: stop.to_string(),
        })
    }

    /// An unpaired trailing delimiter is left as is.
    pub fn filter(&self, body: &str) -> String {
        let mut out = String::with_capacity(body.len());
        let mut rest = body;
        while let Some(first) = rest.find(&self.code) {
            let after = &rest[first + self.code.len()..];
            let Some(second) = after.find(&self.code) else {
                break;
            };
            out.push_str(&rest[..first]);
            out.push_str(&self.start);
            out.push_str(&after[..second]);
            out.push_str(&self.stop);
            rest = &after[second + self.code.len()..];
        }
        out.push_str(rest);
        out
    }
}

/// Renders text/plain through the code filter and everything else through `inner`.
pub struct CodeFilter<'a> {
    pub tags: &'a CodeTags,
    pub inner: &'a dyn ContentRenderer,
}

impl ContentRenderer for CodeFilter<'_> {
    fn render(&self, chunk: &Chunk) -> String {
        let text = self.inner.render(chunk);
        if chunk.mime_type() == "text/plain" {
            self.tags.filter(&text)
        } else {
            text
        }
    }
}
