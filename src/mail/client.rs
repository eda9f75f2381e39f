use anyhow::Result;
use mail_parser::{HeaderValue, MessageParser, MimeHeaders, PartType};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::crypto::Verifier;
use super::threading::order_thread;
use super::types::{
    Address, Chunk, ChunkId, Message, TAG_DRAFT, TAG_FLAGGED, TAG_INBOX, TAG_REPLIED, TAG_UNREAD,
};

/// Render HTML to text with w3m.
pub fn render_html(html: &str) -> Result<String> {
    use std::io::Write;
    use std::process::Stdio;

    let mut child = Command::new("w3m")
        .args(["-dump", "-T", "text/html", "-cols", "100"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(html.as_bytes())?;
    }

    let output = child.wait_with_output()?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Modify maildir flags in a filename
/// Maildir format: {unique}:2,{flags} where flags are sorted letters (DFPRST)
fn modify_maildir_flags(path: &Path, add: &[char], remove: &[char]) -> Result<PathBuf> {
    let filename = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid path: {}", path.display()))?;

    // Parse flags from filename (after ":2,")
    let (base, flags) = if let Some(pos) = filename.rfind(":2,") {
        (filename[..pos + 3].to_string(), filename[pos + 3..].to_string())
    } else {
        (format!("{}:2,", filename), String::new())
    };

    let mut flag_chars: Vec<char> = flags.chars().filter(|c| !remove.contains(c)).collect();
    for &c in add {
        if !flag_chars.contains(&c) {
            flag_chars.push(c);
        }
    }
    flag_chars.sort(); // Maildir requires sorted flags

    let new_flags: String = flag_chars.into_iter().collect();
    let new_path = path.with_file_name(format!("{}{}", base, new_flags));
    if new_path != path {
        std::fs::rename(path, &new_path)?;
    }

    Ok(new_path)
}

/// Tags implied by maildir flags and location.
fn tags_from_path(path: &Path) -> BTreeSet<String> {
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let flags = filename.rfind(":2,").map(|pos| &filename[pos + 3..]).unwrap_or("");

    let mut tags = BTreeSet::new();
    if !flags.contains('S') {
        tags.insert(TAG_UNREAD.to_string());
    }
    for c in flags.chars() {
        match c {
            'F' => tags.insert(TAG_FLAGGED.to_string()),
            'R' => tags.insert(TAG_REPLIED.to_string()),
            'D' => tags.insert(TAG_DRAFT.to_string()),
            _ => false,
        };
    }

    let folder = path
        .parent()
        .and_then(|p| p.parent())
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str());
    if folder.is_some_and(|f| f.eq_ignore_ascii_case("inbox")) {
        tags.insert(TAG_INBOX.to_string());
    }
    tags
}

/// Maildir flag for a tag; `true` when the flag means the tag is absent.
fn maildir_flag(tag: &str) -> Option<(char, bool)> {
    match tag {
        TAG_UNREAD => Some(('S', true)),
        TAG_FLAGGED => Some(('F', false)),
        TAG_REPLIED => Some(('R', false)),
        TAG_DRAFT => Some(('D', false)),
        _ => None,
    }
}

/// Write a tag change back as maildir flags. Returns the new path when renamed.
///
/// Tags without a maildir flag are not stored.
pub fn persist_tags(
    path: &Path,
    added: &BTreeSet<String>,
    removed: &BTreeSet<String>,
) -> Result<Option<PathBuf>> {
    let mut add = Vec::new();
    let mut remove = Vec::new();
    for (tags, adding) in [(added, true), (removed, false)] {
        for tag in tags {
            let Some((flag, inverted)) = maildir_flag(tag) else {
                log::debug!("tag {} has no maildir flag", tag);
                continue;
            };
            if adding != inverted {
                add.push(flag);
            } else {
                remove.push(flag);
            }
        }
    }
    if add.is_empty() && remove.is_empty() {
        return Ok(None);
    }
    let new_path = modify_maildir_flags(path, &add, &remove)?;
    Ok((new_path != path).then_some(new_path))
}

/// Builds the chunk tree of one parsed message.
struct ChunkBuilder<'a, 'x> {
    message: &'a mail_parser::Message<'x>,
    verifier: &'a dyn Verifier,
    next_id: ChunkId,
}

impl ChunkBuilder<'_, '_> {
    fn mime_type(&self, part_id: usize) -> Option<String> {
        let ct = self.message.parts.get(part_id)?.content_type()?;
        let mime = match ct.subtype() {
            Some(sub) => format!("{}/{}", ct.ctype(), sub),
            None => ct.ctype().to_string(),
        };
        Some(mime.to_lowercase())
    }

    /// Plain text wins among alternatives, else the last one.
    fn preferred_alternative(&self, children: &[usize]) -> Option<usize> {
        children
            .iter()
            .position(|&c| self.mime_type(c).as_deref() == Some("text/plain"))
            .or_else(|| children.len().checked_sub(1))
    }

    fn build(&mut self, part_id: usize, preferred: bool) -> Chunk {
        let id = self.next_id;
        self.next_id += 1;

        let message = self.message;
        let Some(part) = message.parts.get(part_id) else {
            return Chunk {
                id,
                ..Default::default()
            };
        };
        let content_type = self.mime_type(part_id);
        let disposition_attachment = part
            .content_disposition()
            .is_some_and(|d| d.is_attachment());

        let mut chunk = Chunk {
            id,
            content_type: content_type.clone(),
            filename: part.attachment_name().map(str::to_string),
            preferred,
            ..Default::default()
        };

        match &part.body {
            PartType::Text(text) | PartType::Html(text) => {
                if chunk.content_type.is_none() {
                    let html = matches!(part.body, PartType::Html(_));
                    chunk.content_type =
                        Some(if html { "text/html" } else { "text/plain" }.to_string());
                }
                chunk.text = Some(text.to_string());
                chunk.raw = text.as_bytes().to_vec();
                chunk.viewable = true;
                chunk.attachment = disposition_attachment;
            }
            PartType::Binary(data) | PartType::InlineBinary(data) => {
                chunk.raw = data.to_vec();
                chunk.attachment = !matches!(
                    content_type.as_deref(),
                    Some(
                        "application/pgp-signature"
                            | "application/pkcs7-signature"
                            | "application/pgp-encrypted"
                    )
                );
            }
            PartType::Message(inner) => {
                chunk.raw = inner.raw_message.to_vec();
                chunk.mime_message = true;
                chunk.attachment = true;
                if chunk.filename.is_none() {
                    chunk.filename = inner.subject().map(|s| format!("{}.eml", s));
                }
            }
            PartType::Multipart(children) => {
                let mime = content_type.as_deref().unwrap_or("");
                let alternative = mime == "multipart/alternative";
                let pick = if alternative {
                    self.preferred_alternative(children)
                } else {
                    None
                };
                chunk.children = children
                    .iter()
                    .enumerate()
                    .map(|(i, &child)| {
                        self.build(child, preferred && (!alternative || Some(i) == pick))
                    })
                    .collect();
                match mime {
                    "multipart/signed" => {
                        chunk.signed = true;
                        chunk.viewable = true;
                    }
                    "multipart/encrypted" => {
                        chunk.encrypted = true;
                        chunk.viewable = true;
                    }
                    _ => {}
                }
            }
        }

        if chunk.signed || chunk.encrypted {
            chunk.crypto = self.verifier.verify(&chunk);
        }
        chunk
    }
}

fn addresses(addr: Option<&mail_parser::Address>) -> Vec<Address> {
    let Some(addr) = addr else {
        return Vec::new();
    };
    let list: Vec<&mail_parser::Addr> = match addr {
        mail_parser::Address::List(list) => list.iter().collect(),
        mail_parser::Address::Group(groups) => {
            groups.iter().flat_map(|g| g.addresses.iter()).collect()
        }
    };
    list.into_iter()
        .filter_map(|a| {
            a.address
                .as_deref()
                .map(|email| Address::new(a.name.as_deref(), email))
        })
        .collect()
}

fn header_ids(value: &HeaderValue) -> Vec<String> {
    match value {
        HeaderValue::Text(id) => vec![id.to_string()],
        HeaderValue::TextList(ids) => ids.iter().map(|id| id.to_string()).collect(),
        _ => Vec::new(),
    }
}

/// Stand-in message id for messages without one.
fn synthetic_mid(raw: &[u8]) -> String {
    let hash = raw
        .iter()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, &b| {
            (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
    format!("threadview-{:016x}@localhost", hash)
}

/// Parse one message into its chunk tree.
pub fn parse_message(raw: &[u8], verifier: &dyn Verifier) -> Result<Message> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        anyhow::bail!("empty message");
    }
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| anyhow::anyhow!("Failed to parse message"))?;

    let mut builder = ChunkBuilder {
        message: &parsed,
        verifier,
        next_id: 0,
    };
    let root = builder.build(0, true);

    Ok(Message {
        mid: parsed
            .message_id()
            .map(str::to_string)
            .unwrap_or_else(|| synthetic_mid(raw)),
        subject: parsed.subject().unwrap_or("(no subject)").to_string(),
        from: addresses(parsed.from()).into_iter().next(),
        to: addresses(parsed.to()),
        cc: addresses(parsed.cc()),
        bcc: addresses(parsed.bcc()),
        timestamp: parsed.date().map(|d| d.to_timestamp()).unwrap_or(0),
        in_reply_to: header_ids(parsed.in_reply_to()).into_iter().next(),
        references: header_ids(parsed.references()),
        tags: BTreeSet::new(),
        root,
        raw: raw.to_vec(),
        file_path: None,
        level: 0,
        missing_content: false,
        in_store: false,
    })
}

/// Read a message file; tags come from its maildir flags.
pub fn read_message(path: &Path, verifier: &dyn Verifier) -> Result<Message> {
    let raw = std::fs::read(path)?;
    let mut message = parse_message(&raw, verifier)?;
    message.tags = tags_from_path(path);
    message.file_path = Some(path.to_path_buf());
    message.in_store = true;
    Ok(message)
}

/// Expand directories into the message files below them.
pub fn collect_paths(args: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for arg in args {
        if arg.is_dir() {
            for entry in walkdir::WalkDir::new(arg)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                paths.push(entry.into_path());
            }
        } else {
            paths.push(arg.clone());
        }
    }
    paths.sort();
    paths
}

/// Load and thread the given message files.
/// Files that fail to parse are logged and skipped.
/// Uses Rayon for parallel file parsing
pub fn load_thread(paths: &[PathBuf], verifier: &dyn Verifier) -> Vec<Message> {
    let messages: Vec<Message> = paths
        .par_iter()
        .filter_map(|path| match read_message(path, verifier) {
            Ok(message) => Some(message),
            Err(e) => {
                log::warn!("skipping {}: {:#}", path.display(), e);
                None
            }
        })
        .collect();

    log::info!("loaded {} of {} messages", messages.len(), paths.len());
    order_thread(messages)
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Save one chunk's decoded contents into `output_dir`.
pub fn save_chunk(chunk: &Chunk, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let name = chunk
        .filename
        .as_deref()
        .map(sanitize_filename)
        .unwrap_or_else(|| format!("part-{}", chunk.id));
    let out_path = output_dir.join(name);
    std::fs::write(&out_path, &chunk.raw)?;
    Ok(out_path)
}

/// Save the whole message as an .eml file.
pub fn save_message(message: &Message, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let out_path = output_dir.join(format!("{}.eml", sanitize_filename(&message.subject)));
    std::fs::write(&out_path, &message.raw)?;
    Ok(out_path)
}

/// Save all attachments from a message to a directory
/// Returns list of saved file paths
pub fn save_attachments(message: &Message, output_dir: &Path) -> Result<Vec<PathBuf>> {
    message
        .root
        .attachments()
        .into_iter()
        .map(|chunk| save_chunk(chunk, output_dir))
        .collect()
}

/// Write a chunk to a kept temporary file, for handing to an external program.
pub fn write_temp(chunk: &Chunk) -> Result<PathBuf> {
    let suffix = chunk
        .filename
        .as_deref()
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_else(|| match chunk.mime_type() {
            "text/html" => ".html".to_string(),
            "text/plain" => ".txt".to_string(),
            _ => String::new(),
        });
    let mut file = tempfile::Builder::new()
        .prefix("threadview-")
        .suffix(&suffix)
        .tempfile()?;
    std::io::Write::write_all(&mut file, &chunk.raw)?;
    let path = file.into_temp_path().keep()?;
    Ok(path)
}
