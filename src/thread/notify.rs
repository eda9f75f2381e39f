use std::collections::BTreeSet;

use super::state::MessageKey;
use crate::mail::types::ChunkId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementAction {
    Enter,
    Save,
    Yank,
    YankRaw,
    Delete,
}

/// Requests for whatever list opened this thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexAction {
    Next,
    Previous,
    NextUnread,
    PreviousUnread,
    Close,
}

/// Outputs of the controller, drained by the host after each call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Initial render and focus are done.
    Ready,
    ElementAction {
        key: MessageKey,
        element: usize,
        action: ElementAction,
    },
    IndexAction(IndexAction),
    TagsChanged {
        key: MessageKey,
        added: BTreeSet<String>,
        removed: BTreeSet<String>,
    },
    /// Bring up a tag editor for these messages.
    EditTags(Vec<MessageKey>),
    SaveMessages(Vec<MessageKey>),
    SaveChunk {
        key: MessageKey,
        chunk_id: ChunkId,
    },
    SaveAttachments(Vec<MessageKey>),
    OpenChunk {
        key: MessageKey,
        chunk_id: ChunkId,
    },
    /// Show an embedded message in a nested view.
    OpenEmbedded {
        key: MessageKey,
        chunk_id: ChunkId,
    },
    OpenMessageId(String),
    Compose {
        to: String,
    },
    Yank(String),
}
