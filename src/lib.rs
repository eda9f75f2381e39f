pub mod config;
pub mod mail;
pub mod render;
pub mod thread;
pub mod ui;

pub use config::Config;
pub use mail::types::{Chunk, ChunkId, Message};
pub use render::document::MessageDocument;
pub use render::mime_tree::RenderNode;
pub use thread::{ActionTable, Notification, Surface, ThreadController};
