pub mod crypto_status;
pub mod document;
pub mod mime_tree;

pub use document::MessageDocument;
pub use mime_tree::{ContentRenderer, Part, RenderNode};
