mod help;
mod pane;
mod thread;

pub use help::*;
pub use pane::*;
pub use thread::*;
