mod actions;
pub mod controller;
pub mod keys;
pub mod links;
mod navigation;
pub mod notify;
mod search;
pub mod state;
pub mod surface;
pub mod timer;

pub use controller::{ThreadController, ToggleMode};
pub use keys::ActionTable;
pub use notify::{ElementAction, IndexAction, Notification};
pub use state::{Element, ElementKind, MessageKey, MessageState};
pub use surface::{Bounds, Class, Clock, Surface, SystemClock, Target, Viewport};
