//! Input collaborators: keyboard shortcuts and touch gestures.
//!
//! Both only produce events. They publish on the [`EventBus`](crate::EventBus)
//! and never touch scenes or history directly.

mod gestures;
mod shortcuts;

pub use gestures::{Gesture, GestureConfig, GestureRecognizer, TouchPoint, publish_all};
pub use shortcuts::{EditorCommand, KeyCombo, KeyEvent, ShortcutEvent, ShortcutMap};
