use crossterm::event::{KeyEvent, KeyEventKind};

/// Listener phase on the document body.
///
/// Capture listeners run before bubble listeners for every event, which
/// gives a capture listener on the body the earliest look at each key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Capture,
    Bubble,
}

/// A raw key event together with the node it originated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardEvent<N> {
    pub target: N,
    pub key: KeyEvent,
}

impl<N> KeyboardEvent<N> {
    pub fn new(target: N, key: KeyEvent) -> Self {
        Self { target, key }
    }

    /// Press and auto-repeat both count as keydown; release does not.
    pub fn is_keydown(&self) -> bool {
        matches!(self.key.kind, KeyEventKind::Press | KeyEventKind::Repeat)
    }
}
