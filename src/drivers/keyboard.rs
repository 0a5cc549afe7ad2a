// Terminal input arrives as a mix of key presses, repeats, releases, resizes
// and mouse reports. The routing layer only deals in keydowns, so everything
// else is filtered here before it reaches the document.
use crossterm::event::{Event, KeyEventKind};

#[derive(Debug, Default)]
pub struct KeydownFilter {
    dropped: u64,
}

impl KeydownFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keydowns pass through unchanged; releases are dropped. Non-key events
    /// pass through so the caller can still react to resizes.
    pub fn filter(&mut self, evt: Event) -> Option<Event> {
        match evt {
            Event::Key(key) if key.kind == KeyEventKind::Release => {
                self.dropped += 1;
                None
            }
            other => Some(other),
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
