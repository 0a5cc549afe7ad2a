//! Key log popup: a small overlay that records the keys routed to it.
//!
//! Used by the interactive demo to make routing decisions visible. Esc closes
//! the popup from inside its own keydown sink.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::dispatcher::{KeyboardDispatcher, WeakKeyboardDispatcher};
use crate::document::Document;
use crate::dom::{DomError, NodeId};
use crate::event::KeyboardEvent;
use crate::overlay::OverlayHandle;

const MAX_LOG_LINES: usize = 64;
const POPUP_WIDTH: u16 = 36;
const POPUP_HEIGHT: u16 = 10;

pub struct KeyLogPopup {
    title: String,
    root: NodeId,
    input: NodeId,
    dispatcher: WeakKeyboardDispatcher<NodeId>,
    log: RefCell<VecDeque<String>>,
    closed: Cell<bool>,
}

impl std::fmt::Debug for KeyLogPopup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLogPopup")
            .field("title", &self.title)
            .field("root", &self.root)
            .field("closed", &self.closed.get())
            .finish_non_exhaustive()
    }
}

impl KeyLogPopup {
    /// Build the popup's nodes under `layer` and register it with
    /// `dispatcher`.
    pub fn open(
        document: &Document,
        layer: NodeId,
        title: impl Into<String>,
        dispatcher: &KeyboardDispatcher<NodeId>,
    ) -> Result<Rc<Self>, DomError> {
        let title = title.into();
        let root = document.create_labeled(layer, &title)?;
        let input = document.create_labeled(root, "input")?;
        let popup = Rc::new(Self {
            title,
            root,
            input,
            dispatcher: dispatcher.downgrade(),
            log: RefCell::new(VecDeque::new()),
            closed: Cell::new(false),
        });
        dispatcher.register(popup.clone());
        Ok(popup)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Focusable node inside the popup.
    pub fn input(&self) -> NodeId {
        self.input
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.borrow().iter().cloned().collect()
    }

    /// Deregister from the dispatcher. Returns `false` if already closed.
    pub fn close(&self) -> bool {
        if self.closed.replace(true) {
            return false;
        }
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.deregister(self);
        }
        true
    }

    /// Cascading placement: each popup sits down and to the right of the one
    /// opened before it.
    pub fn rect_for(area: Rect, index: usize) -> Rect {
        let step = index.min(u16::MAX as usize) as u16;
        let x = area.x.saturating_add(2 + step.saturating_mul(4));
        let y = area.y.saturating_add(1 + step.saturating_mul(2));
        let width = POPUP_WIDTH.min(area.right().saturating_sub(x));
        let height = POPUP_HEIGHT.min(area.bottom().saturating_sub(y));
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, index: usize, focused: bool) {
        let rect = Self::rect_for(area, index);
        if rect.width < 3 || rect.height < 3 {
            return;
        }
        frame.render_widget(Clear, rect);
        let border = if focused {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let block = Block::default()
            .title(format!(" {} {} ", self.title, self.root))
            .borders(Borders::ALL)
            .border_style(border);
        let visible = rect.height.saturating_sub(2) as usize;
        let log = self.log.borrow();
        let lines: Vec<Line> = log
            .iter()
            .skip(log.len().saturating_sub(visible))
            .map(|entry| Line::from(entry.as_str()))
            .collect();
        frame.render_widget(Paragraph::new(lines).block(block), rect);
    }
}

impl OverlayHandle<NodeId> for KeyLogPopup {
    fn root(&self) -> NodeId {
        self.root
    }

    fn emit_keydown(&self, event: &KeyboardEvent<NodeId>) {
        if event.key.code == KeyCode::Esc {
            self.close();
            return;
        }
        let mut log = self.log.borrow_mut();
        if log.len() == MAX_LOG_LINES {
            log.pop_front();
        }
        log.push_back(format!("{} from {}", describe_key(&event.key), event.target));
    }
}

/// Human-readable key chord, e.g. `Ctrl+a` or `Shift+Tab`.
pub fn describe_key(key: &KeyEvent) -> String {
    let mut out = String::new();
    for (flag, name) in [
        (KeyModifiers::CONTROL, "Ctrl+"),
        (KeyModifiers::ALT, "Alt+"),
        (KeyModifiers::SHIFT, "Shift+"),
    ] {
        if key.modifiers.contains(flag) {
            out.push_str(name);
        }
    }
    match key.code {
        KeyCode::Char(' ') => out.push_str("Space"),
        KeyCode::Char(c) => out.push(c),
        KeyCode::F(n) => out.push_str(&format!("F{n}")),
        other => out.push_str(&format!("{other:?}")),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ListenerHost;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn describe_key_formats_modifiers() {
        let ctrl_a = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL);
        assert_eq!(describe_key(&ctrl_a), "Ctrl+a");
        let back = KeyEvent::new(KeyCode::Tab, KeyModifiers::SHIFT);
        assert_eq!(describe_key(&back), "Shift+Tab");
        assert_eq!(describe_key(&key(KeyCode::F(5))), "F5");
        assert_eq!(describe_key(&key(KeyCode::Char(' '))), "Space");
    }

    #[test]
    fn popup_logs_routed_keys() {
        let doc = Rc::new(Document::new());
        let dispatcher = KeyboardDispatcher::for_document(&doc);
        let popup = KeyLogPopup::open(&doc, doc.body(), "one", &dispatcher).unwrap();

        doc.dispatch_key(popup.input(), key(KeyCode::Char('x')));
        assert_eq!(
            popup.entries(),
            vec![format!("x from {}", popup.input())]
        );
    }

    #[test]
    fn esc_closes_popup_from_its_own_sink() {
        let doc = Rc::new(Document::new());
        let dispatcher = KeyboardDispatcher::for_document(&doc);
        let popup = KeyLogPopup::open(&doc, doc.body(), "one", &dispatcher).unwrap();
        assert_eq!(doc.listener_count(), 1);

        doc.dispatch_key(popup.input(), key(KeyCode::Esc));
        assert!(popup.is_closed());
        assert!(dispatcher.is_empty());
        assert_eq!(doc.listener_count(), 0);
        assert!(!popup.close());
    }

    #[test]
    fn log_is_bounded() {
        let doc = Rc::new(Document::new());
        let dispatcher = KeyboardDispatcher::for_document(&doc);
        let popup = KeyLogPopup::open(&doc, doc.body(), "one", &dispatcher).unwrap();
        for _ in 0..MAX_LOG_LINES + 5 {
            doc.dispatch_key(popup.input(), key(KeyCode::Char('z')));
        }
        assert_eq!(popup.entries().len(), MAX_LOG_LINES);
    }

    #[test]
    fn rect_for_cascades_and_clamps() {
        let area = Rect::new(0, 0, 80, 24);
        let first = KeyLogPopup::rect_for(area, 0);
        let second = KeyLogPopup::rect_for(area, 1);
        assert_eq!((second.x - first.x, second.y - first.y), (4, 2));
        let tiny = KeyLogPopup::rect_for(Rect::new(0, 0, 10, 4), 3);
        assert_eq!(tiny.width, 0);
    }
}
