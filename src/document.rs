//! The host document: a node tree plus the keyboard listeners bound on its
//! body.
//!
//! `Document` is shared through `Rc` and uses interior mutability, so
//! listeners can add or remove nodes and listeners while a key is being
//! delivered.

use std::cell::{Cell, RefCell};

use crossterm::event::KeyEvent;
use tracing::{debug, trace};

use crate::containment::Containment;
use crate::dom::{DomError, NodeId, NodeTree};
use crate::event::{KeyboardEvent, Phase};
use crate::host::{KeyListener, ListenerHost, ListenerId};

struct Binding {
    id: ListenerId,
    phase: Phase,
    listener: KeyListener<NodeId>,
}

pub struct Document {
    tree: RefCell<NodeTree>,
    listeners: RefCell<Vec<Binding>>,
    next_listener: Cell<u64>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.tree.borrow().len())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            tree: RefCell::new(NodeTree::new()),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
        }
    }

    pub fn body(&self) -> NodeId {
        self.tree.borrow().root()
    }

    pub fn create_node(&self, parent: NodeId) -> Result<NodeId, DomError> {
        self.tree.borrow_mut().append_child(parent)
    }

    pub fn create_labeled(&self, parent: NodeId, label: &str) -> Result<NodeId, DomError> {
        self.tree.borrow_mut().append_labeled(parent, Some(label))
    }

    pub fn remove_node(&self, node: NodeId) -> bool {
        self.tree.borrow_mut().remove(node)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.borrow().parent(node)
    }

    pub fn label(&self, node: NodeId) -> Option<String> {
        self.tree.borrow().label(node).map(str::to_owned)
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.tree.borrow().is_attached(node)
    }

    pub fn node_contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.tree.borrow().contains(ancestor, node)
    }

    /// Deliver a key that originated at `target` to the body listeners.
    ///
    /// Capture listeners run first, then bubble listeners, each group in
    /// binding order. The listener list is snapshotted up front; a listener
    /// unbound by an earlier one during the same delivery is skipped, and one
    /// bound during delivery first sees the next event.
    ///
    /// Returns how many listeners ran.
    pub fn dispatch_key(&self, target: NodeId, key: KeyEvent) -> usize {
        let event = KeyboardEvent::new(target, key);
        if !event.is_keydown() {
            trace!(?target, kind = ?key.kind, "not a keydown");
            return 0;
        }
        if !self.is_attached(target) {
            debug!(%target, "dropping key for detached target");
            return 0;
        }

        let snapshot: Vec<(ListenerId, KeyListener<NodeId>)> = {
            let listeners = self.listeners.borrow();
            [Phase::Capture, Phase::Bubble]
                .into_iter()
                .flat_map(|phase| {
                    listeners
                        .iter()
                        .filter(move |b| b.phase == phase)
                        .map(|b| (b.id, b.listener.clone()))
                })
                .collect()
        };

        let mut invoked = 0;
        for (id, listener) in snapshot {
            if !self.is_bound(id) {
                continue;
            }
            listener(&event);
            invoked += 1;
        }
        invoked
    }

    fn is_bound(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|b| b.id == id)
    }
}

impl ListenerHost<NodeId> for Document {
    fn add_key_listener(&self, phase: Phase, listener: KeyListener<NodeId>) -> ListenerId {
        let id = ListenerId::new(self.next_listener.get());
        self.next_listener.set(id.raw() + 1);
        self.listeners.borrow_mut().push(Binding {
            id,
            phase,
            listener,
        });
        trace!(?id, ?phase, "key listener bound");
        id
    }

    fn remove_key_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(index) = listeners.iter().position(|b| b.id == id) else {
            return false;
        };
        listeners.remove(index);
        trace!(?id, "key listener unbound");
        true
    }

    fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl Containment<NodeId> for Document {
    fn contains(&self, root: &NodeId, node: &NodeId) -> bool {
        self.node_contains(*root, *node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventKind, KeyModifiers};
    use std::rc::Rc;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> KeyListener<NodeId> {
        let log = log.clone();
        Rc::new(move |_: &KeyboardEvent<NodeId>| log.borrow_mut().push(tag))
    }

    #[test]
    fn capture_listeners_run_before_bubble() {
        let doc = Document::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        doc.add_key_listener(Phase::Bubble, recorder(&log, "bubble"));
        doc.add_key_listener(Phase::Capture, recorder(&log, "capture-1"));
        doc.add_key_listener(Phase::Capture, recorder(&log, "capture-2"));

        assert_eq!(doc.dispatch_key(doc.body(), key('a')), 3);
        assert_eq!(*log.borrow(), vec!["capture-1", "capture-2", "bubble"]);
    }

    #[test]
    fn release_events_reach_no_listener() {
        let doc = Document::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        doc.add_key_listener(Phase::Capture, recorder(&log, "capture"));
        let mut release = key('a');
        release.kind = KeyEventKind::Release;
        assert_eq!(doc.dispatch_key(doc.body(), release), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn detached_targets_are_dropped() {
        let doc = Document::new();
        let node = doc.create_node(doc.body()).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        doc.add_key_listener(Phase::Capture, recorder(&log, "capture"));
        doc.remove_node(node);
        assert_eq!(doc.dispatch_key(node, key('a')), 0);
    }

    #[test]
    fn listener_removed_mid_delivery_is_skipped() {
        let doc = Rc::new(Document::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        let second: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));
        let weak = Rc::downgrade(&doc);
        let pending = second.clone();
        let first_log = log.clone();
        doc.add_key_listener(
            Phase::Capture,
            Rc::new(move |_: &KeyboardEvent<NodeId>| {
                first_log.borrow_mut().push("first");
                if let (Some(doc), Some(id)) = (weak.upgrade(), pending.get()) {
                    doc.remove_key_listener(id);
                }
            }),
        );
        second.set(Some(
            doc.add_key_listener(Phase::Capture, recorder(&log, "second")),
        ));

        assert_eq!(doc.dispatch_key(doc.body(), key('x')), 1);
        assert_eq!(*log.borrow(), vec!["first"]);
        assert_eq!(doc.listener_count(), 1);
    }

    #[test]
    fn remove_unknown_listener_reports_false() {
        let doc = Document::new();
        let id = doc.add_key_listener(Phase::Capture, Rc::new(|_: &KeyboardEvent<NodeId>| {}));
        assert!(doc.remove_key_listener(id));
        assert!(!doc.remove_key_listener(id));
        assert_eq!(doc.listener_count(), 0);
    }

    #[test]
    fn document_answers_containment() {
        let doc = Document::new();
        let popup = doc.create_labeled(doc.body(), "popup").unwrap();
        let input = doc.create_node(popup).unwrap();
        assert!(Containment::contains(&doc, &popup, &input));
        assert!(!Containment::contains(&doc, &input, &popup));
        assert_eq!(doc.label(popup).as_deref(), Some("popup"));
        assert_eq!(doc.parent(input), Some(popup));
    }
}
