use std::rc::Rc;

use crate::event::{KeyboardEvent, Phase};

/// Callback invoked for every keydown the host delivers.
pub type KeyListener<N> = Rc<dyn Fn(&KeyboardEvent<N>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Hosts mint their own ids; they only need to be unique per host.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// The environment a dispatcher binds its keyboard listener to.
///
/// Listeners are attached at the top of the host's tree (the document body),
/// so a capture listener sees every keydown before the origin node does.
pub trait ListenerHost<N> {
    fn add_key_listener(&self, phase: Phase, listener: KeyListener<N>) -> ListenerId;

    /// Returns `false` when `id` was not bound.
    fn remove_key_listener(&self, id: ListenerId) -> bool;

    fn listener_count(&self) -> usize;
}
