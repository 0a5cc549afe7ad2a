use std::rc::Rc;

use crate::event::KeyboardEvent;

/// What the keyboard dispatcher needs from an open overlay.
///
/// Handles are compared by identity: two registrations refer to the same
/// overlay only when they point at the same allocation.
pub trait OverlayHandle<N> {
    /// Root node of the overlay's subtree. Must stay stable while the overlay
    /// is registered.
    fn root(&self) -> N;

    /// Sink for keydowns routed to this overlay. May register or deregister
    /// overlays on the dispatcher that is calling it.
    fn emit_keydown(&self, event: &KeyboardEvent<N>);
}

pub type OverlayRef<N> = Rc<dyn OverlayHandle<N>>;

/// Identity comparison between a registered handle and any handle reference.
pub fn same_overlay<'a, N>(
    registered: &OverlayRef<N>,
    other: &'a (dyn OverlayHandle<N> + 'a),
) -> bool {
    let other: *const (dyn OverlayHandle<N> + 'a) = other;
    std::ptr::addr_eq(Rc::as_ptr(registered), other)
}
