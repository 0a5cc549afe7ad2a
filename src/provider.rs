//! Parent-or-new factory kept for callers that still resolve the dispatcher
//! through nested scopes. New code should build one `KeyboardDispatcher` and
//! pass clones of it to every overlay creator.

use std::rc::Rc;

use tracing::debug;

use crate::containment::Containment;
use crate::dispatcher::KeyboardDispatcher;
use crate::host::ListenerHost;

/// Return the enclosing scope's dispatcher when there is one, otherwise build
/// a fresh dispatcher for `host`.
#[deprecated(note = "construct a KeyboardDispatcher once and share clones of it")]
pub fn keyboard_dispatcher_provider<N, H, C>(
    parent: Option<&KeyboardDispatcher<N>>,
    host: Rc<H>,
    containment: Rc<C>,
) -> KeyboardDispatcher<N>
where
    N: 'static,
    H: ListenerHost<N> + 'static,
    C: Containment<N> + 'static,
{
    match parent {
        Some(existing) => {
            debug!(scope = existing.config().scope(), "reusing parent dispatcher");
            existing.clone()
        }
        None => KeyboardDispatcher::new(host, containment),
    }
}
