//! Keyboard routing for stacked overlays.
//!
//! A `KeyboardDispatcher` keeps the open overlays in attachment order and
//! owns at most one keydown listener on its host. The listener is bound when
//! the first overlay registers and unbound when the last one leaves, so the
//! host carries a listener exactly while the registry is non-empty.
//!
//! Each keydown is routed to one overlay:
//! 1. the oldest registered overlay whose root contains the event's origin, or
//! 2. when no root contains it, the most recently registered overlay.
//!
//! The event is forwarded untouched. Sinks may register or deregister overlays
//! while handling it; routing runs over a snapshot of the registry taken
//! before any sink is called.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::config::DispatcherConfig;
use crate::containment::Containment;
use crate::document::Document;
use crate::dom::NodeId;
use crate::error::DispatchError;
use crate::event::KeyboardEvent;
use crate::host::{KeyListener, ListenerHost, ListenerId};
use crate::overlay::{OverlayHandle, OverlayRef, same_overlay};

/// How a keydown found its overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The overlay's root contains the event origin.
    Contained,
    /// No root contained the origin; the newest overlay took it.
    Fallback,
}

/// Routing decision for one event.
#[derive(Clone)]
pub struct Resolution<N> {
    pub overlay: OverlayRef<N>,
    /// Position of `overlay` in attachment order when the event was routed.
    pub position: usize,
    pub route: Route,
}

impl<N> fmt::Debug for Resolution<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("position", &self.position)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

/// Routes keydowns from a single host listener to the active overlay.
///
/// Cloning is cheap and shares state: every clone sees the same registry and
/// the same listener. Dropping the last clone unbinds the listener.
pub struct KeyboardDispatcher<N> {
    inner: Rc<Inner<N>>,
}

impl<N> Clone for KeyboardDispatcher<N> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<N> fmt::Debug for KeyboardDispatcher<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyboardDispatcher")
            .field("scope", &self.inner.config.scope())
            .field("overlays", &self.inner.registry.borrow().len())
            .field("listening", &self.inner.listener.get().is_some())
            .finish()
    }
}

/// Non-owning reference to a dispatcher, for overlays that need to reach
/// the dispatcher that holds them.
pub struct WeakKeyboardDispatcher<N> {
    inner: Weak<Inner<N>>,
}

impl<N> Clone for WeakKeyboardDispatcher<N> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<N> WeakKeyboardDispatcher<N> {
    pub fn upgrade(&self) -> Option<KeyboardDispatcher<N>> {
        self.inner.upgrade().map(|inner| KeyboardDispatcher { inner })
    }
}

struct Inner<N> {
    registry: RefCell<Vec<OverlayRef<N>>>,
    listener: Cell<Option<ListenerId>>,
    host: Rc<dyn ListenerHost<N>>,
    containment: Rc<dyn Containment<N>>,
    config: DispatcherConfig,
}

impl KeyboardDispatcher<NodeId> {
    /// Dispatcher bound to `document`, using its tree for containment.
    pub fn for_document(document: &Rc<Document>) -> Self {
        Self::with_config(
            Rc::clone(document),
            Rc::clone(document),
            DispatcherConfig::default(),
        )
    }
}

impl<N: 'static> KeyboardDispatcher<N> {
    pub fn new<H, C>(host: Rc<H>, containment: Rc<C>) -> Self
    where
        H: ListenerHost<N> + 'static,
        C: Containment<N> + 'static,
    {
        Self::with_config(host, containment, DispatcherConfig::default())
    }

    pub fn with_config<H, C>(host: Rc<H>, containment: Rc<C>, config: DispatcherConfig) -> Self
    where
        H: ListenerHost<N> + 'static,
        C: Containment<N> + 'static,
    {
        Self {
            inner: Rc::new(Inner {
                registry: RefCell::new(Vec::new()),
                listener: Cell::new(None),
                host,
                containment,
                config,
            }),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakKeyboardDispatcher<N> {
        WeakKeyboardDispatcher {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether `self` and `other` share state.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Append `overlay` to the registry, binding the listener if it is the
    /// first one. Registering an overlay that is already present does nothing.
    pub fn register(&self, overlay: OverlayRef<N>) {
        if self.try_register(overlay).is_err() {
            debug!(
                scope = self.inner.config.scope(),
                "ignoring duplicate overlay registration"
            );
        }
    }

    /// Like [`register`](Self::register), but reports a duplicate instead of
    /// ignoring it.
    pub fn try_register(&self, overlay: OverlayRef<N>) -> Result<(), DispatchError> {
        let was_empty = {
            let mut registry = self.inner.registry.borrow_mut();
            if registry.iter().any(|o| Rc::ptr_eq(o, &overlay)) {
                return Err(DispatchError::AlreadyRegistered);
            }
            registry.push(overlay);
            registry.len() == 1
        };
        if was_empty {
            self.inner.attach(&self.inner);
        }
        Ok(())
    }

    /// Remove `overlay` from the registry, unbinding the listener when the
    /// registry empties. Returns `false` if it was not registered.
    pub fn deregister(&self, overlay: &dyn OverlayHandle<N>) -> bool {
        let (removed, now_empty) = {
            let mut registry = self.inner.registry.borrow_mut();
            let Some(index) = registry.iter().position(|o| same_overlay(o, overlay)) else {
                return false;
            };
            (registry.remove(index), registry.is_empty())
        };
        if now_empty {
            self.inner.detach();
        }
        // The handle may be the last strong reference; drop it only after the
        // registry borrow is released.
        drop(removed);
        true
    }

    /// Unbind the listener and forget every overlay. Safe to call repeatedly
    /// and on a dispatcher that never attached.
    pub fn teardown(&self) {
        self.inner.teardown();
    }

    /// Route `event` to its overlay and deliver it. Returns `None` when no
    /// overlay is registered.
    ///
    /// The bound listener calls this for every keydown; hosts that deliver
    /// events themselves may call it directly.
    pub fn dispatch(&self, event: &KeyboardEvent<N>) -> Option<Resolution<N>> {
        self.inner.dispatch(event)
    }

    /// The routing decision `dispatch` would make, without delivering.
    pub fn resolve_target(&self, event: &KeyboardEvent<N>) -> Option<Resolution<N>> {
        let snapshot = self.handles();
        self.inner.resolve(&snapshot, event)
    }

    pub fn len(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.borrow().is_empty()
    }

    /// Whether the host listener is currently bound.
    pub fn is_listening(&self) -> bool {
        self.inner.listener.get().is_some()
    }

    pub fn contains(&self, overlay: &dyn OverlayHandle<N>) -> bool {
        self.inner
            .registry
            .borrow()
            .iter()
            .any(|o| same_overlay(o, overlay))
    }

    /// Registered overlays in attachment order.
    pub fn handles(&self) -> Vec<OverlayRef<N>> {
        self.inner.registry.borrow().clone()
    }
}

impl<N: 'static> Inner<N> {
    fn attach(&self, this: &Rc<Self>) {
        if self.listener.get().is_some() {
            return;
        }
        let weak = Rc::downgrade(this);
        let listener: KeyListener<N> = Rc::new(move |event: &KeyboardEvent<N>| {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch(event);
            }
        });
        let id = self.host.add_key_listener(self.config.phase(), listener);
        self.listener.set(Some(id));
        debug!(
            scope = self.config.scope(),
            phase = ?self.config.phase(),
            "keydown listener attached"
        );
    }
}

impl<N> Inner<N> {
    fn detach(&self) {
        if let Some(id) = self.listener.take() {
            self.host.remove_key_listener(id);
            debug!(scope = self.config.scope(), "keydown listener detached");
        }
    }

    fn teardown(&self) {
        self.detach();
        let drained = std::mem::take(&mut *self.registry.borrow_mut());
        if !drained.is_empty() {
            debug!(
                scope = self.config.scope(),
                overlays = drained.len(),
                "dropped overlays on teardown"
            );
        }
    }

    fn dispatch(&self, event: &KeyboardEvent<N>) -> Option<Resolution<N>> {
        let snapshot = self.registry.borrow().clone();
        if snapshot.is_empty() {
            trace!(scope = self.config.scope(), "no overlays; keydown dropped");
            return None;
        }
        let resolution = self.resolve(&snapshot, event)?;
        trace!(
            scope = self.config.scope(),
            position = resolution.position,
            route = ?resolution.route,
            "routing keydown"
        );
        resolution.overlay.emit_keydown(event);
        Some(resolution)
    }

    fn resolve(
        &self,
        snapshot: &[OverlayRef<N>],
        event: &KeyboardEvent<N>,
    ) -> Option<Resolution<N>> {
        let contained = snapshot
            .iter()
            .position(|overlay| self.containment.contains(&overlay.root(), &event.target));
        match contained {
            Some(position) => Some(Resolution {
                overlay: Rc::clone(&snapshot[position]),
                position,
                route: Route::Contained,
            }),
            None => snapshot.last().map(|overlay| Resolution {
                overlay: Rc::clone(overlay),
                position: snapshot.len() - 1,
                route: Route::Fallback,
            }),
        }
    }
}

impl<N> Drop for Inner<N> {
    fn drop(&mut self) {
        self.teardown();
    }
}
