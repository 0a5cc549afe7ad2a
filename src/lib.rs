//! Keyboard routing for stacked overlays.
//!
//! A single [`KeyboardDispatcher`] owns one keydown listener on its host and
//! forwards every keydown to exactly one open overlay: the oldest overlay
//! whose root contains the event origin, or the newest overlay when none do.

pub mod config;
pub mod containment;
pub mod dispatcher;
pub mod document;
pub mod dom;
pub mod drivers;
pub mod error;
pub mod event;
pub mod event_loop;
pub mod host;
pub mod overlay;
pub mod popup;
pub mod provider;
pub mod tracing_sub;

pub use config::DispatcherConfig;
pub use containment::Containment;
pub use dispatcher::{KeyboardDispatcher, Resolution, Route, WeakKeyboardDispatcher};
pub use document::Document;
pub use dom::{DomError, NodeId, NodeTree};
pub use error::DispatchError;
pub use event::{KeyboardEvent, Phase};
pub use host::{KeyListener, ListenerHost, ListenerId};
pub use overlay::{OverlayHandle, OverlayRef};
