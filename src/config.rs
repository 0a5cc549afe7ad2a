//! Dispatcher configuration
//!
//! `DispatcherConfig` carries the few knobs a host may want to change when it
//! builds a dispatcher. Defaults match a body-level capture listener with no
//! scope label.

use crate::event::Phase;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherConfig {
    phase: Phase,
    scope: Option<String>,
}

impl DispatcherConfig {
    pub const fn new() -> Self {
        Self {
            phase: Phase::Capture,
            scope: None,
        }
    }

    /// Phase the keydown listener is bound in.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Label attached to log records, useful when nested scopes each own a
    /// dispatcher.
    pub fn scope(&self) -> &str {
        self.scope.as_deref().unwrap_or("root")
    }

    pub const fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}
