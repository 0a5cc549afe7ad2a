use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The overlay is already in the registry; registering it again would
    /// deliver some events to it twice.
    #[error("overlay is already registered with this dispatcher")]
    AlreadyRegistered,
}
