//! Inter-client selections: ownership, conversion, and loss.
//!
//! The [`SelectionManager`] is the protocol engine. It claims a slot for a
//! frame, attaches the payload to the frame's owner window under the
//! slot's quark pair, and registers supply/loss callbacks with the
//! clipboard service. Later requests from other clients and loss of
//! ownership come back through those callbacks.
//!
//! Every entry point checks the display usability guard first and quietly
//! does nothing when more than one display is attached.

pub mod guard;
pub mod hooks;
pub mod manager;
pub mod quark;
pub mod slot;

pub use hooks::SentSelectionHooks;
pub use manager::SelectionManager;
pub use quark::QuarkRegistry;
pub use slot::{ForeignSelection, SelectionSlot, SelectionValue, TargetType};

/// Errors signaled to selection callers.
///
/// An unusable display configuration and a refused registration are not
/// errors: those paths return their "nothing happened" value instead.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    /// Not one of `PRIMARY`, `SECONDARY`, `CLIPBOARD`.
    #[error("bad selection: {0}")]
    InvalidSlot(String),

    #[error("selection unavailable for this frame")]
    UnavailableFrame,

    #[error("retrieving {0} selections is currently unimplemented")]
    UnimplementedFormat(String),
}

impl SelectionError {
    /// Machine-readable reason used on the wire.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidSlot(_) => "invalid_slot",
            Self::UnavailableFrame => "unavailable_frame",
            Self::UnimplementedFormat(_) => "unimplemented_format",
        }
    }
}
