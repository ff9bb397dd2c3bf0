//! Resolver abstraction: pluggable windowing-system adapters.
//!
//! Everything the selection core needs from the windowing system sits
//! behind the traits re-exported here: the clipboard service that holds
//! the actual system registration, the display manager the usability
//! guard counts, and the window provider that backs frames with real
//! owner windows. The X11 adapter implements all three; tests use the
//! in-memory simulation.

pub mod clipboard;
pub mod display;
#[cfg(test)]
pub mod memory;
pub mod x11;

pub use clipboard::{ClipboardService, SelectionHandler};
pub use display::{DisplayDescriptor, DisplayManager, WindowProvider};

/// Errors returned by windowing-system adapters.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// Connecting to or talking with the display failed.
    #[error("display: {0}")]
    Display(String),

    /// A selection operation failed (ownership refused, conversion
    /// request could not be sent, connection lost mid-transfer).
    #[error("clipboard: {0}")]
    Clipboard(String),

    /// Creating or destroying an owner window failed.
    #[error("window: {0}")]
    Window(String),
}
