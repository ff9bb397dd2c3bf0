//! ClipboardService trait: the windowing system's selection registry.
//!
//! The selection manager never drives the windowing system directly. It
//! registers a [`SelectionHandler`] together with an owner window, and the
//! service calls back into that handler whenever another client asks for
//! the data or takes the selection away.

use std::sync::Arc;

use crate::frame::OwnerWindow;
use crate::selection::{SelectionSlot, TargetType};

use super::ResolverError;

/// Callbacks a selection owner installs with the clipboard service.
///
/// Both are invoked later, at an arbitrary turn of the event loop, never
/// concurrently with another selection operation.
pub trait SelectionHandler: Send + Sync {
    /// Produce the slot's data in `target` for a requester. `None`
    /// declines the request.
    fn supply(
        &self,
        slot: SelectionSlot,
        target: &TargetType,
        owner: &OwnerWindow,
    ) -> Option<Vec<u8>>;

    /// Ownership of `slot` passed away from `owner`.
    fn lost(&self, slot: SelectionSlot, owner: &OwnerWindow);
}

/// System clipboard/selection access for a single (default) display.
///
/// `Send + Sync` is required because the daemon loop holds the service
/// behind an `Arc` shared with its event pump.
pub trait ClipboardService: Send + Sync {
    /// Make `owner` the owner of `slot`, advertising `targets`.
    ///
    /// If a different local owner held the slot, its handler's `lost` is
    /// called. Re-asserting from the same owner replaces the handler
    /// without a loss notification.
    fn set_with_owner(
        &self,
        slot: SelectionSlot,
        targets: &[TargetType],
        owner: &Arc<OwnerWindow>,
        handler: Arc<dyn SelectionHandler>,
    ) -> Result<(), ResolverError>;

    /// Clear `slot` regardless of who owns it. `time` is the server
    /// timestamp to clear at; `None` means "now".
    fn clear(
        &self,
        slot: SelectionSlot,
        owner: &OwnerWindow,
        time: Option<u32>,
    ) -> Result<(), ResolverError>;

    /// Whether any owner currently offers text for `slot`. Blocks until
    /// the owner answers or the request times out.
    fn wait_is_text_available(
        &self,
        slot: SelectionSlot,
        requestor: &OwnerWindow,
    ) -> Result<bool, ResolverError>;

    /// Fetch `slot` as text. Blocks until the owner answers or the
    /// request times out. `Ok(None)` means no owner or no text.
    fn wait_for_text(
        &self,
        slot: SelectionSlot,
        requestor: &OwnerWindow,
        time: Option<u32>,
    ) -> Result<Option<Vec<u8>>, ResolverError>;
}
