//! Selection ownership manager: the five selection entry points.
//!
//! Per (slot, owner window) the protocol is a small state machine:
//!
//! ```text
//! Unowned --own--> Owned --disown / lost--> Unowned
//!                  Owned --supply--> Owned   (payload read-only)
//! ```
//!
//! `own_selection`, `disown_selection` and `selection_owner_p` return
//! immediately. `selection_exists_p` and `get_selection` block the
//! calling loop turn until the owner answers or the service times out.

use std::sync::Arc;

use crate::frame::{FrameId, FrameTable, FrameTarget, OwnerWindow, frame_for_selection};
use crate::resolver::{ClipboardService, DisplayManager, SelectionHandler};

use super::guard::selection_usable;
use super::{
    ForeignSelection, QuarkRegistry, SelectionError, SelectionSlot, SelectionValue,
    SentSelectionHooks, TargetType,
};

/// Supply/loss callbacks registered with the clipboard service.
///
/// Holds only the quark registry and the hook list; all payload state
/// lives on the owner window passed back by the service.
struct SlotCallbacks {
    quarks: &'static QuarkRegistry,
    hooks: Arc<SentSelectionHooks>,
}

impl SelectionHandler for SlotCallbacks {
    fn supply(
        &self,
        slot: SelectionSlot,
        target: &TargetType,
        owner: &OwnerWindow,
    ) -> Option<Vec<u8>> {
        // A request may arrive after a disown already cleared the keys.
        let data = owner.payload(self.quarks.keys(slot));
        tracing::trace!(
            %slot,
            %target,
            owner = owner.xid(),
            size = data.as_ref().map(Vec::len),
            "supplying selection"
        );
        self.hooks.run(slot, target, data.is_some());
        data
    }

    fn lost(&self, slot: SelectionSlot, owner: &OwnerWindow) {
        let had_payload = owner.detach(self.quarks.keys(slot));
        tracing::debug!(%slot, owner = owner.xid(), had_payload, "selection lost");
    }
}

/// Claims, serves, queries, and releases selections for frames.
pub struct SelectionManager {
    quarks: &'static QuarkRegistry,
    clipboard: Arc<dyn ClipboardService>,
    displays: Arc<dyn DisplayManager>,
    hooks: Arc<SentSelectionHooks>,
    callbacks: Arc<SlotCallbacks>,
}

impl SelectionManager {
    pub fn new(
        quarks: &'static QuarkRegistry,
        clipboard: Arc<dyn ClipboardService>,
        displays: Arc<dyn DisplayManager>,
        hooks: Arc<SentSelectionHooks>,
    ) -> Self {
        let callbacks = Arc::new(SlotCallbacks {
            quarks,
            hooks: Arc::clone(&hooks),
        });
        Self {
            quarks,
            clipboard,
            displays,
            hooks,
            callbacks,
        }
    }

    fn usable(&self) -> bool {
        selection_usable(&*self.displays)
    }

    /// Assert `value` as the `slot` selection, owned by `frame` (the
    /// selected frame when `None`).
    ///
    /// Returns the value back on success, `None` when selections are
    /// disabled. A refused registration is not an error; it is reported to
    /// the hooks as a failed send. Non-text values are echoed back without
    /// asserting anything.
    ///
    /// # Errors
    ///
    /// `UnavailableFrame` if no live X11 frame can own the selection.
    pub fn own_selection(
        &self,
        frames: &FrameTable,
        slot: SelectionSlot,
        value: SelectionValue,
        frame: Option<FrameId>,
    ) -> Result<Option<SelectionValue>, SelectionError> {
        if !self.usable() {
            return Ok(None);
        }

        let target = frame.map_or(FrameTarget::Absent, FrameTarget::Frame);
        let frame = frame_for_selection(frames, target).ok_or(SelectionError::UnavailableFrame)?;
        let owner = frame.owner();
        let keys = self.quarks.keys(slot);

        let successful = match value.as_text() {
            Some(bytes) => {
                // Restored if the service refuses the re-assert.
                let previous = owner.payload(keys);
                owner.attach(keys, bytes);
                let handler: Arc<dyn SelectionHandler> = self.callbacks.clone();
                match self
                    .clipboard
                    .set_with_owner(slot, &TargetType::TEXT_TARGETS, owner, handler)
                {
                    Ok(()) => {
                        tracing::debug!(
                            %slot,
                            frame = %frame.id(),
                            owner = owner.xid(),
                            size = bytes.len(),
                            "selection asserted"
                        );
                        true
                    }
                    Err(e) => {
                        match &previous {
                            Some(data) => owner.attach(keys, data),
                            None => {
                                owner.detach(keys);
                            }
                        }
                        tracing::warn!(%slot, frame = %frame.id(), error = %e, "selection assert failed");
                        false
                    }
                }
            }
            None => {
                tracing::debug!(%slot, "non-text selection value, nothing asserted");
                false
            }
        };

        self.hooks.run(slot, &TargetType::Text, successful);
        Ok(Some(value))
    }

    /// Clear `slot` on the display of `target`, whoever owns it.
    ///
    /// Returns `false` when there is no frame or selections are disabled.
    pub fn disown_selection(
        &self,
        frames: &FrameTable,
        slot: SelectionSlot,
        time: Option<u32>,
        target: FrameTarget,
    ) -> bool {
        let Some(frame) = frame_for_selection(frames, target) else {
            return false;
        };
        if !self.usable() {
            return false;
        }

        let owner = frame.owner();
        if let Err(e) = self.clipboard.clear(slot, owner, time) {
            tracing::warn!(%slot, frame = %frame.id(), error = %e, "selection clear failed");
            return false;
        }
        owner.detach(self.quarks.keys(slot));
        tracing::debug!(%slot, frame = %frame.id(), "selection disowned");
        true
    }

    /// Whether any client currently offers text for `slot`.
    pub fn selection_exists_p(
        &self,
        frames: &FrameTable,
        slot: SelectionSlot,
        target: FrameTarget,
    ) -> bool {
        let Some(frame) = frame_for_selection(frames, target) else {
            return false;
        };
        if !self.usable() {
            return false;
        }

        match self.clipboard.wait_is_text_available(slot, frame.owner()) {
            Ok(available) => available,
            Err(e) => {
                tracing::warn!(%slot, error = %e, "selection existence query failed");
                false
            }
        }
    }

    /// Whether this process owns `slot` through the frame of `target`.
    ///
    /// Purely local: looks at the owner window's attached payload and never
    /// asks the windowing system.
    pub fn selection_owner_p(
        &self,
        frames: &FrameTable,
        slot: SelectionSlot,
        target: FrameTarget,
    ) -> bool {
        if !self.usable() {
            return false;
        }
        frame_for_selection(frames, target)
            .is_some_and(|frame| frame.owner().has_payload(self.quarks.keys(slot)))
    }

    /// Fetch the text of `slot` from its current owner.
    ///
    /// `target_type` only has to be something other than `MULTIPLE`; the
    /// request itself is always made for text and the result is tagged
    /// `UTF8_STRING`. Returns `None` when nobody supplies text or
    /// selections are disabled.
    ///
    /// # Errors
    ///
    /// `UnimplementedFormat` for `MULTIPLE`; `UnavailableFrame` if no live
    /// X11 frame can make the request.
    pub fn get_selection(
        &self,
        frames: &FrameTable,
        slot: SelectionSlot,
        target_type: &TargetType,
        time: Option<u32>,
        target: FrameTarget,
    ) -> Result<Option<ForeignSelection>, SelectionError> {
        if *target_type == TargetType::Multiple {
            return Err(SelectionError::UnimplementedFormat(
                target_type.as_str().to_string(),
            ));
        }
        let frame = frame_for_selection(frames, target).ok_or(SelectionError::UnavailableFrame)?;
        if !self.usable() {
            return Ok(None);
        }

        match self.clipboard.wait_for_text(slot, frame.owner(), time) {
            Ok(Some(data)) => Ok(Some(ForeignSelection {
                data,
                format: TargetType::Utf8String,
            })),
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::warn!(%slot, error = %e, "selection retrieval failed");
                Ok(None)
            }
        }
    }
}
