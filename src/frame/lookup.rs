//! Frame resolution for selection requests.
//!
//! Maps the caller's optional frame/terminal argument to the live X11
//! frame that acts on its behalf.

use super::{Frame, FrameId, FrameTable, OutputKind, TerminalId};

/// Which frame a selection request is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameTarget {
    /// The selected frame, or failing that the first X11 frame.
    #[default]
    Absent,
    /// The first live frame on this terminal.
    Terminal(TerminalId),
    Frame(FrameId),
}

/// Find the frame that should act for a selection request, or `None`.
///
/// Only live frames of the X11 backend are ever returned. Scans go in
/// creation order, so the answer is deterministic.
pub fn frame_for_selection(frames: &FrameTable, target: FrameTarget) -> Option<&Frame> {
    match target {
        FrameTarget::Absent => frames
            .selected()
            .filter(|f| f.can_select())
            .or_else(|| frames.frames().find(|f| f.can_select())),
        FrameTarget::Terminal(id) => {
            let terminal = frames.terminal(id).filter(|t| t.is_live())?;
            if terminal.kind() != OutputKind::X11 {
                return None;
            }
            frames
                .frames()
                .find(|f| f.is_live() && f.terminal() == id)
        }
        FrameTarget::Frame(id) => frames.frame(id).filter(|f| f.can_select()),
    }
}
