//! Frame table: terminals, frames, and the selected frame.
//!
//! Stands in for the editor's frame-management subsystem. The selection
//! core only reads from it (liveness, backend, owner window); the daemon
//! creates and deletes entries on request. Iteration is always in creation
//! order. Deleted frames and terminals stay in the table marked dead, so a
//! stale handle is recognised as dead instead of being reused.

pub mod lookup;
pub mod owner;

use std::fmt;
use std::sync::Arc;

pub use lookup::{FrameTarget, frame_for_selection};
pub use owner::OwnerWindow;

/// Handle of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// Handle of a terminal (one display connection, or a tty).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Output backend of a terminal and its frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// An X11 display; the only backend that can hold selections.
    X11,
    Tty,
}

impl OutputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X11 => "x11",
            Self::Tty => "tty",
        }
    }
}

/// Frame table errors.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("no such frame: {0}")]
    NoSuchFrame(FrameId),
    #[error("no such terminal: {0}")]
    NoSuchTerminal(TerminalId),
    #[error("terminal {0} is not live")]
    DeadTerminal(TerminalId),
    #[error("frame {0} is not live")]
    DeadFrame(FrameId),
}

impl FrameError {
    /// Machine-readable reason used on the wire.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoSuchFrame(_) => "no_such_frame",
            Self::NoSuchTerminal(_) => "no_such_terminal",
            Self::DeadTerminal(_) => "dead_terminal",
            Self::DeadFrame(_) => "dead_frame",
        }
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalId,
    kind: OutputKind,
    name: String,
    live: bool,
}

impl Terminal {
    pub fn id(&self) -> TerminalId {
        self.id
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    /// Display name for X11 terminals, device name for ttys.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

#[derive(Debug)]
pub struct Frame {
    id: FrameId,
    terminal: TerminalId,
    kind: OutputKind,
    live: bool,
    owner: Arc<OwnerWindow>,
}

impl Frame {
    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn terminal(&self) -> TerminalId {
        self.terminal
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// The window that owns selections on behalf of this frame.
    pub fn owner(&self) -> &Arc<OwnerWindow> {
        &self.owner
    }

    /// Live and on the X11 backend.
    pub fn can_select(&self) -> bool {
        self.live && self.kind == OutputKind::X11
    }
}

/// Terminals and frames in creation order.
///
/// Deleted entries are never removed, only marked dead, so both lists grow
/// by one entry per terminal or frame ever created. A frame costs a few
/// words plus an owner window whose payloads are detached when it dies.
#[derive(Debug, Default)]
pub struct FrameTable {
    terminals: Vec<Terminal>,
    frames: Vec<Frame>,
    selected: Option<FrameId>,
    next_terminal: u64,
    next_frame: u64,
}

impl FrameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new live terminal.
    pub fn add_terminal(&mut self, kind: OutputKind, name: impl Into<String>) -> TerminalId {
        let id = TerminalId(self.next_terminal);
        self.next_terminal += 1;
        self.terminals.push(Terminal {
            id,
            kind,
            name: name.into(),
            live: true,
        });
        id
    }

    /// Create a frame on `terminal`, backed by `owner`.
    ///
    /// The first frame created becomes the selected frame.
    pub fn make_frame(
        &mut self,
        terminal: TerminalId,
        owner: Arc<OwnerWindow>,
    ) -> Result<FrameId, FrameError> {
        let term = self
            .terminal(terminal)
            .ok_or(FrameError::NoSuchTerminal(terminal))?;
        if !term.live {
            return Err(FrameError::DeadTerminal(terminal));
        }
        let kind = term.kind;

        let id = FrameId(self.next_frame);
        self.next_frame += 1;
        self.frames.push(Frame {
            id,
            terminal,
            kind,
            live: true,
            owner,
        });
        if self.selected.is_none() {
            self.selected = Some(id);
        }
        Ok(id)
    }

    /// Mark a frame dead and return its owner window for disposal.
    ///
    /// If it was selected, the next live frame (in creation order) is
    /// selected instead.
    pub fn delete_frame(&mut self, id: FrameId) -> Result<Arc<OwnerWindow>, FrameError> {
        let frame = self
            .frames
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(FrameError::NoSuchFrame(id))?;
        if !frame.live {
            return Err(FrameError::DeadFrame(id));
        }
        frame.live = false;
        let owner = Arc::clone(&frame.owner);

        if self.selected == Some(id) {
            self.selected = self.frames.iter().find(|f| f.live).map(|f| f.id);
        }
        Ok(owner)
    }

    /// Make `id` the selected frame.
    pub fn select_frame(&mut self, id: FrameId) -> Result<(), FrameError> {
        let frame = self.frame(id).ok_or(FrameError::NoSuchFrame(id))?;
        if !frame.live {
            return Err(FrameError::DeadFrame(id));
        }
        self.selected = Some(id);
        Ok(())
    }

    pub fn selected(&self) -> Option<&Frame> {
        self.selected.and_then(|id| self.frame(id))
    }

    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.frames.iter().find(|f| f.id == id)
    }

    pub fn terminal(&self, id: TerminalId) -> Option<&Terminal> {
        self.terminals.iter().find(|t| t.id == id)
    }

    /// All frames, live or dead, in creation order.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// All terminals in creation order.
    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> {
        self.terminals.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(xid: u32) -> Arc<OwnerWindow> {
        Arc::new(OwnerWindow::new(xid))
    }

    #[test]
    fn first_frame_is_selected() {
        let mut t = FrameTable::new();
        let term = t.add_terminal(OutputKind::X11, ":0");
        let f1 = t.make_frame(term, window(1)).unwrap();
        let _f2 = t.make_frame(term, window(2)).unwrap();
        assert_eq!(t.selected().unwrap().id(), f1);
    }

    #[test]
    fn frame_inherits_terminal_kind() {
        let mut t = FrameTable::new();
        let tty = t.add_terminal(OutputKind::Tty, "/dev/tty");
        let f = t.make_frame(tty, Arc::new(OwnerWindow::windowless())).unwrap();
        assert_eq!(t.frame(f).unwrap().kind(), OutputKind::Tty);
        assert!(!t.frame(f).unwrap().can_select());
    }

    #[test]
    fn make_frame_on_unknown_terminal() {
        let mut t = FrameTable::new();
        let err = t.make_frame(TerminalId(9), window(1)).unwrap_err();
        assert!(matches!(err, FrameError::NoSuchTerminal(TerminalId(9))));
        assert_eq!(err.reason(), "no_such_terminal");
    }

    #[test]
    fn delete_selected_frame_moves_selection() {
        let mut t = FrameTable::new();
        let term = t.add_terminal(OutputKind::X11, ":0");
        let f1 = t.make_frame(term, window(1)).unwrap();
        let f2 = t.make_frame(term, window(2)).unwrap();

        let owner = t.delete_frame(f1).unwrap();
        assert_eq!(owner.xid(), 1);
        assert_eq!(t.selected().unwrap().id(), f2);
        assert!(!t.frame(f1).unwrap().is_live());
    }

    #[test]
    fn delete_frame_twice() {
        let mut t = FrameTable::new();
        let term = t.add_terminal(OutputKind::X11, ":0");
        let f = t.make_frame(term, window(1)).unwrap();
        t.delete_frame(f).unwrap();
        assert!(matches!(t.delete_frame(f), Err(FrameError::DeadFrame(_))));
        assert!(t.selected().is_none());
    }

    #[test]
    fn select_dead_frame_rejected() {
        let mut t = FrameTable::new();
        let term = t.add_terminal(OutputKind::X11, ":0");
        let f1 = t.make_frame(term, window(1)).unwrap();
        let f2 = t.make_frame(term, window(2)).unwrap();
        t.delete_frame(f2).unwrap();
        assert!(matches!(t.select_frame(f2), Err(FrameError::DeadFrame(_))));
        assert!(t.select_frame(f1).is_ok());
        assert!(matches!(
            t.select_frame(FrameId(42)),
            Err(FrameError::NoSuchFrame(_))
        ));
    }

    #[test]
    fn ids_are_never_reused() {
        let mut t = FrameTable::new();
        let term = t.add_terminal(OutputKind::X11, ":0");
        let f1 = t.make_frame(term, window(1)).unwrap();
        t.delete_frame(f1).unwrap();
        let f2 = t.make_frame(term, window(2)).unwrap();
        assert_ne!(f1, f2);
        assert_eq!(t.frames().count(), 2);
    }
}
