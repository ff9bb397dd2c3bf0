//! Daemon state: frame table, selection manager, and configuration.
//!
//! Owned exclusively by the daemon loop. No concurrent access. Error
//! strings are the machine-readable reasons sent on the wire.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::frame::owner::NO_WINDOW;
use crate::frame::{
    FrameError, FrameId, FrameTable, FrameTarget, OutputKind, OwnerWindow, TerminalId,
};
use crate::ipc::protocol::FrameDescriptor;
use crate::resolver::{ResolverError, WindowProvider};
use crate::selection::{SelectionManager, SelectionSlot};

/// Name of the tty terminal every daemon starts with.
pub const INITIAL_TERMINAL: &str = "initial_terminal";

/// Daemon configuration, folded from the command line.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// X11 displays to open; `$DISPLAY` when empty.
    pub displays: Vec<String>,
    /// Upper bound on a blocking selection request.
    pub request_timeout: Duration,
    /// How often queued X11 events are dispatched between requests.
    pub pump_interval: Duration,
    /// Socket override; `$XDG_RUNTIME_DIR/selectiond/daemon.sock` when `None`.
    pub socket: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            displays: Vec::new(),
            request_timeout: Duration::from_millis(5000),
            pump_interval: Duration::from_millis(20),
            socket: None,
        }
    }
}

/// Errors from frame-management requests.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("owner window: {0}")]
    Window(#[from] ResolverError),
}

impl StateError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Frame(e) => e.reason(),
            Self::Window(_) => "window_failed",
        }
    }
}

pub struct DaemonState {
    pub frames: FrameTable,
    pub manager: SelectionManager,
    windows: Arc<dyn WindowProvider>,
}

impl DaemonState {
    /// Fresh state holding only the initial tty terminal and its frame.
    pub fn new(manager: SelectionManager, windows: Arc<dyn WindowProvider>) -> Self {
        let mut state = Self {
            frames: FrameTable::new(),
            manager,
            windows,
        };
        let tty = state.frames.add_terminal(OutputKind::Tty, INITIAL_TERMINAL);
        // A live tty terminal with a windowless owner cannot fail.
        if let Err(e) = state
            .frames
            .make_frame(tty, Arc::new(OwnerWindow::windowless()))
        {
            tracing::error!(error = %e, "initial frame creation failed");
        }
        state
    }

    /// Register an X11 display as a terminal and give it a first frame.
    pub fn add_display(&mut self, display_name: &str) -> Result<FrameId, StateError> {
        let terminal = self.frames.add_terminal(OutputKind::X11, display_name);
        let frame = self.make_frame(Some(terminal))?;
        tracing::info!(display = display_name, %terminal, %frame, "display attached");
        Ok(frame)
    }

    /// Create a frame on `terminal`, or on the first live X11 terminal
    /// (falling back to the initial tty) when `None`.
    pub fn make_frame(&mut self, terminal: Option<TerminalId>) -> Result<FrameId, StateError> {
        let id = terminal.unwrap_or_else(|| self.default_terminal());
        let term = self
            .frames
            .terminal(id)
            .ok_or(FrameError::NoSuchTerminal(id))?;
        if !term.is_live() {
            return Err(FrameError::DeadTerminal(id).into());
        }

        let owner = match term.kind() {
            OutputKind::X11 => self.windows.create_owner(term.name())?,
            OutputKind::Tty => Arc::new(OwnerWindow::windowless()),
        };
        let frame = self.frames.make_frame(id, owner)?;
        tracing::debug!(%frame, terminal = %id, "frame created");
        Ok(frame)
    }

    fn default_terminal(&self) -> TerminalId {
        let live = || self.frames.terminals().filter(|t| t.is_live());
        live()
            .find(|t| t.kind() == OutputKind::X11)
            .or_else(|| live().next())
            .map(|t| t.id())
            .unwrap_or(TerminalId(0))
    }

    /// Delete a frame, giving up any selections it owns first and
    /// destroying its owner window afterwards.
    pub fn delete_frame(&mut self, id: FrameId) -> Result<(), StateError> {
        let target = FrameTarget::Frame(id);
        for slot in SelectionSlot::ALL {
            if self.manager.selection_owner_p(&self.frames, slot, target) {
                self.manager
                    .disown_selection(&self.frames, slot, None, target);
            }
        }

        let owner = self.frames.delete_frame(id)?;
        if owner.xid() != NO_WINDOW {
            let display = self
                .frames
                .frame(id)
                .and_then(|f| self.frames.terminal(f.terminal()))
                .map(|t| t.name().to_string())
                .unwrap_or_default();
            self.windows.destroy_owner(&display, &owner);
        }
        tracing::debug!(frame = %id, "frame deleted");
        Ok(())
    }

    pub fn select_frame(&mut self, id: FrameId) -> Result<(), StateError> {
        self.frames.select_frame(id)?;
        Ok(())
    }

    /// All frames, dead ones included, in creation order.
    pub fn frame_descriptors(&self) -> Vec<FrameDescriptor> {
        let selected = self.frames.selected().map(|f| f.id());
        self.frames
            .frames()
            .map(|f| FrameDescriptor {
                frame: f.id().0,
                terminal: f.terminal().0,
                kind: f.kind().as_str().to_string(),
                display: self
                    .frames
                    .terminal(f.terminal())
                    .map(|t| t.name().to_string())
                    .unwrap_or_default(),
                live: f.is_live(),
                selected: selected == Some(f.id()),
                window: f.owner().xid(),
            })
            .collect()
    }
}
