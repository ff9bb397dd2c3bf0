//! X11 adapters for the resolver traits.
//!
//! [`X11Displays`] opens display connections and implements both
//! [`DisplayManager`] and [`WindowProvider`]. [`clipboard::X11Clipboard`]
//! implements the selection protocol on top of one of those connections.
//! Everything shares the `Arc<X11Shared>` created by [`X11Shared::connect`].

pub mod clipboard;

use std::sync::{Arc, Mutex, PoisonError};

use x11rb::COPY_DEPTH_FROM_PARENT;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    self, Atom, AtomEnum, CreateWindowAux, EventMask, Window, WindowClass,
};
use x11rb::rust_connection::RustConnection;

use crate::frame::OwnerWindow;
use crate::selection::{SelectionSlot, TargetType};

use super::{DisplayDescriptor, DisplayManager, ResolverError, WindowProvider};

pub use clipboard::X11Clipboard;

/// Property our conversion replies are delivered into.
const TRANSFER_PROPERTY: &[u8] = b"SELECTIOND_DATA";

/// Property appended to (with no data) to obtain a server timestamp.
const TIMESTAMP_PROPERTY: &[u8] = b"SELECTIOND_TIMESTAMP";

/// Pre-interned atoms for the selection protocol.
#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub clipboard: Atom,
    pub targets: Atom,
    pub multiple: Atom,
    pub utf8_string: Atom,
    pub text: Atom,
    pub string: Atom,
    pub plain_utf8: Atom,
    pub incr: Atom,
    pub transfer: Atom,
    pub timestamp: Atom,
}

/// One open display connection.
pub struct X11Shared {
    pub conn: Arc<RustConnection>,
    #[allow(dead_code)]
    pub screen_num: usize,
    /// Root window of the default screen.
    pub root: Window,
    pub atoms: Atoms,
    name: String,
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom, ResolverError> {
    Ok(xproto::intern_atom(conn, false, name)
        .map_err(|e| ResolverError::Display(format!("intern_atom: {e}")))?
        .reply()
        .map_err(|e| ResolverError::Display(format!("intern_atom reply: {e}")))?
        .atom)
}

impl X11Shared {
    /// Connect to `display` (or `$DISPLAY` when `None`) and intern the
    /// selection atoms.
    pub fn connect(display: Option<&str>) -> Result<Self, ResolverError> {
        let (conn, screen_num) = RustConnection::connect(display)
            .map_err(|e| ResolverError::Display(format!("X11 connect failed: {e}")))?;

        let root = conn.setup().roots[screen_num].root;

        let atoms = Atoms {
            clipboard: intern(&conn, b"CLIPBOARD")?,
            targets: intern(&conn, b"TARGETS")?,
            multiple: intern(&conn, b"MULTIPLE")?,
            utf8_string: intern(&conn, b"UTF8_STRING")?,
            text: intern(&conn, b"TEXT")?,
            string: AtomEnum::STRING.into(),
            plain_utf8: intern(&conn, b"text/plain;charset=utf-8")?,
            incr: intern(&conn, b"INCR")?,
            transfer: intern(&conn, TRANSFER_PROPERTY)?,
            timestamp: intern(&conn, TIMESTAMP_PROPERTY)?,
        };

        let name = display
            .map(str::to_owned)
            .or_else(|| std::env::var("DISPLAY").ok())
            .unwrap_or_default();
        tracing::debug!(display = %name, screen_num, root, "X11 display opened");

        Ok(Self {
            conn: Arc::new(conn),
            screen_num,
            root,
            atoms,
            name,
        })
    }

    /// The display name this connection was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slot_atom(&self, slot: SelectionSlot) -> Atom {
        match slot {
            SelectionSlot::Primary => AtomEnum::PRIMARY.into(),
            SelectionSlot::Secondary => AtomEnum::SECONDARY.into(),
            SelectionSlot::Clipboard => self.atoms.clipboard,
        }
    }

    pub fn slot_for_atom(&self, atom: Atom) -> Option<SelectionSlot> {
        SelectionSlot::ALL
            .into_iter()
            .find(|&slot| self.slot_atom(slot) == atom)
    }

    /// Atom for one of the known targets. `Other` targets are never
    /// advertised or served.
    pub fn target_atom(&self, target: &TargetType) -> Option<Atom> {
        let a = &self.atoms;
        match target {
            TargetType::Text => Some(a.text),
            TargetType::Utf8String => Some(a.utf8_string),
            TargetType::String => Some(a.string),
            TargetType::PlainUtf8 => Some(a.plain_utf8),
            TargetType::Multiple => Some(a.multiple),
            TargetType::Other(_) => None,
        }
    }

    pub fn target_for_atom(&self, atom: Atom) -> Option<TargetType> {
        let a = &self.atoms;
        match atom {
            _ if atom == a.text => Some(TargetType::Text),
            _ if atom == a.utf8_string => Some(TargetType::Utf8String),
            _ if atom == a.string => Some(TargetType::String),
            _ if atom == a.plain_utf8 => Some(TargetType::PlainUtf8),
            _ if atom == a.multiple => Some(TargetType::Multiple),
            _ => None,
        }
    }

    /// Create an unmapped input-only window to own and request selections.
    pub fn create_owner_window(&self) -> Result<Window, ResolverError> {
        let window = self
            .conn
            .generate_id()
            .map_err(|e| ResolverError::Window(format!("generate_id: {e}")))?;

        xproto::create_window(
            &*self.conn,
            COPY_DEPTH_FROM_PARENT,
            window,
            self.root,
            0,
            0,
            1,
            1,
            0,
            WindowClass::INPUT_ONLY,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )
        .map_err(|e| ResolverError::Window(format!("create_window send: {e}")))?
        .check()
        .map_err(|e| ResolverError::Window(format!("create_window: {e}")))?;

        tracing::debug!(display = %self.name, window, "owner window created");
        Ok(window)
    }

    /// Destroy a window. Best-effort; errors are logged.
    pub fn destroy_window(&self, window: Window) {
        if let Err(e) = xproto::destroy_window(&*self.conn, window) {
            tracing::debug!(window, error = %e, "destroy_window failed");
        }
        if let Err(e) = self.conn.flush() {
            tracing::debug!(error = %e, "flush after destroy_window failed");
        }
    }
}

/// The set of displays this process has open.
#[derive(Default)]
pub struct X11Displays {
    open: Mutex<Vec<Arc<X11Shared>>>,
}

impl X11Displays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection to `display` and add it to the set.
    pub fn open(&self, display: Option<&str>) -> Result<Arc<X11Shared>, ResolverError> {
        let shared = Arc::new(X11Shared::connect(display)?);
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&shared));
        Ok(shared)
    }

    fn find(&self, display: &str) -> Option<Arc<X11Shared>> {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|d| d.name() == display)
            .cloned()
    }
}

impl DisplayManager for X11Displays {
    fn list_displays(&self) -> Vec<DisplayDescriptor> {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|d| DisplayDescriptor {
                name: d.name().to_string(),
            })
            .collect()
    }
}

impl WindowProvider for X11Displays {
    fn create_owner(&self, display: &str) -> Result<Arc<OwnerWindow>, ResolverError> {
        let shared = self
            .find(display)
            .ok_or_else(|| ResolverError::Display(format!("display {display:?} is not open")))?;
        let window = shared.create_owner_window()?;
        Ok(Arc::new(OwnerWindow::new(window)))
    }

    fn destroy_owner(&self, display_name: &str, owner: &OwnerWindow) {
        match self.find(display_name) {
            Some(shared) => shared.destroy_window(owner.xid()),
            None => tracing::debug!(display = display_name, "destroy_owner: display not open"),
        }
    }
}
