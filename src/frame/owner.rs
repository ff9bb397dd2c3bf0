//! Owner windows: the concrete window object a selection is attached to.
//!
//! Payloads hang off the window under a (data, size) quark pair, like
//! object data on a toolkit widget. Both halves of a pair are written and
//! removed under a single lock, so no reader ever sees one without the
//! other.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::selection::quark::{Quark, SlotQuarks};

/// Window id used for owners that have no windowing-system window (tty
/// frames).
pub const NO_WINDOW: u32 = 0;

#[derive(Debug)]
enum QData {
    Bytes(Box<[u8]>),
    Size(usize),
}

/// A window that can own selections and receive conversion replies.
#[derive(Debug)]
pub struct OwnerWindow {
    xid: u32,
    qdata: Mutex<HashMap<Quark, QData>>,
}

impl OwnerWindow {
    pub fn new(xid: u32) -> Self {
        Self {
            xid,
            qdata: Mutex::new(HashMap::new()),
        }
    }

    /// Owner for a frame without a window-system window.
    pub fn windowless() -> Self {
        Self::new(NO_WINDOW)
    }

    /// Windowing-system id of this window.
    pub fn xid(&self) -> u32 {
        self.xid
    }

    /// Attach a copy of `bytes` under `keys`, replacing any previous
    /// payload for that pair.
    pub fn attach(&self, keys: SlotQuarks, bytes: &[u8]) {
        let buffer: Box<[u8]> = bytes.into();
        let size = buffer.len();
        let mut qdata = self.qdata.lock().unwrap_or_else(PoisonError::into_inner);
        qdata.insert(keys.data, QData::Bytes(buffer));
        qdata.insert(keys.size, QData::Size(size));
    }

    /// Remove the payload under `keys`. Returns whether one was attached.
    pub fn detach(&self, keys: SlotQuarks) -> bool {
        let mut qdata = self.qdata.lock().unwrap_or_else(PoisonError::into_inner);
        let had_data = qdata.remove(&keys.data).is_some();
        qdata.remove(&keys.size);
        had_data
    }

    /// Copy of the payload under `keys`, trimmed to the stored size.
    ///
    /// `None` if either half of the pair is missing.
    pub fn payload(&self, keys: SlotQuarks) -> Option<Vec<u8>> {
        let qdata = self.qdata.lock().unwrap_or_else(PoisonError::into_inner);
        let bytes = match qdata.get(&keys.data)? {
            QData::Bytes(bytes) => bytes,
            QData::Size(_) => return None,
        };
        let size = match qdata.get(&keys.size)? {
            QData::Size(size) => *size,
            QData::Bytes(_) => return None,
        };
        Some(bytes[..size.min(bytes.len())].to_vec())
    }

    /// Whether a payload is attached under the data key of `keys`.
    pub fn has_payload(&self, keys: SlotQuarks) -> bool {
        self.qdata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&keys.data)
    }
}
