//! Wire protocol message types for daemon IPC.
//!
//! All messages are MessagePack-encoded maps with at minimum `type` and `id`
//! fields. Selection slots and target formats travel as their atom names
//! and are validated by the daemon.

use serde::{Deserialize, Serialize};

use crate::selection::SelectionValue;

/// All wire protocol messages.
///
/// Serialized as a tagged union on the `type` field via MessagePack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Message {
    // -- Handshake --
    #[serde(rename = "hello")]
    Hello { id: u32, version: u32 },

    #[serde(rename = "hello_ack")]
    HelloAck {
        id: u32,
        status: Status,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    // -- Selection entry points --
    #[serde(rename = "own_selection")]
    OwnSelection {
        id: u32,
        selection: String,
        value: SelectionValue,
        /// Owning frame; the selected frame when absent.
        #[serde(default)]
        frame: Option<u64>,
    },

    #[serde(rename = "disown_selection")]
    DisownSelection {
        id: u32,
        selection: String,
        /// Server timestamp to clear at; "now" when absent.
        #[serde(default)]
        time: Option<u32>,
        #[serde(default)]
        terminal: Option<TargetRef>,
    },

    #[serde(rename = "selection_exists")]
    SelectionExists {
        id: u32,
        selection: String,
        #[serde(default)]
        terminal: Option<TargetRef>,
    },

    #[serde(rename = "selection_owner")]
    SelectionOwner {
        id: u32,
        selection: String,
        #[serde(default)]
        terminal: Option<TargetRef>,
    },

    #[serde(rename = "get_selection")]
    GetSelection {
        id: u32,
        selection: String,
        target_type: String,
        #[serde(default)]
        time: Option<u32>,
        #[serde(default)]
        terminal: Option<TargetRef>,
    },

    // -- Frame management --
    #[serde(rename = "list_frames")]
    ListFrames { id: u32 },

    #[serde(rename = "make_frame")]
    MakeFrame {
        id: u32,
        /// Terminal to create the frame on; the first live X11 terminal
        /// when absent.
        #[serde(default)]
        terminal: Option<u64>,
    },

    #[serde(rename = "delete_frame")]
    DeleteFrame { id: u32, frame: u64 },

    #[serde(rename = "select_frame")]
    SelectFrame { id: u32, frame: u64 },

    // -- Generic response --
    #[serde(rename = "response")]
    Response {
        id: u32,
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Echoed value of a successful `own_selection`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<SelectionValue>,
        /// Boolean result of disown / exists / owner queries.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flag: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none", with = "serde_bytes")]
        content: Option<Vec<u8>>,
        /// Format `content` arrived in.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frames: Option<Vec<FrameDescriptor>>,
        /// Id of a newly created frame.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame: Option<u64>,
    },
}

/// Frame or terminal a selection request is made for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetRef {
    Frame(u64),
    Terminal(u64),
}

/// Response status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Frame descriptor returned in list_frames responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub frame: u64,
    pub terminal: u64,
    /// `x11` or `tty`.
    pub kind: String,
    /// Display or device name of the terminal.
    pub display: String,
    pub live: bool,
    pub selected: bool,
    /// Owner window id; 0 for windowless frames.
    pub window: u32,
}

pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum payload size (16 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Minimal envelope for extracting `{type, id}` from unknown messages.
///
/// Used by the daemon as a fallback when [`Message`] deserialization
/// fails (e.g., unknown `type` tag), so the error response can still echo
/// the request `id`.
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    /// Consumed by serde for structural matching; not read by daemon code.
    #[serde(rename = "type")]
    #[allow(dead_code)]
    pub msg_type: String,
    pub id: u32,
}

impl Message {
    /// A bare success response; callers fill in the payload field.
    pub fn ok(id: u32) -> Self {
        Self::Response {
            id,
            status: Status::Ok,
            error: None,
            value: None,
            flag: None,
            content: None,
            format: None,
            frames: None,
            frame: None,
        }
    }

    pub fn error(id: u32, reason: &str) -> Self {
        Self::Response {
            id,
            status: Status::Error,
            error: Some(reason.into()),
            value: None,
            flag: None,
            content: None,
            format: None,
            frames: None,
            frame: None,
        }
    }

    pub fn flag(id: u32, flag: bool) -> Self {
        let mut msg = Self::ok(id);
        if let Self::Response { flag: f, .. } = &mut msg {
            *f = Some(flag);
        }
        msg
    }
}
