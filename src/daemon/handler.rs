//! Message dispatch and request handling.
//!
//! Pure dispatch: each handler takes the [`DaemonState`] and returns the
//! response message. The only side effects are the selection manager's
//! calls into the clipboard service.

use std::str::FromStr;

use crate::frame::{FrameId, FrameTarget, TerminalId};
use crate::ipc::protocol::{Message, PROTOCOL_VERSION, Status, TargetRef};
use crate::selection::{SelectionSlot, SelectionValue, TargetType};

use super::state::DaemonState;

/// Dispatch a request message to the appropriate handler.
///
/// Server-originated variants sent by a client get `unknown_type`.
pub fn handle_message(state: &mut DaemonState, request: Message) -> Message {
    match request {
        Message::Hello { id, version } => handle_hello(id, version),

        // -- Selection entry points --
        Message::OwnSelection {
            id,
            selection,
            value,
            frame,
        } => handle_own(state, id, &selection, value, frame.map(FrameId)),
        Message::DisownSelection {
            id,
            selection,
            time,
            terminal,
        } => with_slot(id, &selection, |slot| {
            let done = state
                .manager
                .disown_selection(&state.frames, slot, time, frame_target(terminal));
            Message::flag(id, done)
        }),
        Message::SelectionExists {
            id,
            selection,
            terminal,
        } => with_slot(id, &selection, |slot| {
            let exists =
                state
                    .manager
                    .selection_exists_p(&state.frames, slot, frame_target(terminal));
            Message::flag(id, exists)
        }),
        Message::SelectionOwner {
            id,
            selection,
            terminal,
        } => with_slot(id, &selection, |slot| {
            let owned =
                state
                    .manager
                    .selection_owner_p(&state.frames, slot, frame_target(terminal));
            Message::flag(id, owned)
        }),
        Message::GetSelection {
            id,
            selection,
            target_type,
            time,
            terminal,
        } => with_slot(id, &selection, |slot| {
            handle_get(state, id, slot, &target_type, time, frame_target(terminal))
        }),

        // -- Frame management --
        Message::ListFrames { id } => {
            let mut response = Message::ok(id);
            if let Message::Response { frames, .. } = &mut response {
                *frames = Some(state.frame_descriptors());
            }
            response
        }
        Message::MakeFrame { id, terminal } => {
            match state.make_frame(terminal.map(TerminalId)) {
                Ok(frame_id) => {
                    let mut response = Message::ok(id);
                    if let Message::Response { frame, .. } = &mut response {
                        *frame = Some(frame_id.0);
                    }
                    response
                }
                Err(e) => {
                    tracing::debug!(error = %e, "make_frame failed");
                    Message::error(id, e.reason())
                }
            }
        }
        Message::DeleteFrame { id, frame } => match state.delete_frame(FrameId(frame)) {
            Ok(()) => Message::ok(id),
            Err(e) => Message::error(id, e.reason()),
        },
        Message::SelectFrame { id, frame } => match state.select_frame(FrameId(frame)) {
            Ok(()) => Message::ok(id),
            Err(e) => Message::error(id, e.reason()),
        },

        // Server-originated messages should never be sent by clients.
        Message::HelloAck { id, .. } | Message::Response { id, .. } => {
            Message::error(id, "unknown_type")
        }
    }
}

fn handle_hello(id: u32, version: u32) -> Message {
    // hello and hello_ack always carry id 0.
    if id != 0 {
        return Message::HelloAck {
            id: 0,
            status: Status::Error,
            error: Some("invalid_hello_id".into()),
        };
    }
    if version != PROTOCOL_VERSION {
        return Message::HelloAck {
            id: 0,
            status: Status::Error,
            error: Some("version_mismatch".into()),
        };
    }
    Message::HelloAck {
        id: 0,
        status: Status::Ok,
        error: None,
    }
}

fn handle_own(
    state: &mut DaemonState,
    id: u32,
    selection: &str,
    value: SelectionValue,
    frame: Option<FrameId>,
) -> Message {
    with_slot(id, selection, |slot| {
        match state
            .manager
            .own_selection(&state.frames, slot, value, frame)
        {
            Ok(echoed) => {
                let mut response = Message::ok(id);
                if let Message::Response { value, .. } = &mut response {
                    *value = echoed;
                }
                response
            }
            Err(e) => Message::error(id, e.reason()),
        }
    })
}

fn handle_get(
    state: &DaemonState,
    id: u32,
    slot: SelectionSlot,
    target_type: &str,
    time: Option<u32>,
    target: FrameTarget,
) -> Message {
    let target_type = TargetType::from(target_type);
    match state
        .manager
        .get_selection(&state.frames, slot, &target_type, time, target)
    {
        Ok(found) => {
            let mut response = Message::ok(id);
            if let (
                Some(selection),
                Message::Response {
                    content, format, ..
                },
            ) = (found, &mut response)
            {
                *format = Some(selection.format.as_str().to_string());
                *content = Some(selection.data);
            }
            response
        }
        Err(e) => Message::error(id, e.reason()),
    }
}

/// Validate the slot name, then run `f`; `invalid_slot` otherwise.
fn with_slot(id: u32, selection: &str, f: impl FnOnce(SelectionSlot) -> Message) -> Message {
    match SelectionSlot::from_str(selection) {
        Ok(slot) => f(slot),
        Err(e) => {
            tracing::debug!(error = %e, "rejected request");
            Message::error(id, e.reason())
        }
    }
}

fn frame_target(terminal: Option<TargetRef>) -> FrameTarget {
    match terminal {
        None => FrameTarget::Absent,
        Some(TargetRef::Frame(id)) => FrameTarget::Frame(FrameId(id)),
        Some(TargetRef::Terminal(id)) => FrameTarget::Terminal(TerminalId(id)),
    }
}
