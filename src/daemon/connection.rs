//! Per-connection task: framed I/O, handshake, command forwarding.
//!
//! Each client connection spawns a tokio task that:
//! 1. Wraps the socket in a length-prefixed MessagePack codec.
//! 2. Reads the first message (must be `Hello`) and forwards it to the
//!    daemon loop for handshake validation.
//! 3. Forwards each further request to the daemon loop and writes back
//!    the response, in order.

use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Framed;

use crate::ipc::codec::{CodecError, DecodeResult, FrameCodec, decode_frame};
use crate::ipc::protocol::{Message, Status};

/// Identifier of a client connection, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Command sent from a connection task to the daemon loop.
#[derive(Debug)]
pub struct DaemonCommand {
    pub request: Message,
    pub response_tx: oneshot::Sender<Message>,
    pub connection_id: ConnectionId,
}

#[derive(Debug, thiserror::Error)]
enum ConnectionError {
    #[error("unexpected EOF during handshake")]
    HandshakeEof,
    #[error("first message must be Hello")]
    NotHello,
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] rmp_serde::decode::Error),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("daemon loop closed")]
    DaemonGone,
    #[error("response channel closed")]
    ResponseDropped,
}

/// Spawn a connection handler task.
///
/// The task runs until the client disconnects or a protocol error occurs.
pub fn spawn_connection(
    stream: UnixStream,
    conn_id: ConnectionId,
    cmd_tx: mpsc::UnboundedSender<DaemonCommand>,
) {
    tokio::spawn(async move {
        match handle_connection(stream, conn_id, cmd_tx).await {
            Ok(()) => tracing::debug!(?conn_id, "connection closed"),
            Err(e) => tracing::debug!(?conn_id, error = %e, "connection dropped"),
        }
    });
}

async fn handle_connection(
    stream: UnixStream,
    conn_id: ConnectionId,
    cmd_tx: mpsc::UnboundedSender<DaemonCommand>,
) -> Result<(), ConnectionError> {
    let mut framed = Framed::new(stream, FrameCodec::new());

    // -- Handshake: first message must be Hello --
    let first_frame = framed
        .next()
        .await
        .ok_or(ConnectionError::HandshakeEof)??;

    let first_msg = match decode_frame(&first_frame) {
        DecodeResult::Ok(msg @ Message::Hello { .. }) => msg,
        DecodeResult::Ok(_) | DecodeResult::UnknownType(_) => {
            return Err(ConnectionError::NotHello);
        }
        DecodeResult::Malformed(e) => return Err(ConnectionError::MalformedFrame(e)),
    };

    let response = send_command(&cmd_tx, first_msg, conn_id).await?;
    let rejected = matches!(
        response,
        Message::HelloAck {
            status: Status::Error,
            ..
        }
    );
    framed.send(response).await?;
    if rejected {
        return Ok(());
    }

    // -- Main loop: one response per request, in order --
    while let Some(frame) = framed.next().await {
        let raw = frame?;
        let response = match decode_frame(&raw) {
            DecodeResult::Ok(msg) => send_command(&cmd_tx, msg, conn_id).await?,
            // Unknown type: echo the id, keep the connection open.
            DecodeResult::UnknownType(envelope) => Message::error(envelope.id, "unknown_type"),
            DecodeResult::Malformed(e) => return Err(ConnectionError::MalformedFrame(e)),
        };
        framed.send(response).await?;
    }
    Ok(())
}

/// Send a command to the daemon loop and wait for the response.
async fn send_command(
    cmd_tx: &mpsc::UnboundedSender<DaemonCommand>,
    request: Message,
    conn_id: ConnectionId,
) -> Result<Message, ConnectionError> {
    let (response_tx, response_rx) = oneshot::channel();
    cmd_tx
        .send(DaemonCommand {
            request,
            response_tx,
            connection_id: conn_id,
        })
        .map_err(|_| ConnectionError::DaemonGone)?;
    response_rx
        .await
        .map_err(|_| ConnectionError::ResponseDropped)
}
