//! Selection daemon: frames, selection ownership, and request serving.
//!
//! Architecture: channel-based actor. A single daemon loop owns all
//! mutable state ([`state::DaemonState`]). Per-connection tasks forward
//! requests over an mpsc channel and wait for the response on a oneshot.
//! The same loop dispatches queued X11 events on a fixed tick, so supply
//! and loss callbacks never run concurrently with a request.

mod connection;
mod handler;
pub mod state;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

use connection::{ConnectionId, DaemonCommand};
use state::{DaemonConfig, DaemonState, StateError};

use crate::resolver::ResolverError;
use crate::resolver::x11::{X11Clipboard, X11Displays};
use crate::selection::{QuarkRegistry, SelectionManager, SentSelectionHooks};

/// Daemon startup/runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("$XDG_RUNTIME_DIR is not set")]
    NoRuntimeDir,
    #[error("daemon already running at {0}")]
    AlreadyRunning(PathBuf),
    #[error("failed to create directory {path}: {source}")]
    MkdirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to bind socket {path}: {source}")]
    BindFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error("display setup: {0}")]
    Setup(#[from] StateError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the daemon until SIGTERM or SIGINT.
///
/// Opens every configured display (or `$DISPLAY`), gives each a terminal
/// with one frame, and serves requests on the Unix socket. The socket file
/// is removed on shutdown.
///
/// # Errors
///
/// Returns `DaemonError` if a display cannot be opened, `$XDG_RUNTIME_DIR`
/// is unset, socket bind fails, or another daemon is already running.
pub async fn run(config: DaemonConfig) -> Result<(), DaemonError> {
    let displays = Arc::new(X11Displays::new());
    let mut opened = Vec::new();
    if config.displays.is_empty() {
        opened.push(displays.open(None)?);
    } else {
        for name in &config.displays {
            opened.push(displays.open(Some(name))?);
        }
    }

    // Selections live on the first display; the guard disables them
    // entirely once a second one is attached.
    let clipboard = Arc::new(X11Clipboard::new(
        Arc::clone(&opened[0]),
        config.request_timeout,
    ));
    let hooks = Arc::new(SentSelectionHooks::new());
    hooks.add(|slot, target, success| {
        tracing::debug!(%slot, %target, success, "selection sent");
    });
    let manager = SelectionManager::new(
        QuarkRegistry::initialize(),
        clipboard.clone(),
        displays.clone(),
        hooks,
    );

    let mut state = DaemonState::new(manager, displays);
    for shared in &opened {
        state.add_display(shared.name())?;
    }

    let socket_path = match &config.socket {
        Some(path) => path.clone(),
        None => resolve_socket_path()?,
    };
    let listener = bind_socket(&socket_path).await?;
    tracing::info!(path = %socket_path.display(), "daemon listening");

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
        }
    };

    serve(
        listener,
        state,
        Some(clipboard),
        config.pump_interval,
        shutdown,
    )
    .await;

    if let Err(e) = std::fs::remove_file(&socket_path) {
        tracing::warn!(error = %e, path = %socket_path.display(), "failed to remove socket");
    }
    tracing::info!("daemon stopped");
    Ok(())
}

/// The daemon loop: accept connections, handle requests one at a time,
/// and pump X11 events between them until `shutdown` resolves.
pub async fn serve(
    listener: UnixListener,
    mut state: DaemonState,
    pump: Option<Arc<X11Clipboard>>,
    pump_interval: Duration,
    shutdown: impl Future<Output = ()>,
) {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<DaemonCommand>();
    let mut ticker = tokio::time::interval(pump_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // -- New connection --
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let conn_id = ConnectionId::new();
                        connection::spawn_connection(stream, conn_id, cmd_tx.clone());
                        tracing::debug!(?conn_id, "accepted connection");
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                }
            }

            // -- Request from a connection task --
            Some(cmd) = cmd_rx.recv() => {
                tracing::trace!(conn_id = ?cmd.connection_id, request = ?cmd.request, "request");
                let response = handler::handle_message(&mut state, cmd.request);
                let _ = cmd.response_tx.send(response);
            }

            // -- Queued X11 events (foreign requests, ownership loss) --
            _ = ticker.tick(), if pump.is_some() => {
                if let Some(clipboard) = &pump
                    && let Err(e) = clipboard.dispatch_pending()
                {
                    tracing::error!(error = %e, "X11 event dispatch failed");
                }
            }

            () = &mut shutdown => break,
        }
    }
}

// -- Socket setup --

/// Resolve the daemon socket path from `$XDG_RUNTIME_DIR`.
pub fn resolve_socket_path() -> Result<PathBuf, DaemonError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").map_err(|_| DaemonError::NoRuntimeDir)?;
    Ok(PathBuf::from(runtime_dir)
        .join("selectiond")
        .join("daemon.sock"))
}

/// Create the socket directory and bind the Unix listener.
///
/// Handles stale socket detection: if EADDRINUSE, attempts to connect to
/// the existing socket. If the connection succeeds, another daemon is
/// running. If it fails, the socket is stale and is removed.
async fn bind_socket(path: &Path) -> Result<UnixListener, DaemonError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    if !parent.exists() {
        std::fs::create_dir_all(parent).map_err(|e| DaemonError::MkdirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700)).map_err(|e| {
            DaemonError::MkdirFailed {
                path: parent.to_path_buf(),
                source: e,
            }
        })?;
    }

    let bind_failed = |source| DaemonError::BindFailed {
        path: path.to_path_buf(),
        source,
    };
    match UnixListener::bind(path) {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            if UnixStream::connect(path).await.is_ok() {
                return Err(DaemonError::AlreadyRunning(path.to_path_buf()));
            }
            tracing::info!(path = %path.display(), "removing stale socket");
            std::fs::remove_file(path).map_err(bind_failed)?;
            UnixListener::bind(path).map_err(bind_failed)
        }
        Err(e) => Err(bind_failed(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use tokio::sync::oneshot;
    use tokio_util::codec::Framed;

    use crate::daemon::state::tests::memory_state;
    use crate::ipc::codec::{FrameCodec, LengthPrefixedCodec};
    use crate::ipc::protocol::{Message, PROTOCOL_VERSION, Status};
    use crate::selection::{SelectionSlot, SelectionValue, TargetType};

    /// Start a daemon over memory adapters on a temp socket. Dropping the
    /// returned sender shuts it down.
    async fn start_daemon(
        path: &Path,
    ) -> (
        oneshot::Sender<()>,
        Arc<crate::resolver::memory::MemoryClipboard>,
    ) {
        let listener = bind_socket(path).await.unwrap();
        let (state, clipboard, _) = memory_state();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        tokio::spawn(serve(
            listener,
            state,
            None,
            Duration::from_millis(10),
            async move {
                let _ = stop_rx.await;
            },
        ));
        (stop_tx, clipboard)
    }

    async fn connect(path: &Path) -> Framed<UnixStream, LengthPrefixedCodec> {
        let stream = UnixStream::connect(path).await.unwrap();
        Framed::new(stream, LengthPrefixedCodec::new())
    }

    async fn send_recv(
        framed: &mut Framed<UnixStream, LengthPrefixedCodec>,
        msg: Message,
    ) -> Message {
        framed.send(msg).await.unwrap();
        framed.next().await.unwrap().unwrap()
    }

    async fn handshake(framed: &mut Framed<UnixStream, LengthPrefixedCodec>) {
        let resp = send_recv(
            framed,
            Message::Hello {
                id: 0,
                version: PROTOCOL_VERSION,
            },
        )
        .await;
        assert!(matches!(
            resp,
            Message::HelloAck {
                status: Status::Ok,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn own_and_get_over_the_socket() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("daemon.sock");
        let (_stop, clipboard) = start_daemon(&sock).await;

        let mut client = connect(&sock).await;
        handshake(&mut client).await;

        let resp = send_recv(
            &mut client,
            Message::OwnSelection {
                id: 1,
                selection: "CLIPBOARD".into(),
                value: SelectionValue::Text(b"hello".to_vec()),
                frame: None,
            },
        )
        .await;
        assert!(matches!(
            resp,
            Message::Response {
                id: 1,
                status: Status::Ok,
                value: Some(_),
                ..
            }
        ));

        // Another client on the display asks for it.
        assert_eq!(
            clipboard.foreign_request(SelectionSlot::Clipboard, &TargetType::Utf8String),
            Some(b"hello".to_vec())
        );

        let resp = send_recv(
            &mut client,
            Message::GetSelection {
                id: 2,
                selection: "CLIPBOARD".into(),
                target_type: "TEXT".into(),
                time: None,
                terminal: None,
            },
        )
        .await;
        match resp {
            Message::Response { id, content, .. } => {
                assert_eq!(id, 2);
                assert_eq!(content.as_deref(), Some(&b"hello"[..]));
            }
            other => panic!("expected Response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn version_mismatch_closes_connection() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("daemon.sock");
        let (_stop, _) = start_daemon(&sock).await;

        let mut client = connect(&sock).await;
        let resp = send_recv(&mut client, Message::Hello { id: 0, version: 0 }).await;
        assert!(matches!(
            resp,
            Message::HelloAck {
                status: Status::Error,
                ..
            }
        ));
        assert!(client.next().await.is_none());
    }

    #[tokio::test]
    async fn unknown_type_keeps_connection_open() {
        #[derive(serde::Serialize)]
        struct Bogus {
            #[serde(rename = "type")]
            msg_type: &'static str,
            id: u32,
        }

        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("daemon.sock");
        let (_stop, _) = start_daemon(&sock).await;

        let stream = UnixStream::connect(&sock).await.unwrap();
        let mut raw = Framed::new(stream, FrameCodec::new());
        raw.send(Message::Hello {
            id: 0,
            version: PROTOCOL_VERSION,
        })
        .await
        .unwrap();
        raw.next().await.unwrap().unwrap();

        let payload = rmp_serde::to_vec_named(&Bogus {
            msg_type: "own_drag",
            id: 17,
        })
        .unwrap();
        let mut frame = bytes::BytesMut::new();
        bytes::BufMut::put_u32(&mut frame, payload.len() as u32);
        frame.extend_from_slice(&payload);
        tokio::io::AsyncWriteExt::write_all(raw.get_mut(), &frame)
            .await
            .unwrap();

        let reply = raw.next().await.unwrap().unwrap();
        let reply: Message = rmp_serde::from_slice(&reply).unwrap();
        assert_eq!(reply, Message::error(17, "unknown_type"));

        raw.send(Message::ListFrames { id: 18 }).await.unwrap();
        let reply: Message = rmp_serde::from_slice(&raw.next().await.unwrap().unwrap()).unwrap();
        assert!(matches!(reply, Message::Response { id: 18, frames: Some(_), .. }));
    }

    #[tokio::test]
    async fn second_daemon_on_live_socket_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("daemon.sock");
        let (_stop, _) = start_daemon(&sock).await;

        let err = bind_socket(&sock).await.unwrap_err();
        assert!(matches!(err, DaemonError::AlreadyRunning(_)));
    }

    #[tokio::test]
    async fn stale_socket_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("daemon.sock");
        drop(std::os::unix::net::UnixListener::bind(&sock).unwrap());
        assert!(sock.exists());

        assert!(bind_socket(&sock).await.is_ok());
    }
}
