//! Daemon connection for the CLI client.
//!
//! Connects, performs the handshake, and offers one method per request.
//! Each CLI invocation performs a single request-response cycle, so there
//! is no split sink/stream.

use std::path::Path;

use futures::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio_util::codec::Framed;

use crate::ipc::codec::LengthPrefixedCodec;
use crate::ipc::protocol::{
    FrameDescriptor, Message, PROTOCOL_VERSION, Status, TargetRef,
};
use crate::selection::SelectionValue;

use super::ClientError;

/// Text fetched from a selection, with the format it arrived in.
#[derive(Debug)]
pub struct Fetched {
    pub content: Vec<u8>,
    pub format: String,
}

pub struct DaemonClient {
    framed: Framed<UnixStream, LengthPrefixedCodec>,
    next_id: u32,
}

impl DaemonClient {
    /// Connect to the daemon at `socket_path` and perform the handshake.
    pub async fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path).await.map_err(|e| {
            ClientError::Daemon(format!("connect {}: {e}", socket_path.display()))
        })?;
        let mut framed = Framed::new(stream, LengthPrefixedCodec::new());

        framed
            .send(Message::Hello {
                id: 0,
                version: PROTOCOL_VERSION,
            })
            .await
            .map_err(|e| ClientError::Daemon(format!("send hello: {e}")))?;

        match framed.next().await {
            Some(Ok(Message::HelloAck {
                status: Status::Ok, ..
            })) => {}
            Some(Ok(Message::HelloAck {
                status: Status::Error,
                error,
                ..
            })) => {
                return Err(ClientError::Daemon(format!(
                    "handshake rejected: {}",
                    error.unwrap_or_default()
                )));
            }
            other => {
                return Err(ClientError::Daemon(format!(
                    "unexpected handshake response: {other:?}"
                )));
            }
        }

        Ok(Self {
            framed,
            next_id: 1, // 0 = Hello
        })
    }

    /// Send one request and return the successful response.
    ///
    /// Error responses become `ClientError::Daemon` carrying the reason.
    async fn request(
        &mut self,
        what: &str,
        build: impl FnOnce(u32) -> Message,
    ) -> Result<Message, ClientError> {
        let id = self.next_id;
        self.next_id += 1;

        self.framed
            .send(build(id))
            .await
            .map_err(|e| ClientError::Daemon(format!("send {what}: {e}")))?;

        match self.framed.next().await {
            Some(Ok(
                response @ Message::Response {
                    status: Status::Ok, ..
                },
            )) => Ok(response),
            Some(Ok(Message::Response { error, .. })) => Err(ClientError::Daemon(format!(
                "{what} failed: {}",
                error.unwrap_or_default()
            ))),
            other => Err(ClientError::Daemon(format!(
                "unexpected {what} response: {other:?}"
            ))),
        }
    }

    async fn flag(
        &mut self,
        what: &str,
        build: impl FnOnce(u32) -> Message,
    ) -> Result<bool, ClientError> {
        let response = self.request(what, build).await?;
        Ok(matches!(
            response,
            Message::Response {
                flag: Some(true),
                ..
            }
        ))
    }

    /// Returns the echoed value, `None` when selections are disabled.
    pub async fn own(
        &mut self,
        selection: &str,
        value: SelectionValue,
        frame: Option<u64>,
    ) -> Result<Option<SelectionValue>, ClientError> {
        let response = self
            .request("own_selection", |id| Message::OwnSelection {
                id,
                selection: selection.to_string(),
                value,
                frame,
            })
            .await?;
        match response {
            Message::Response { value, .. } => Ok(value),
            _ => Ok(None),
        }
    }

    pub async fn disown(
        &mut self,
        selection: &str,
        time: Option<u32>,
        terminal: Option<TargetRef>,
    ) -> Result<bool, ClientError> {
        self.flag("disown_selection", |id| Message::DisownSelection {
            id,
            selection: selection.to_string(),
            time,
            terminal,
        })
        .await
    }

    pub async fn exists(
        &mut self,
        selection: &str,
        terminal: Option<TargetRef>,
    ) -> Result<bool, ClientError> {
        self.flag("selection_exists", |id| Message::SelectionExists {
            id,
            selection: selection.to_string(),
            terminal,
        })
        .await
    }

    pub async fn owner(
        &mut self,
        selection: &str,
        terminal: Option<TargetRef>,
    ) -> Result<bool, ClientError> {
        self.flag("selection_owner", |id| Message::SelectionOwner {
            id,
            selection: selection.to_string(),
            terminal,
        })
        .await
    }

    pub async fn get(
        &mut self,
        selection: &str,
        target_type: &str,
        time: Option<u32>,
        terminal: Option<TargetRef>,
    ) -> Result<Option<Fetched>, ClientError> {
        let response = self
            .request("get_selection", |id| Message::GetSelection {
                id,
                selection: selection.to_string(),
                target_type: target_type.to_string(),
                time,
                terminal,
            })
            .await?;
        match response {
            Message::Response {
                content: Some(content),
                format,
                ..
            } => Ok(Some(Fetched {
                content,
                format: format.unwrap_or_default(),
            })),
            _ => Ok(None),
        }
    }

    pub async fn list_frames(&mut self) -> Result<Vec<FrameDescriptor>, ClientError> {
        match self
            .request("list_frames", |id| Message::ListFrames { id })
            .await?
        {
            Message::Response { frames, .. } => Ok(frames.unwrap_or_default()),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn make_frame(&mut self, terminal: Option<u64>) -> Result<u64, ClientError> {
        match self
            .request("make_frame", |id| Message::MakeFrame { id, terminal })
            .await?
        {
            Message::Response {
                frame: Some(frame), ..
            } => Ok(frame),
            other => Err(ClientError::Daemon(format!(
                "make_frame returned no frame: {other:?}"
            ))),
        }
    }

    pub async fn delete_frame(&mut self, frame: u64) -> Result<(), ClientError> {
        self.request("delete_frame", |id| Message::DeleteFrame { id, frame })
            .await?;
        Ok(())
    }

    pub async fn select_frame(&mut self, frame: u64) -> Result<(), ClientError> {
        self.request("select_frame", |id| Message::SelectFrame { id, frame })
            .await?;
        Ok(())
    }
}
