//! CLI client for daemon operations.
//!
//! One-shot commands that connect to the daemon, perform a single
//! request, print the result, and exit. Covers the five selection entry
//! points and frame management.

mod daemon_client;
mod format;

use std::io::Read;
use std::path::PathBuf;

use crate::cli::ClientAction;
use crate::selection::SelectionValue;
use daemon_client::DaemonClient;

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("daemon: {0}")]
    Daemon(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the client command against the daemon at `socket`.
///
/// Called from `main.rs` for `Command::Client`.
pub async fn run(socket: PathBuf, action: ClientAction) -> Result<(), ClientError> {
    // Stdin is drained before connecting.
    let piped = match &action {
        ClientAction::Own {
            text: None,
            opaque: None,
            ..
        } => Some(read_piped(std::io::stdin().lock())?),
        _ => None,
    };
    let mut daemon = DaemonClient::connect(&socket).await?;

    match action {
        ClientAction::Own {
            selection,
            text,
            opaque,
            frame,
        } => {
            let value = selection_value(text, opaque, piped);
            let echoed = daemon.own(&selection, value, frame).await?;
            format::print_own(&selection, echoed.as_ref());
        }
        ClientAction::Disown {
            selection,
            time,
            target,
        } => {
            let done = daemon.disown(&selection, time, target.target()).await?;
            format::print_flag(done);
        }
        ClientAction::Exists { selection, target } => {
            let exists = daemon.exists(&selection, target.target()).await?;
            format::print_flag(exists);
        }
        ClientAction::Owner { selection, target } => {
            let owned = daemon.owner(&selection, target.target()).await?;
            format::print_flag(owned);
        }
        ClientAction::Get {
            selection,
            target_type,
            time,
            target,
        } => {
            let fetched = daemon
                .get(&selection, &target_type, time, target.target())
                .await?;
            format::print_selection(fetched.as_ref())?;
        }
        ClientAction::Frames => {
            let frames = daemon.list_frames().await?;
            format::print_frames(&frames);
        }
        ClientAction::MakeFrame { terminal } => {
            let frame = daemon.make_frame(terminal).await?;
            println!("Created F{frame}");
        }
        ClientAction::DeleteFrame { frame } => {
            daemon.delete_frame(frame).await?;
            println!("Deleted F{frame}");
        }
        ClientAction::SelectFrame { frame } => {
            daemon.select_frame(frame).await?;
            println!("Selected F{frame}");
        }
    }

    Ok(())
}

/// Read all of `input` as raw bytes. Selection text need not be UTF-8.
fn read_piped(mut input: impl Read) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// `piped` is used only when neither text nor an opaque kind was given.
fn selection_value(
    text: Option<String>,
    opaque: Option<String>,
    piped: Option<Vec<u8>>,
) -> SelectionValue {
    match (opaque, text) {
        (Some(kind), _) => SelectionValue::Opaque(kind),
        (None, Some(text)) => SelectionValue::Text(text.into_bytes()),
        (None, None) => SelectionValue::Text(piped.unwrap_or_default()),
    }
}
