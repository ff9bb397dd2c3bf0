use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::ipc::protocol::TargetRef;

#[derive(Parser)]
#[command(name = "selectiond", about = "X11 selection ownership daemon")]
pub struct Cli {
    /// Daemon socket (default: $XDG_RUNTIME_DIR/selectiond/daemon.sock)
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the selection daemon
    Daemon {
        /// X11 display to open; repeat for more (default: $DISPLAY)
        #[arg(long = "display")]
        displays: Vec<String>,

        /// Give up on a selection request after this many milliseconds
        #[arg(long, default_value_t = 5000)]
        request_timeout_ms: u64,

        /// Dispatch queued X11 events this often, in milliseconds
        #[arg(long, default_value_t = 20)]
        pump_interval_ms: u64,
    },

    /// One-shot commands against a running daemon
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },
}

/// Which frame a selection command acts for; the selected frame when
/// neither is given.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct TargetArgs {
    /// Act for this frame
    #[arg(long, conflicts_with = "terminal")]
    pub frame: Option<u64>,

    /// Act for the first live frame of this terminal
    #[arg(long)]
    pub terminal: Option<u64>,
}

impl TargetArgs {
    pub fn target(self) -> Option<TargetRef> {
        match (self.frame, self.terminal) {
            (Some(frame), _) => Some(TargetRef::Frame(frame)),
            (None, Some(terminal)) => Some(TargetRef::Terminal(terminal)),
            (None, None) => None,
        }
    }
}

#[derive(Subcommand)]
pub enum ClientAction {
    /// Assert a selection (text from the argument, or stdin)
    Own {
        /// PRIMARY, SECONDARY or CLIPBOARD
        selection: String,

        /// Text to own; read from stdin when omitted
        text: Option<String>,

        /// Assert a non-text value of this kind instead (echoed, never served)
        #[arg(long, conflicts_with = "text")]
        opaque: Option<String>,

        /// Owning frame
        #[arg(long)]
        frame: Option<u64>,
    },

    /// Clear a selection, whoever owns it
    Disown {
        selection: String,

        /// Server timestamp to clear at
        #[arg(long)]
        time: Option<u32>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Whether any client offers text for a selection
    Exists {
        selection: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Whether this daemon owns a selection
    Owner {
        selection: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the text of a selection to stdout
    Get {
        selection: String,

        /// Requested format
        #[arg(long = "type", default_value = "UTF8_STRING")]
        target_type: String,

        /// Server timestamp of the request
        #[arg(long)]
        time: Option<u32>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// List frames
    Frames,

    /// Create a frame
    MakeFrame {
        /// Terminal to create it on (default: first X11 terminal)
        #[arg(long)]
        terminal: Option<u64>,
    },

    /// Delete a frame, giving up its selections
    DeleteFrame { frame: u64 },

    /// Make a frame the selected frame
    SelectFrame { frame: u64 },
}
