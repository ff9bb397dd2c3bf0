//! Output formatting for CLI client commands.
//!
//! Human-readable status lines and tables. For `get`, the format line goes
//! to stderr and raw content to stdout so that piping works naturally
//! (`selectiond client get CLIPBOARD | less`).

use std::io::{self, Write};

use crate::ipc::protocol::FrameDescriptor;
use crate::selection::SelectionValue;

use super::daemon_client::Fetched;

pub fn print_own(selection: &str, echoed: Option<&SelectionValue>) {
    println!("{}", own_line(selection, echoed));
}

fn own_line(selection: &str, echoed: Option<&SelectionValue>) -> String {
    match echoed {
        Some(SelectionValue::Text(bytes)) => format!("Owned {selection} ({} bytes)", bytes.len()),
        Some(SelectionValue::Opaque(kind)) => {
            format!("Accepted {kind} value for {selection} (not served)")
        }
        None => "Selections disabled (more than one display attached)".to_string(),
    }
}

/// Print a yes/no query result.
pub fn print_flag(flag: bool) {
    println!("{}", if flag { "yes" } else { "no" });
}

/// Write fetched text to stdout. Prints nothing when there is no owner.
pub fn print_selection(fetched: Option<&Fetched>) -> Result<(), io::Error> {
    match fetched {
        Some(f) => {
            eprintln!("Format: {}", f.format);
            let mut stdout = io::stdout().lock();
            stdout.write_all(&f.content)?;
            stdout.flush()
        }
        None => {
            eprintln!("No selection");
            Ok(())
        }
    }
}

/// Print frame descriptors as a table to stdout.
pub fn print_frames(frames: &[FrameDescriptor]) {
    println!(
        "{:<6} {:<6} {:<4} {:<20} {:>10} FLAGS",
        "FRAME", "TERM", "KIND", "DISPLAY", "WINDOW"
    );
    println!("{}", "-".repeat(64));
    for f in frames {
        println!(
            "{:<6} {:<6} {:<4} {:<20} {:>10} {}",
            format!("F{}", f.frame),
            format!("T{}", f.terminal),
            f.kind,
            f.display,
            format!("{:#x}", f.window),
            format_flags(f.live, f.selected),
        );
    }
}

/// Format live/selected flags as a comma-separated string.
fn format_flags(live: bool, selected: bool) -> String {
    let mut flags = Vec::new();
    if !live {
        flags.push("dead");
    }
    if selected {
        flags.push("selected");
    }
    if flags.is_empty() {
        "-".to_string()
    } else {
        flags.join(",")
    }
}
