mod cli;
mod client;
mod daemon;
mod frame;
mod ipc;
mod resolver;
mod selection;

use std::time::Duration;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Daemon {
            displays,
            request_timeout_ms,
            pump_interval_ms,
        } => {
            let config = daemon::state::DaemonConfig {
                displays,
                request_timeout: Duration::from_millis(request_timeout_ms),
                pump_interval: Duration::from_millis(pump_interval_ms.max(1)),
                socket: cli.socket,
            };
            if let Err(e) = daemon::run(config).await {
                tracing::error!(error = %e, "daemon failed");
                eprintln!("selectiond daemon: {e}");
                std::process::exit(1);
            }
        }
        Command::Client { action } => {
            let socket = match cli.socket {
                Some(path) => path,
                None => daemon::resolve_socket_path().unwrap_or_else(|e| {
                    eprintln!("selectiond client: {e}");
                    std::process::exit(1);
                }),
            };
            if let Err(e) = client::run(socket, action).await {
                tracing::error!(error = %e, "client failed");
                eprintln!("selectiond client: {e}");
                std::process::exit(1);
            }
        }
    }
}
