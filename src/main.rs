//! Wirechat CLI - two-party terminal chat over TCP.
//!
//! This is the binary entry point. See the `wirechat` library for the
//! connection subsystem and the TUI.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, LeaveAlternateScreen};
use mimalloc::MiMalloc;
use tokio::sync::mpsc;
use wirechat::{tui, Connection};

/// mimalloc performs better than the system allocator under the tokio
/// I/O tasks.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "wirechat")]
#[command(version)]
#[command(about = "Two-party terminal chat over a single TCP connection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for a peer to dial in on the given port
    Listen {
        /// Port to bind on all interfaces
        port: u16,
    },
    /// Dial a listening peer
    Connect {
        /// Peer host name or IP address
        host: String,
        /// Peer port
        port: u16,
    },
}

fn main() -> Result<()> {
    // Log to a file so log output and the TUI don't fight over the terminal.
    let log_path = std::env::var("WIRECHAT_LOG_FILE")
        .unwrap_or_else(|_| "/tmp/wirechat.log".to_string());
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("Failed to create log file at {log_path}"))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .format_timestamp_secs()
        .init();

    // Restore the terminal before the default panic handler prints.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        log::error!("PANIC: {panic_info:?}");
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
        default_hook(panic_info);
    }));

    let cli = Cli::parse();

    // The connection's I/O tasks live on this runtime; the TUI loop runs on
    // the main thread with the runtime context entered.
    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;

    let conn = {
        let _enter = runtime.enter();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let conn = match cli.command {
            Commands::Listen { port } => Connection::start_server(port, event_tx),
            Commands::Connect { host, port } => Connection::start_client(host, port, event_tx),
        };
        tui::runner::run(conn, event_rx)?
    };

    // Dropping the runtime cancels spawned tasks outright, which could kill
    // the write task before a queued termination frame reaches the wire.
    // Give teardown a bounded window to flush first.
    runtime.block_on(async {
        let _ = tokio::time::timeout(Duration::from_secs(1), conn.join()).await;
    });
    Ok(())
}
