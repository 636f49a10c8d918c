//! TUI event loop.
//!
//! Runs on the owner thread. Each iteration drains pending
//! [`ConnectionEvent`]s into the [`ChatApp`] state, redraws, and polls the
//! terminal for input with a short timeout so connection events keep
//! flowing while the user is idle. All socket I/O stays on the connection's
//! tasks; the loop only ever enqueues through the `Connection` handle.

use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{enable_raw_mode, EnterAlternateScreen};
use log::{debug, warn};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::conn::{Connection, ConnectionEvent};

use super::app::{ChatApp, UiAction};
use super::guard::TerminalGuard;
use super::render;

/// How long to wait for terminal input before checking connection events.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run the chat TUI until the session ends or the user exits.
///
/// On return the terminal is restored and, if the session was still live, a
/// local close has been requested. The connection handle is returned so the
/// caller can await its teardown; `request_close` only enqueues the
/// termination frame, and dropping the runtime before the write task drains
/// it would cut the frame off the wire.
pub fn run(
    conn: Connection,
    mut events: UnboundedReceiver<ConnectionEvent>,
) -> Result<Connection> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    execute!(std::io::stdout(), EnterAlternateScreen)
        .context("Failed to enter alternate screen")?;
    let _guard = TerminalGuard::new();

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let mut app = ChatApp::new();
    loop {
        while let Ok(event) = events.try_recv() {
            app.apply_event(event, conn.inbox());
        }

        terminal.draw(|frame| render::draw(frame, &app))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                match app.handle_key(key) {
                    UiAction::None => {}
                    UiAction::Send(text) => match conn.send_message(&text) {
                        Ok(true) => app.push_local(text),
                        Ok(false) => debug!("Message dropped, connection ended"),
                        Err(err) => warn!("Rejected outbound message: {err}"),
                    },
                    UiAction::Close => {
                        conn.request_close();
                        break;
                    }
                    UiAction::Quit => break,
                }
            }
            // Resize redraws on the next iteration; other events are noise.
            _ => {}
        }
    }

    if !conn.is_ended() {
        conn.request_close();
    }
    Ok(conn)
}
