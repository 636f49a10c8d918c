//! View state for the chat TUI.
//!
//! [`ChatApp`] is a plain state machine: connection events and key presses
//! go in, a [`Phase`], a transcript, and [`UiAction`]s come out. It holds no
//! terminal or socket handles, so every transition is unit-testable.

use chrono::Local;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::conn::{ConnectionEvent, Inbox};

/// Where the session is in its lifecycle, as far as the view is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Client role, dialing out.
    Connecting,
    /// Server role, bound and waiting for a peer.
    Listening {
        /// Bound local port.
        port: u16,
    },
    /// Stream established, chat is live.
    Active,
    /// The peer announced termination.
    PeerClosed,
    /// Establishment or the live stream failed.
    Failed(String),
}

impl Phase {
    /// Whether the session is over and the next key press should exit.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::PeerClosed | Phase::Failed(_))
    }
}

/// Who a transcript entry is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    You,
    Peer,
    /// Lifecycle notices rendered inline with the chat.
    Notice,
}

/// One line of the transcript.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Local wall-clock time the entry was recorded, `HH:MM:SS`.
    pub at: String,
    pub speaker: Speaker,
    pub text: String,
}

impl Entry {
    fn now(speaker: Speaker, text: String) -> Self {
        Self {
            at: Local::now().format("%H:%M:%S").to_string(),
            speaker,
            text,
        }
    }
}

/// What the runner should do in response to a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    None,
    /// Send this chat message and echo it locally.
    Send(String),
    /// Close the connection and exit.
    Close,
    /// Exit without touching the connection (it already ended).
    Quit,
}

/// The chat view's whole state.
#[derive(Debug)]
pub struct ChatApp {
    phase: Phase,
    peer: Option<String>,
    local_port: Option<u16>,
    transcript: Vec<Entry>,
    input: Input,
}

impl Default for ChatApp {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatApp {
    pub fn new() -> Self {
        Self {
            phase: Phase::Connecting,
            peer: None,
            local_port: None,
            transcript: Vec::new(),
            input: Input::default(),
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Peer display name, once established.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Local port of the established stream.
    pub fn local_port(&self) -> Option<u16> {
        self.local_port
    }

    pub fn transcript(&self) -> &[Entry] {
        &self.transcript
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    /// Record a message this side just sent.
    pub fn push_local(&mut self, text: String) {
        self.transcript.push(Entry::now(Speaker::You, text));
    }

    /// Fold one connection event into the view state.
    ///
    /// Inbox-draining events pull everything currently queued, so a burst of
    /// messages lands in the transcript in wire order regardless of how many
    /// `InboxReady` notifications coalesced behind it.
    pub fn apply_event(&mut self, event: ConnectionEvent, inbox: &Inbox) {
        match event {
            ConnectionEvent::Listening { port } => {
                self.phase = Phase::Listening { port };
                self.notice("Server started. Waiting for a connection.".to_string());
            }
            ConnectionEvent::Established { peer, local_port } => {
                self.notice(format!("Connected to {peer} on port {local_port}"));
                self.peer = Some(peer);
                self.local_port = Some(local_port);
                self.phase = Phase::Active;
            }
            ConnectionEvent::EstablishFailed(err) => {
                self.phase = Phase::Failed(err.to_string());
            }
            ConnectionEvent::InboxReady => {
                self.drain_inbox(inbox);
            }
            ConnectionEvent::PeerClosed => {
                // Messages that raced ahead of the termination frame still
                // belong in the transcript.
                self.drain_inbox(inbox);
                self.notice("The connection was closed by the other side.".to_string());
                self.phase = Phase::PeerClosed;
            }
            ConnectionEvent::Fatal(err) => {
                self.drain_inbox(inbox);
                self.phase = Phase::Failed(err.to_string());
            }
        }
    }

    /// Translate a key press into a [`UiAction`], updating the input buffer.
    pub fn handle_key(&mut self, key: KeyEvent) -> UiAction {
        if self.phase.is_terminal() {
            return UiAction::Quit;
        }

        let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL)
            && key.code == KeyCode::Char('c');
        if ctrl_c || key.code == KeyCode::Esc {
            return UiAction::Close;
        }

        if key.code == KeyCode::Enter {
            if self.phase != Phase::Active {
                return UiAction::None;
            }
            let text = self.input.value().to_string();
            if text.is_empty() {
                return UiAction::None;
            }
            self.input.reset();
            return UiAction::Send(text);
        }

        self.input.handle_event(&Event::Key(key));
        UiAction::None
    }

    fn notice(&mut self, text: String) {
        self.transcript.push(Entry::now(Speaker::Notice, text));
    }

    fn drain_inbox(&mut self, inbox: &Inbox) {
        while let Some(body) = inbox.poll() {
            self.transcript.push(Entry::now(Speaker::Peer, body));
        }
    }
}
