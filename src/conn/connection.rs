//! Connection lifecycle: establishment, receive loop, send path, teardown.
//!
//! A [`Connection`] is the owner-thread handle to one two-party chat session.
//! Starting it spawns an I/O task that establishes the stream (bind+accept
//! for the server role, connect for the client role) and then runs the
//! receive loop; a paired write task owns the write half and performs the
//! actual writes. The handle never blocks on network I/O:
//!
//! ```text
//! owner thread          Connection handle ──Outbound──> write task ──> TcpStream
//!                              ^                                          │
//!                              │ inbox (FIFO)                             │
//! consumer loop <──ConnectionEvent── I/O task (establish + receive loop) <┘
//! ```
//!
//! Shutdown converges from two directions: a local `request_close` (flip
//! `ended`, queue `C:END`, close the write side, cancel the token) and a
//! remote `C:END` or failure observed by the receive loop. Whichever fires
//! first wins the `ended` swap and emits the single outward notification;
//! the other path finds `ended` already set and releases quietly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::ConnError;
use super::events::ConnectionEvent;
use super::framing::{Control, Frame, FrameError};
use super::inbox::Inbox;

/// Which side of the stream this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Bind a listening socket and wait for the peer to dial in.
    Server,
    /// Dial the peer's address.
    Client,
}

/// Establishment target, resolved from the constructor arguments.
#[derive(Debug)]
enum Target {
    Listen(u16),
    Connect(String, u16),
}

/// Command from the handle to the write task.
#[derive(Debug)]
enum Outbound {
    /// One encoded wire line, written and flushed immediately.
    Line(String),
    /// Close the write side and stop.
    Shutdown,
}

/// Owner-thread handle to a chat connection.
///
/// Created with [`Connection::start_server`] or [`Connection::start_client`]
/// from within a tokio runtime. Events arrive on the channel supplied at
/// construction; message bodies arrive in [`Connection::inbox`].
#[derive(Debug)]
pub struct Connection {
    role: Role,
    peer_name: Arc<OnceLock<String>>,
    inbox: Inbox,
    ended: Arc<AtomicBool>,
    outbound_tx: UnboundedSender<Outbound>,
    cancel: CancellationToken,
    io_handle: JoinHandle<()>,
}

impl Connection {
    /// Start a server-role connection: bind `port`, wait for one peer.
    ///
    /// Must be called within a tokio runtime. Establishment runs entirely on
    /// a spawned task; failures surface as
    /// [`ConnectionEvent::EstablishFailed`] on `events`.
    pub fn start_server(port: u16, events: UnboundedSender<ConnectionEvent>) -> Self {
        Self::start(Role::Server, Target::Listen(port), events)
    }

    /// Start a client-role connection: dial `host:port`.
    ///
    /// Must be called within a tokio runtime.
    pub fn start_client(
        host: impl Into<String>,
        port: u16,
        events: UnboundedSender<ConnectionEvent>,
    ) -> Self {
        Self::start(Role::Client, Target::Connect(host.into(), port), events)
    }

    fn start(role: Role, target: Target, events: UnboundedSender<ConnectionEvent>) -> Self {
        let inbox = Inbox::new();
        let ended = Arc::new(AtomicBool::new(false));
        let peer_name = Arc::new(OnceLock::new());
        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Outbound>();

        let task = IoTask {
            target,
            events,
            outbound_rx: Some(outbound_rx),
            inbox: inbox.clone(),
            ended: Arc::clone(&ended),
            peer_name: Arc::clone(&peer_name),
            cancel: cancel.clone(),
        };
        let io_handle = tokio::spawn(task.run());

        Self {
            role,
            peer_name,
            inbox,
            ended,
            outbound_tx,
            cancel,
            io_handle,
        }
    }

    /// This connection's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Display name derived from the peer's resolved address.
    ///
    /// `None` until establishment succeeds; set exactly once.
    pub fn peer_name(&self) -> Option<&str> {
        self.peer_name.get().map(String::as_str)
    }

    /// The FIFO of received chat-message bodies.
    ///
    /// Poll it until empty after each [`ConnectionEvent::InboxReady`].
    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    /// Whether the connection has reached its terminal state.
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Queue one chat message for transmission.
    ///
    /// Returns `Ok(true)` when the message was handed to the write task,
    /// `Ok(false)` when the connection has already ended (the message is
    /// dropped, never transmitted). Write failures are reported through
    /// [`ConnectionEvent::Fatal`], not through this return value.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::EmbeddedNewline`] if `text` contains a line
    /// delimiter, which the wire framing cannot carry.
    pub fn send_message(&self, text: &str) -> Result<bool, FrameError> {
        let frame = Frame::message(text)?;
        if self.ended.load(Ordering::SeqCst) {
            debug!("Dropping outbound message, connection already ended");
            return Ok(false);
        }
        let _ = self.outbound_tx.send(Outbound::Line(frame.encode()));
        Ok(true)
    }

    /// Local-initiated close: announce `C:END` to the peer and tear down.
    ///
    /// Does not wait for any reply. The termination frame bypasses the
    /// `ended` guard that [`Connection::send_message`] enforces. Safe to
    /// call more than once and safe to race against a remote close; only
    /// the first trigger sends the frame.
    pub fn request_close(&self) {
        if !self.ended.swap(true, Ordering::SeqCst) {
            info!("Local close requested, sending termination frame");
            let _ = self
                .outbound_tx
                .send(Outbound::Line(Frame::Control(Control::End).encode()));
        }
        let _ = self.outbound_tx.send(Outbound::Shutdown);
        // Unblocks a pending accept/connect/read; the write task drains the
        // queued termination frame before it observes this.
        self.cancel.cancel();
    }

    /// Wait for the I/O tasks to finish. Used by tests and orderly exit.
    pub async fn join(self) {
        let _ = self.io_handle.await;
    }
}

/// Established stream plus the listener retained for cleanup (server role).
struct Ready {
    stream: TcpStream,
    listener: Option<TcpListener>,
}

enum Establish {
    Ready(Ready),
    /// The consumer closed the connection while accept/connect was pending.
    Cancelled,
}

/// State owned by the spawned I/O task.
struct IoTask {
    target: Target,
    events: UnboundedSender<ConnectionEvent>,
    outbound_rx: Option<UnboundedReceiver<Outbound>>,
    inbox: Inbox,
    ended: Arc<AtomicBool>,
    peer_name: Arc<OnceLock<String>>,
    cancel: CancellationToken,
}

impl IoTask {
    async fn run(mut self) {
        let ready = match self.establish().await {
            Ok(Establish::Ready(ready)) => ready,
            Ok(Establish::Cancelled) => {
                debug!("Establishment cancelled by local close");
                self.ended.store(true, Ordering::SeqCst);
                return;
            }
            Err(err) => {
                warn!("Establishment failed: {err}");
                self.ended.store(true, Ordering::SeqCst);
                let _ = self.events.send(ConnectionEvent::EstablishFailed(err));
                return;
            }
        };

        let Ready { stream, listener } = ready;
        let (peer, local_port) = match stream.peer_addr().and_then(|p| {
            let local = stream.local_addr()?;
            Ok((p, local.port()))
        }) {
            Ok(addrs) => addrs,
            Err(err) => {
                self.ended.store(true, Ordering::SeqCst);
                let _ = self
                    .events
                    .send(ConnectionEvent::EstablishFailed(ConnError::Establish(err)));
                return;
            }
        };

        let name = peer.to_string();
        let _ = self.peer_name.set(name.clone());
        info!("Connection established with {name}");
        let _ = self.events.send(ConnectionEvent::Established {
            peer: name,
            local_port,
        });

        let (read_half, write_half) = stream.into_split();
        let outbound_rx = self
            .outbound_rx
            .take()
            .expect("outbound receiver taken twice");
        let write_handle = tokio::spawn(write_loop(
            write_half,
            outbound_rx,
            Arc::clone(&self.ended),
            self.events.clone(),
            self.cancel.clone(),
        ));

        self.read_loop(read_half).await;

        // Idempotent teardown: stop the write task, release the stream
        // halves and the listener. Close-time errors are swallowed.
        self.cancel.cancel();
        drop(listener);
        let _ = write_handle.await;
        debug!("Connection torn down");
    }

    async fn establish(&self) -> Result<Establish, ConnError> {
        match &self.target {
            Target::Listen(port) => {
                let listener = TcpListener::bind(("0.0.0.0", *port))
                    .await
                    .map_err(ConnError::Establish)?;
                let bound_port = listener
                    .local_addr()
                    .map_err(ConnError::Establish)?
                    .port();
                info!("Listening on port {bound_port}");
                let _ = self.events.send(ConnectionEvent::Listening { port: bound_port });

                // Blocks until a peer dials in; no timeout. Raced against
                // the cancellation token so a local close can abandon it.
                let accepted = tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(Establish::Cancelled),
                    accepted = listener.accept() => accepted,
                };
                let (stream, _) = accepted.map_err(ConnError::Establish)?;
                Ok(Establish::Ready(Ready {
                    stream,
                    listener: Some(listener),
                }))
            }
            Target::Connect(host, port) => {
                info!("Connecting to {host}:{port}");
                let connected = tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(Establish::Cancelled),
                    connected = TcpStream::connect((host.as_str(), *port)) => connected,
                };
                let stream = connected.map_err(ConnError::Establish)?;
                Ok(Establish::Ready(Ready {
                    stream,
                    listener: None,
                }))
            }
        }
    }

    /// Receive loop: read one line at a time, decode, dispatch.
    async fn read_loop(&self, read_half: OwnedReadHalf) {
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();

        loop {
            line.clear();
            let read = tokio::select! {
                _ = self.cancel.cancelled() => break,
                read = reader.read_line(&mut line) => read,
            };

            match read {
                // EOF. Expected when teardown is already in progress (the
                // peer's socket closed in response to our own shutdown);
                // a protocol violation otherwise.
                Ok(0) => {
                    if !self.ended.swap(true, Ordering::SeqCst) {
                        warn!("Peer closed the stream without a termination frame");
                        let _ = self
                            .events
                            .send(ConnectionEvent::Fatal(ConnError::StreamEndedUnexpectedly));
                    }
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim_end_matches(['\n', '\r']);
                    match Frame::decode(trimmed) {
                        Ok(Frame::Message(body)) => {
                            self.inbox.push(body);
                            let _ = self.events.send(ConnectionEvent::InboxReady);
                        }
                        Ok(Frame::Control(Control::End)) => {
                            // Graceful close. Stop reading even if more data
                            // follows the termination frame.
                            if !self.ended.swap(true, Ordering::SeqCst) {
                                info!("Peer announced termination");
                                let _ = self.events.send(ConnectionEvent::PeerClosed);
                            }
                            break;
                        }
                        Err(err) => {
                            if !self.ended.swap(true, Ordering::SeqCst) {
                                warn!("Protocol violation from peer: {err}");
                                let _ = self
                                    .events
                                    .send(ConnectionEvent::Fatal(ConnError::Frame(err)));
                            }
                            break;
                        }
                    }
                }
                Err(err) => {
                    if !self.ended.swap(true, Ordering::SeqCst) {
                        warn!("Read error: {err}");
                        let _ = self
                            .events
                            .send(ConnectionEvent::Fatal(ConnError::Transport(err)));
                    }
                    break;
                }
            }
        }
    }
}

/// Write task: receives encoded lines and writes them, flushing each one.
async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound_rx: UnboundedReceiver<Outbound>,
    ended: Arc<AtomicBool>,
    events: UnboundedSender<ConnectionEvent>,
    cancel: CancellationToken,
) {
    loop {
        // Biased so queued lines (in particular a termination frame queued
        // just before the token was cancelled) drain before cancellation is
        // observed.
        let cmd = tokio::select! {
            biased;
            cmd = outbound_rx.recv() => cmd,
            _ = cancel.cancelled() => break,
        };

        match cmd {
            Some(Outbound::Line(line)) => {
                let write = async {
                    writer.write_all(line.as_bytes()).await?;
                    writer.flush().await
                };
                if let Err(err) = write.await {
                    if !ended.swap(true, Ordering::SeqCst) {
                        warn!("Write error: {err}");
                        let _ = events.send(ConnectionEvent::Fatal(ConnError::Transport(err)));
                    }
                    cancel.cancel();
                    break;
                }
            }
            Some(Outbound::Shutdown) => {
                let _ = writer.shutdown().await;
                break;
            }
            None => break,
        }
    }
}
