//! Wirechat - two-party terminal chat over a single TCP connection.
//!
//! One side listens (`wirechat listen <port>`), the other dials
//! (`wirechat connect <host> <port>`). Messages travel as newline-delimited
//! `M:<body>` frames; a `C:END` control frame announces termination.
//!
//! # Architecture
//!
//! ```text
//! TUI loop (owner thread)
//!   ├── drains: ConnectionEvent channel + Inbox
//!   └── drives: Connection::send_message / request_close
//!                    │
//!                    v
//! Connection (spawned I/O task + write task)
//!   ├── establishes: bind+accept (server) or connect (client)
//!   ├── receive loop: line -> Frame -> Inbox / lifecycle
//!   └── write task: encoded lines -> TcpStream, flushed per frame
//! ```
//!
//! The connection side never touches presentation state; everything crosses
//! through the event channel and the inbox.

// Library modules
pub mod conn;
pub mod tui;

// Re-export commonly used types
pub use conn::{ConnError, Connection, ConnectionEvent, Frame, FrameError, Inbox, Role};
