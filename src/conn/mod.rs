//! Connection subsystem: transport establishment, wire protocol, receive
//! loop, and the shutdown handshake.
//!
//! This is the only part of the application with real concurrency and
//! failure-handling concerns. The presentation layer consumes it entirely
//! through [`ConnectionEvent`]s and the [`Inbox`], and drives it through
//! [`Connection::send_message`] and [`Connection::request_close`].
//!
//! # Modules
//!
//! - [`framing`] - line-oriented frame codec (`M:`/`C:` lines)
//! - [`connection`] - the [`Connection`] handle and its I/O tasks
//! - [`events`] - notification surface toward the consumer
//! - [`inbox`] - FIFO hand-off of received message bodies
//! - [`error`] - failure taxonomy

pub mod connection;
pub mod error;
pub mod events;
pub mod framing;
pub mod inbox;

pub use connection::{Connection, Role};
pub use error::ConnError;
pub use events::ConnectionEvent;
pub use framing::{Control, Frame, FrameError};
pub use inbox::Inbox;
