//! Notification surface from the connection to its consumer.
//!
//! The I/O tasks never touch presentation state directly. Everything the
//! consumer needs to know travels through a single
//! `mpsc::UnboundedSender<ConnectionEvent>`; the consumer drains the
//! corresponding receiver inside its own event loop, which keeps delivery on
//! the consumer's execution context.

use super::error::ConnError;

/// Event from the connection's I/O tasks delivered to the owning consumer.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// Server role only: the listening socket is bound and waiting for a
    /// peer. `port` is the resolved local port (meaningful when binding
    /// port 0).
    Listening {
        /// Bound local port.
        port: u16,
    },

    /// The stream is ready. The consumer may render the active chat view.
    Established {
        /// Display name derived from the peer's resolved address.
        peer: String,
        /// Local port of the connected stream.
        local_port: u16,
    },

    /// Establishment failed; the connection never started and will emit no
    /// further events.
    EstablishFailed(ConnError),

    /// At least one new message is in the inbox. The consumer should poll
    /// the inbox until empty.
    InboxReady,

    /// The peer announced termination with `C:END`. Graceful, expected.
    PeerClosed,

    /// A protocol violation or I/O failure ended the connection.
    Fatal(ConnError),
}
