//! Error taxonomy for the connection subsystem.

use thiserror::Error;

use super::framing::FrameError;

/// A failure on a chat connection.
///
/// Establishment failures are terminal for the attempt and surface once as
/// [`ConnectionEvent::EstablishFailed`](super::events::ConnectionEvent).
/// Every other variant is normalized into a single
/// [`ConnectionEvent::Fatal`](super::events::ConnectionEvent) after the
/// stream is up; a graceful `C:END` from the peer is not an error at all.
#[derive(Debug, Error)]
pub enum ConnError {
    /// Bind, accept, or connect failed before the stream existed.
    #[error("failed to establish connection: {0}")]
    Establish(#[source] std::io::Error),

    /// The peer sent a line the codec rejects.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Read or write failed on an established stream.
    #[error("transport error: {0}")]
    Transport(#[source] std::io::Error),

    /// The peer closed the stream without sending `C:END`.
    #[error("peer closed the stream without a termination frame")]
    StreamEndedUnexpectedly,
}
