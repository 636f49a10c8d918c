//! Terminal user interface for the chat session.
//!
//! The TUI is pure presentation: it owns a [`app::ChatApp`] state machine,
//! drains [`crate::conn::ConnectionEvent`]s and the inbox inside its own
//! loop, and drives the connection only through
//! [`crate::conn::Connection::send_message`] and
//! [`crate::conn::Connection::request_close`].
//!
//! # Modules
//!
//! - [`app`] - view state and key handling (`ChatApp`, `UiAction`)
//! - [`render`] - state-to-widget rendering
//! - [`runner`] - the owner-thread event loop
//! - [`guard`] - terminal restore RAII guard

pub mod app;
pub mod guard;
pub mod render;
pub mod runner;
