//! Wire protocol codec for the chat line protocol.
//!
//! Each frame is one line of text: a one-character kind tag, a colon, and a
//! body, terminated by `\n`:
//!
//! ```text
//! kind ":" body "\n"
//! ```
//!
//! Frame kinds:
//! - `M`: chat message — body is arbitrary text without a line delimiter
//! - `C`: control — body is a fixed vocabulary, currently only `END`
//!
//! Everything after the first colon is body, verbatim, so `M:a:b` decodes to
//! the message `a:b`. There is no escaping; a message containing a newline is
//! unrepresentable and rejected at construction.

use thiserror::Error;

/// Kind tag for chat message frames.
const KIND_MESSAGE: char = 'M';
/// Kind tag for control frames.
const KIND_CONTROL: char = 'C';
/// The only recognized control body.
const CONTROL_END: &str = "END";

/// A malformed or unrepresentable protocol line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The line was empty.
    #[error("empty frame")]
    Empty,

    /// The line had no `:` separator after the kind tag.
    #[error("frame missing ':' separator: {0:?}")]
    MissingSeparator(String),

    /// The kind tag is not one of `M` or `C`.
    #[error("unknown frame kind {0:?}")]
    UnknownKind(char),

    /// A control frame carried a body outside the fixed vocabulary.
    #[error("unknown control body {0:?}")]
    UnknownControl(String),

    /// A chat message body contained a line delimiter.
    #[error("message body contains a line delimiter")]
    EmbeddedNewline,
}

/// Lifecycle signals carried by control frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Peer is terminating the connection.
    End,
}

/// A decoded protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Chat message (`M`) with a user-visible body.
    Message(String),
    /// Control frame (`C`).
    Control(Control),
}

impl Frame {
    /// Build a chat message frame, validating the body.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::EmbeddedNewline`] if `body` contains `\n` or
    /// `\r`, which the line framing cannot carry.
    pub fn message(body: &str) -> Result<Self, FrameError> {
        if body.contains('\n') || body.contains('\r') {
            return Err(FrameError::EmbeddedNewline);
        }
        Ok(Frame::Message(body.to_string()))
    }

    /// Encode this frame as a wire line, including the trailing `\n`.
    pub fn encode(&self) -> String {
        match self {
            Frame::Message(body) => format!("{KIND_MESSAGE}:{body}\n"),
            Frame::Control(Control::End) => format!("{KIND_CONTROL}:{CONTROL_END}\n"),
        }
    }

    /// Decode one wire line (without its trailing newline) into a frame.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] for an empty line, a missing separator, an
    /// unrecognized kind tag, or an unrecognized control body. Nothing is
    /// silently ignored.
    pub fn decode(line: &str) -> Result<Self, FrameError> {
        let mut chars = line.chars();
        let kind = chars.next().ok_or(FrameError::Empty)?;
        let rest = chars.as_str();
        let body = rest
            .strip_prefix(':')
            .ok_or_else(|| FrameError::MissingSeparator(line.to_string()))?;

        match kind {
            KIND_MESSAGE => Ok(Frame::Message(body.to_string())),
            KIND_CONTROL => match body {
                CONTROL_END => Ok(Frame::Control(Control::End)),
                other => Err(FrameError::UnknownControl(other.to_string())),
            },
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_round_trip() {
        let frame = Frame::message("hello there").unwrap();
        let line = frame.encode();
        assert_eq!(line, "M:hello there\n");
        assert_eq!(Frame::decode(line.trim_end()).unwrap(), frame);
    }

    #[test]
    fn test_control_end_round_trip() {
        let frame = Frame::Control(Control::End);
        assert_eq!(frame.encode(), "C:END\n");
        assert_eq!(Frame::decode("C:END").unwrap(), frame);
    }

    #[test]
    fn test_body_keeps_embedded_colons() {
        match Frame::decode("M:a:b").unwrap() {
            Frame::Message(body) => assert_eq!(body, "a:b"),
            other => panic!("Expected Message, got: {other:?}"),
        }
    }

    #[test]
    fn test_empty_body_is_valid() {
        assert_eq!(Frame::decode("M:").unwrap(), Frame::Message(String::new()));
    }

    #[test]
    fn test_empty_line_rejected() {
        assert_eq!(Frame::decode(""), Err(FrameError::Empty));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert_eq!(Frame::decode("X:foo"), Err(FrameError::UnknownKind('X')));
    }

    #[test]
    fn test_missing_separator_rejected() {
        assert!(matches!(
            Frame::decode("Mhello"),
            Err(FrameError::MissingSeparator(_))
        ));
        assert!(matches!(Frame::decode("M"), Err(FrameError::MissingSeparator(_))));
    }

    #[test]
    fn test_unknown_control_body_rejected() {
        assert_eq!(
            Frame::decode("C:FOO"),
            Err(FrameError::UnknownControl("FOO".to_string()))
        );
    }

    #[test]
    fn test_message_with_newline_rejected() {
        assert_eq!(Frame::message("a\nb"), Err(FrameError::EmbeddedNewline));
        assert_eq!(Frame::message("a\rb"), Err(FrameError::EmbeddedNewline));
    }

    #[test]
    fn test_unicode_body_round_trip() {
        let frame = Frame::message("héllo ✓ a:b").unwrap();
        let line = frame.encode();
        assert_eq!(Frame::decode(line.trim_end()).unwrap(), frame);
    }
}
