//! Event message framing.
//!
//! Every published message is the event text followed by exactly one zero
//! byte. There is no length prefix and no topic frame, so subscribers written
//! against C string APIs can read a message in place.

use bytes::{BufMut, Bytes, BytesMut};

/// Terminator appended to every framed message.
pub const TERMINATOR: u8 = 0;

/// Errors produced while framing or parsing messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Message too large: no terminator within {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Frame is missing its terminating zero byte")]
    Unterminated,
}

/// Measure event text the way a bounded `strnlen` would.
///
/// Returns the number of bytes before the first zero byte, scanning at most
/// `limit` bytes. Text that reaches `limit` without a terminator is rejected;
/// the result is always strictly less than `limit`.
pub fn measure(text: &[u8], limit: usize) -> Result<usize, FrameError> {
    let window = &text[..text.len().min(limit)];
    let length = window
        .iter()
        .position(|&b| b == TERMINATOR)
        .unwrap_or(window.len());

    if length >= limit {
        return Err(FrameError::TooLarge { limit });
    }
    Ok(length)
}

/// A framed, immutable event ready for the publish socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMessage {
    frame: Bytes,
}

impl EventMessage {
    /// Frame `text` into `text[..len] + 0x00`, where `len` comes from [`measure`].
    pub fn frame(text: &[u8], limit: usize) -> Result<Self, FrameError> {
        let length = measure(text, limit)?;

        let mut buf = BytesMut::with_capacity(length + 1);
        buf.put_slice(&text[..length]);
        buf.put_u8(TERMINATOR);

        Ok(Self {
            frame: buf.freeze(),
        })
    }

    /// Text portion, without the terminator.
    pub fn text(&self) -> &[u8] {
        &self.frame[..self.frame.len() - 1]
    }

    /// Full wire bytes, terminator included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.frame
    }

    /// Wire length: text length plus one.
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    /// Always false; a frame holds at least its terminator.
    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }
}

impl From<EventMessage> for Bytes {
    fn from(message: EventMessage) -> Self {
        message.frame
    }
}

/// Subscriber side: strip the terminator from a received frame.
pub fn parse_frame(frame: &[u8]) -> Result<&[u8], FrameError> {
    match frame.split_last() {
        Some((&TERMINATOR, text)) => Ok(text),
        _ => Err(FrameError::Unterminated),
    }
}
