use std::io::{self, Read, Write};

use super::{
    errors::{self, FrameError},
    messages::ServerMessage,
};

/// Largest server frame accepted on either side (1MB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Longest client line, terminator excluded.
pub const MAX_LINE_LEN: usize = 1024;

/// Bytes queued for one client before it counts as not reading (4MB).
pub const MAX_OUTBOUND: usize = 4 * MAX_MESSAGE_SIZE;

/// Serializes a message as a little-endian `u32` length followed by the
/// `"<code>|<text>"` payload.
pub fn encode_frame(msg: &ServerMessage) -> errors::Result<Vec<u8>> {
    let payload = msg.encode();
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(FrameError::MessageTooLarge {
            actual: payload.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    // Size and payload go out in one chunk to prevent read-side EOF races.
    let size = payload.len() as u32;
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend(size.to_le_bytes());
    buf.extend(payload.as_bytes());
    Ok(buf)
}

pub fn read_prefixed<R: Read>(reader: &mut R) -> io::Result<ServerMessage> {
    let mut len_bytes = [0; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(FrameError::MessageTooLarge {
            actual: len,
            max: MAX_MESSAGE_SIZE,
        }
        .into());
    }

    // A would block error here very likely means the sender doesn't follow
    // the prefix protocol.
    let mut buf = vec![0; len];
    if let Err(error) = reader.read_exact(&mut buf) {
        let kind = match error.kind() {
            io::ErrorKind::WouldBlock => io::ErrorKind::InvalidData,
            error => error,
        };
        return Err(kind.into());
    }

    let payload = String::from_utf8(buf)
        .map_err(|_| FrameError::InvalidFormat("payload is not UTF-8".to_string()))?;
    ServerMessage::decode(&payload)
        .ok_or_else(|| FrameError::InvalidFormat(payload).into())
}

pub fn write_prefixed<W: Write>(writer: &mut W, msg: &ServerMessage) -> io::Result<()> {
    let buf = encode_frame(msg)?;
    writer.write_all(&buf)
}

/// Accumulates raw client bytes and yields complete lines.
///
/// A line whose content exceeds [`MAX_LINE_LEN`] is reported once and
/// dropped whole, whether it arrives in one read or many.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Inside an over-long line that was already reported; bytes are dropped
    /// up to and including the next newline.
    skipping: bool,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pops the next complete line without its terminator, or the error for
    /// an over-long one. Invalid UTF-8 is replaced rather than rejected.
    pub fn next_line(&mut self) -> Option<Result<String, FrameError>> {
        loop {
            let Some(end) = self.buf.iter().position(|&b| b == b'\n') else {
                return self.overflow();
            };
            let mut line: Vec<u8> = self.buf.drain(..=end).collect();
            if self.skipping {
                self.skipping = false;
                continue;
            }
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.len() > MAX_LINE_LEN {
                return Some(Err(FrameError::LineTooLong {
                    actual: line.len(),
                    max: MAX_LINE_LEN,
                }));
            }
            return Some(Ok(String::from_utf8_lossy(&line).into_owned()));
        }
    }

    /// Handles an unterminated tail: dropped while skipping, reported and
    /// dropped once it can no longer fit (a trailing `\r` may still be
    /// followed by `\n`).
    fn overflow(&mut self) -> Option<Result<String, FrameError>> {
        if self.skipping {
            self.buf.clear();
            return None;
        }
        if self.buf.len() <= MAX_LINE_LEN + 1 {
            return None;
        }
        let actual = self.buf.len();
        self.buf.clear();
        self.skipping = true;
        Some(Err(FrameError::LineTooLong {
            actual,
            max: MAX_LINE_LEN,
        }))
    }
}
