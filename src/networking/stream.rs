/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Framing of messages on a byte stream.
//!
//! Each frame is a 4-byte little-endian length, followed by that many bytes of a borsh-serialized message.

use std::fmt::{self, Display, Formatter};
use std::io::{self, ErrorKind, Read, Write};

use borsh::{BorshDeserialize, BorshSerialize};

/// Largest frame body accepted. Views are two short addresses and a number, so anything bigger than this
/// is a corrupted or hostile stream.
pub const MAX_FRAME_LEN: u32 = 64 * 1024;

/// Serialize `msg` and write it to `writer` as a single frame.
pub fn write_frame<W: Write, T: BorshSerialize>(writer: &mut W, msg: &T) -> Result<(), FrameError> {
    let body = msg.try_to_vec().map_err(FrameError::Serialization)?;
    let len = u32::try_from(body.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or(FrameError::TooLarge { len: body.len() })?;

    let mut bs = Vec::with_capacity(4 + body.len());
    bs.extend_from_slice(&len.to_le_bytes());
    bs.extend_from_slice(&body);
    writer.write_all(&bs)?;
    writer.flush()?;
    Ok(())
}

/// Read a single frame from `reader` and deserialize it.
///
/// Returns [`FrameError::Closed`] if the stream ends cleanly before the first byte of the frame, and
/// [`FrameError::Io`] if it ends anywhere after that.
pub fn read_frame<R: Read, T: BorshDeserialize>(reader: &mut R) -> Result<T, FrameError> {
    // Only an end of stream before the first byte is a clean close; one inside the header is an error.
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf[..1]).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => FrameError::Closed,
        _ => FrameError::Io(err),
    })?;
    reader.read_exact(&mut len_buf[1..])?;

    let len = u32::from_le_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge { len: len as usize });
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body)?;
    T::try_from_slice(&body).map_err(FrameError::Deserialization)
}

/// Enumerates the ways reading or writing a frame can fail.
#[derive(Debug)]
pub enum FrameError {
    /// The peer closed the stream between frames.
    Closed,

    /// The underlying stream failed, including read and write timeouts.
    Io(io::Error),

    /// The frame body exceeds [`MAX_FRAME_LEN`].
    TooLarge { len: usize },

    Serialization(io::Error),

    Deserialization(io::Error),
}

impl From<io::Error> for FrameError {
    fn from(value: io::Error) -> Self {
        FrameError::Io(value)
    }
}

impl Display for FrameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Closed => write!(f, "stream closed"),
            FrameError::Io(err) => write!(f, "stream error: {}", err),
            FrameError::TooLarge { len } => {
                write!(f, "frame of {} bytes exceeds the limit of {} bytes", len, MAX_FRAME_LEN)
            }
            FrameError::Serialization(err) => write!(f, "failed to serialize message: {}", err),
            FrameError::Deserialization(err) => write!(f, "failed to deserialize message: {}", err),
        }
    }
}

impl std::error::Error for FrameError {}
