// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frame codec: 4-byte big-endian length prefix + UTF-8 JSON payload.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// High-water mark; larger frames are rejected locally, never fragmented.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Errors from frame I/O.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("frame of {0} bytes exceeds the channel limit")]
    FrameTooLarge(usize),

    #[error("frame is not valid UTF-8")]
    InvalidEncoding,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one frame. `ConnectionClosed` on clean EOF before a header.
pub async fn read_frame<R>(reader: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(error) => return Err(error.into()),
    }

    let length = u32::from_be_bytes(header) as usize;
    if length > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(length));
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;
    String::from_utf8(payload).map_err(|_| ProtocolError::InvalidEncoding)
}

/// Write one frame. Oversized payloads are rejected before any bytes move.
pub async fn write_frame<W>(writer: &mut W, payload: &str) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = payload.as_bytes();
    if bytes.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(bytes.len()));
    }

    writer.write_all(&(bytes.len() as u32).to_be_bytes()).await?;
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
