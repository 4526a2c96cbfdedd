//! Length-prefixed framing over a byte stream.
//!
//! Every message on the local IPC sockets is framed as:
//!
//! ```text
//! [length: u32 BE] [payload: length bytes]
//! ```
//!
//! The reader enforces a maximum payload length so a corrupt prefix cannot
//! request an unbounded allocation.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default cap on a single frame's payload.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1 << 20;

/// Size of the length prefix.
pub const HEADER_LEN: usize = 4;

/// Errors produced while reading or writing frames.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The underlying stream failed or closed mid-frame.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The length prefix exceeds the configured maximum.
    #[error("frame too large: {len} bytes (max: {max})")]
    TooLarge { len: usize, max: usize },
}

/// Reads length-prefixed frames from an async stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    max_len: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a stream with the default frame cap.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            max_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Set the maximum accepted payload length.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// The maximum accepted payload length.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Read one frame.
    ///
    /// Fails on a short read, a closed stream, or an oversized prefix.
    pub async fn read_frame(&mut self) -> Result<Vec<u8>, FramingError> {
        let mut header = [0u8; HEADER_LEN];
        self.inner.read_exact(&mut header).await?;

        let len = u32::from_be_bytes(header) as usize;
        if len > self.max_len {
            return Err(FramingError::TooLarge {
                len,
                max: self.max_len,
            });
        }

        let mut payload = vec![0u8; len];
        self.inner.read_exact(&mut payload).await?;
        Ok(payload)
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Writes length-prefixed frames to an async stream.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one frame: the prefix, then the payload.
    ///
    /// Fails if either write fails.
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<(), FramingError> {
        let len = u32::try_from(payload.len()).map_err(|_| FramingError::TooLarge {
            len: payload.len(),
            max: u32::MAX as usize,
        })?;
        self.inner.write_all(&len.to_be_bytes()).await?;
        self.inner.write_all(payload).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
