//! Link-fatal errors.

use std::io;

use fieldlink_types::FrameError;
use thiserror::Error;

use crate::framing::FramingError;

/// Conditions that signal a broken local transport.
///
/// Every variant is fatal for the process; [`LinkError::exit_code`] gives
/// the status to exit with.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Could not connect to a local endpoint.
    #[error("{endpoint} socket: connect failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Reading a frame from a local endpoint failed.
    #[error("{channel} socket: {source}")]
    Read {
        channel: &'static str,
        #[source]
        source: FramingError,
    },

    /// Writing the WAN status frame to the MCU failed.
    #[error("heartbeat forward failed: {0}")]
    ForwardWrite(#[source] FramingError),

    /// A stats snapshot did not match its fixed layout.
    #[error("abort: {0}")]
    MalformedStats(#[from] FrameError),

    /// An internal hand-off queue lost its other end.
    #[error("{0} queue closed")]
    QueueClosed(&'static str),
}

impl LinkError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            LinkError::ForwardWrite(_) => 10,
            _ => 1,
        }
    }
}
