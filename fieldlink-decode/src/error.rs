//! Error types for the decode pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Reasons a single sensor message is dropped.
///
/// None of these are fatal: foreign or corrupt radio traffic is expected
/// and the pipeline moves on to the next frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Payload too short to carry a serial number.
    #[error("payload too short: {len} bytes")]
    ShortPayload { len: usize },

    /// No key is configured for this device.
    #[error("[{serial}] no key found")]
    UnknownKey { serial: String },

    /// Ciphertext is empty or not a whole number of AES blocks.
    #[error("[{serial}] ciphertext length {len} is not a positive multiple of 16")]
    BadCiphertextLength { serial: String, len: usize },

    /// The decrypted zero region is not zero.
    #[error("[{serial}] looks like AES key is wrong")]
    WrongKey { serial: String },

    /// Plaintext too short to hold a sensor record.
    #[error("[{serial}] plaintext too short: {len} bytes")]
    ShortPlaintext { serial: String, len: usize },
}

/// Errors from a telemetry sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("request timed out")]
    Timeout,

    /// The sink answered with a non-success status.
    #[error("sink returned status {0}")]
    Status(u16),
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SinkError::Timeout
        } else if err.is_connect() {
            SinkError::Connection(err.to_string())
        } else {
            SinkError::Http(err.to_string())
        }
    }
}

/// Errors loading a device key table.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read key table {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse key table: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serial is not 4 lowercase hex digits.
    #[error("invalid serial {0:?}: expected 4 lowercase hex digits")]
    InvalidSerial(String),

    /// Key is not 32 hex digits.
    #[error("invalid key for serial {serial}: {reason}")]
    InvalidKey { serial: String, reason: String },
}
