//! The sensor decode pipeline.
//!
//! Each data frame goes through:
//!
//! 1. header unpack into an [`EgressMessage`]
//! 2. serial lookup in the [`KeyStore`]
//! 3. AES-128-CBC decryption and the zero-region check
//! 4. calibrated field decode into a [`DecodedReading`]
//! 5. JSON publish to a [`TelemetrySink`]
//!
//! Every step can drop the message; only a failing data socket ends the loop.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use fieldlink_link::{FrameReader, LinkError, SharedState};
use fieldlink_types::EgressMessage;
use tokio::io::AsyncRead;
use tracing::{info, warn};

use crate::crypto;
use crate::error::DecodeError;
use crate::keys::KeyStore;
use crate::reading::DecodedReading;
use crate::sink::{Delivery, TelemetrySink};

/// Bytes preceding the ciphertext in a payload; the serial sits at offset 2.
pub const PAYLOAD_PREFIX_LEN: usize = 4;

/// Decodes sensor messages and hands them to a sink.
pub struct Decoder {
    keys: Arc<KeyStore>,
    sink: Arc<dyn TelemetrySink>,
    state: Arc<SharedState>,
}

impl Decoder {
    pub fn new(keys: Arc<KeyStore>, sink: Arc<dyn TelemetrySink>, state: Arc<SharedState>) -> Self {
        Self { keys, sink, state }
    }

    /// Decode one message into a reading.
    pub fn decode(&self, msg: &EgressMessage) -> Result<DecodedReading, DecodeError> {
        let payload = &msg.payload;
        if payload.len() < PAYLOAD_PREFIX_LEN {
            return Err(DecodeError::ShortPayload { len: payload.len() });
        }
        let serial = format!("{:04x}", u16::from_le_bytes([payload[2], payload[3]]));

        let key = self
            .keys
            .lookup(&serial)
            .ok_or_else(|| DecodeError::UnknownKey {
                serial: serial.clone(),
            })?;

        let ciphertext = &payload[PAYLOAD_PREFIX_LEN..];
        let plaintext =
            crypto::decrypt(&key, ciphertext).ok_or_else(|| DecodeError::BadCiphertextLength {
                serial: serial.clone(),
                len: ciphertext.len(),
            })?;

        if plaintext.len() < crypto::ZERO_REGION.end {
            return Err(DecodeError::ShortPlaintext {
                serial,
                len: plaintext.len(),
            });
        }
        if !crypto::zero_region_clear(&plaintext) {
            return Err(DecodeError::WrongKey { serial });
        }

        let len = plaintext.len();
        DecodedReading::parse(serial.clone(), &plaintext, msg.received_at_ns)
            .ok_or(DecodeError::ShortPlaintext { serial, len })
    }

    /// Decode and publish one message. Drops are logged, never returned.
    pub async fn handle(&self, msg: EgressMessage) {
        let reading = match self.decode(&msg) {
            Ok(reading) => reading,
            Err(e) => {
                warn!(src = %msg.src_mac, error = %e, "dropping sensor packet");
                return;
            }
        };

        let body = match serde_json::to_vec(&reading) {
            Ok(body) => body,
            Err(e) => {
                warn!(serial = %reading.serial, error = %e, "failed to encode reading");
                return;
            }
        };

        match self.sink.publish(body).await {
            Ok(Delivery::Posted) => {
                self.state.record_publish(true);
                info!(serial = %reading.serial, "push ok");
            }
            Ok(Delivery::Logged) => {}
            Err(e) => {
                self.state.record_publish(false);
                warn!(serial = %reading.serial, error = %e, "failed to publish");
            }
        }
    }

    /// Read data frames until the socket fails.
    pub async fn run<R: AsyncRead + Unpin>(
        &self,
        mut reader: FrameReader<R>,
        site_id: &str,
    ) -> Result<(), LinkError> {
        loop {
            let frame = reader
                .read_frame()
                .await
                .map_err(|source| LinkError::Read {
                    channel: "data",
                    source,
                })?;

            match EgressMessage::unpack(&frame, site_id, now_ns()) {
                Ok(msg) => self.handle(msg).await,
                Err(e) => warn!(len = frame.len(), error = %e, "bad frame, dropping"),
            }
        }
    }
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}
