//! # fieldlink-decode
//!
//! Sensor decode pipeline of the fieldlink gateway. Data frames from the MCU
//! carry an AES-128-CBC encrypted sensor record; this crate looks up the
//! device key, decrypts, checks the result, decodes the calibrated fields and
//! publishes them as JSON.
//!
//! Decode failures are message-local: foreign or corrupt radio traffic is
//! logged and dropped. Only a failing data socket ends [`Decoder::run`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use fieldlink_decode::{Decoder, HttpSink, KeyStore, KeyTable};
//! use fieldlink_link::{FrameReader, SharedState};
//!
//! # async fn demo(socket: tokio::net::UnixStream) -> Result<(), Box<dyn std::error::Error>> {
//! let keys = KeyTable::parse(r#""00ca" = "f1597d0ee9178be2e8c650097db265b3""#)?;
//! let sink = HttpSink::new("http://collector:8080/ingest", Duration::from_secs(10))?;
//!
//! let decoder = Decoder::new(Arc::new(KeyStore::new(keys)), Arc::new(sink), SharedState::new());
//! decoder.run(FrameReader::new(socket), "site-7").await?;
//! # Ok(())
//! # }
//! ```

mod crypto;
mod error;
mod keys;
mod pipeline;
mod reading;
mod sink;

pub use crypto::{decrypt, zero_region_clear, BLOCK_LEN, IV, ZERO_REGION};
pub use error::{DecodeError, KeyError, SinkError};
pub use keys::{DeviceKey, KeyStore, KeyTable, KEY_LEN};
pub use pipeline::{Decoder, PAYLOAD_PREFIX_LEN};
pub use reading::{
    absolute_humidity, accel, air_rh, air_temp, die_temp, flags, lux, magnetic, presence,
    voltage, DecodedReading, PLAINTEXT_MIN_LEN,
};
pub use sink::{Delivery, HttpSink, LogSink, TelemetrySink};
