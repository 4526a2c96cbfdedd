//! # fieldlink-types
//!
//! Wire layouts and plain value records for the fieldlink gateway. Every
//! frame that crosses the local IPC link (heartbeat, stats, data) is decoded
//! into one of the records defined here, and the gateway-to-MCU heartbeat is
//! encoded here as well.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: layouts parse with nothing but `core`/`alloc`
//! - **Optional serialization**: enable `serde` to serialize records such as [`LinkStats`]
//! - **Flat records**: no dispatch hierarchy, every record is a plain value
//!
//! ## Features
//!
//! - `std` (default): standard library support (`std::error::Error` impls)
//! - `serde`: serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use fieldlink_types::{Heartbeat, WanState};
//!
//! let mut frame = [0u8; 16];
//! frame[0] = 2;
//! frame[12..16].copy_from_slice(&417u32.to_le_bytes());
//!
//! let heartbeat = Heartbeat::parse(&frame).unwrap();
//! assert_eq!(heartbeat.mcu_build, 417);
//!
//! assert_eq!(WanState::FullOn.to_frame(), [2, 2, 0x55, 0xAA]);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod egress;
mod error;
mod heartbeat;
mod stats;

pub use egress::*;
pub use error::*;
pub use heartbeat::*;
pub use stats::*;

/// Current schema version of emitted records.
///
/// Increment this when making breaking changes to the [`LinkStats`] layout.
pub const SCHEMA_VERSION: u32 = 1;

/// Build number reported by this gateway in every [`LinkStats`] record.
pub const GATEWAY_BUILD: u32 = 602;
