//! Egress messages - the header view of one raw sensor frame.
//!
//! # Frame Format
//!
//! ```text
//! [skip: 2] [mac: 8] [ip: 16] [device_time: i64 LE] [rssi: i8] [lqi: i8] [payload...]
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;
use core::net::{IpAddr, Ipv6Addr};

use crate::FrameError;

/// Minimum length of a data frame in bytes.
pub const EGRESS_FRAME_MIN_LEN: usize = 38;

const MAC_RANGE: core::ops::Range<usize> = 2..10;
const IP_RANGE: core::ops::Range<usize> = 10..26;
const DEVICE_TIME_RANGE: core::ops::Range<usize> = 26..34;
const RSSI_OFFSET: usize = 34;
const LQI_OFFSET: usize = 35;
const PAYLOAD_OFFSET: usize = 36;

/// Decoded header of one sensor frame, prior to payload decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EgressMessage {
    /// Source MAC as lowercase hex.
    pub src_mac: String,
    /// Source IP in canonical text form.
    pub src_ip: String,
    /// Site identifier of this gateway.
    pub site_id: String,
    /// Timestamp from the device clock.
    pub device_time: i64,
    /// Gateway receive time in nanoseconds since the Unix epoch.
    pub received_at_ns: i64,
    pub rssi: i8,
    pub lqi: i8,
    /// Encrypted sensor payload.
    pub payload: Vec<u8>,
}

impl EgressMessage {
    /// Unpack a data frame.
    ///
    /// Frames shorter than [`EGRESS_FRAME_MIN_LEN`] are rejected.
    pub fn unpack(frame: &[u8], site_id: &str, received_at_ns: i64) -> Result<Self, FrameError> {
        if frame.len() < EGRESS_FRAME_MIN_LEN {
            return Err(FrameError::TooShort {
                frame: "data",
                len: frame.len(),
                min: EGRESS_FRAME_MIN_LEN,
            });
        }

        let mut src_mac = String::with_capacity(MAC_RANGE.len() * 2);
        for byte in &frame[MAC_RANGE] {
            let _ = write!(src_mac, "{:02x}", byte);
        }

        let mut ip = [0u8; 16];
        ip.copy_from_slice(&frame[IP_RANGE]);
        let src_ip = IpAddr::V6(Ipv6Addr::from(ip)).to_canonical();

        let mut device_time = [0u8; 8];
        device_time.copy_from_slice(&frame[DEVICE_TIME_RANGE]);

        Ok(Self {
            src_mac,
            src_ip: alloc::format!("{}", src_ip),
            site_id: String::from(site_id),
            device_time: i64::from_le_bytes(device_time),
            received_at_ns,
            rssi: frame[RSSI_OFFSET] as i8,
            lqi: frame[LQI_OFFSET] as i8,
            payload: frame[PAYLOAD_OFFSET..].to_vec(),
        })
    }
}
