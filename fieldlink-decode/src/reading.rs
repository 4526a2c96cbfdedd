//! Sensor record layout and calibration.
//!
//! # Plaintext Format
//!
//! All fields little-endian, at fixed offsets whether or not their flag is set.
//!
//! ```text
//! 0   uptime      u64
//! 8   flags       u16
//! 10  acc x/y/z   3 x i16
//! 16  mag x/y/z   3 x i16
//! 22  die temp    i16
//! 24  voltage     i16
//! 26  air temp    i16
//! 28  air rh      u16
//! 30  lux         u16
//! 32  buttons     u16
//! 34  presence    u16
//! 40..48          zero region
//! ```

use std::collections::BTreeMap;
use std::f64::consts::E;

use serde::Serialize;

use crate::crypto::ZERO_REGION;

/// Flag bits gating each field group.
pub mod flags {
    pub const ACCEL: u16 = 1 << 0;
    pub const MAG: u16 = 1 << 1;
    pub const DIE: u16 = 1 << 2;
    pub const AIR: u16 = 1 << 3;
    pub const LUX: u16 = 1 << 4;
    pub const BUTTONS: u16 = 1 << 5;
    pub const PRESENCE: u16 = 1 << 6;
}

/// Smallest plaintext that can be decoded.
pub const PLAINTEXT_MIN_LEN: usize = ZERO_REGION.end;

/// One decoded sensor record.
///
/// Serializes as a flat JSON object: `serial`, `uptime` and `time` followed
/// by one key per calibrated value, in name order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedReading {
    pub serial: String,
    pub uptime: u64,
    /// Gateway receive time in nanoseconds since the Unix epoch.
    pub time: i64,
    #[serde(flatten)]
    pub fields: BTreeMap<&'static str, f64>,
}

impl DecodedReading {
    /// Decode a plaintext of at least [`PLAINTEXT_MIN_LEN`] bytes.
    pub fn parse(serial: String, plaintext: &[u8], time: i64) -> Option<Self> {
        if plaintext.len() < PLAINTEXT_MIN_LEN {
            return None;
        }
        let u16_at = |at: usize| u16::from_le_bytes([plaintext[at], plaintext[at + 1]]);
        let i16_at = |at: usize| u16_at(at) as i16;

        let mut word = [0u8; 8];
        word.copy_from_slice(&plaintext[0..8]);
        let uptime = u64::from_le_bytes(word);
        let present = u16_at(8);

        let mut fields = BTreeMap::new();
        if present & flags::ACCEL != 0 {
            fields.insert("acc_x", accel(i16_at(10)));
            fields.insert("acc_y", accel(i16_at(12)));
            fields.insert("acc_z", accel(i16_at(14)));
        }
        if present & flags::MAG != 0 {
            fields.insert("mag_x", magnetic(i16_at(16)));
            fields.insert("mag_y", magnetic(i16_at(18)));
            fields.insert("mag_z", magnetic(i16_at(20)));
        }
        if present & flags::DIE != 0 {
            fields.insert("tp_die_temp", die_temp(i16_at(22)));
            fields.insert("tp_voltage", voltage(i16_at(24)));
        }
        if present & flags::AIR != 0 {
            let t = air_temp(i16_at(26));
            let rh = air_rh(u16_at(28));
            fields.insert("air_temp", t);
            fields.insert("air_rh", rh);
            fields.insert("air_hum", absolute_humidity(t, rh));
        }
        if present & flags::LUX != 0 {
            fields.insert("lux", lux(u16_at(30).into()));
        }
        if present & flags::BUTTONS != 0 {
            fields.insert("button_events", f64::from(u16_at(32)));
        }
        if present & flags::PRESENCE != 0 {
            fields.insert("presence", presence(u16_at(34)));
        }

        Some(Self {
            serial,
            uptime,
            time,
            fields,
        })
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }
}

/// Accelerometer axis.
pub fn accel(raw: i16) -> f64 {
    f64::from(raw) * 0.244
}

/// Magnetometer axis.
pub fn magnetic(raw: i16) -> f64 {
    f64::from(raw) * 0.1
}

/// Die temperature in °C; the two low bits are not part of the reading.
pub fn die_temp(raw: i16) -> f64 {
    f64::from(raw >> 2) * 0.03125
}

pub fn voltage(raw: i16) -> f64 {
    f64::from(raw) * 0.15625
}

/// Air temperature in °C.
pub fn air_temp(raw: i16) -> f64 {
    f64::from(raw) / 100.0
}

/// Relative humidity in %.
pub fn air_rh(raw: u16) -> f64 {
    f64::from(raw) / 100.0
}

/// Absolute humidity in g/m³ from temperature (°C) and relative humidity (%).
pub fn absolute_humidity(t: f64, rh: f64) -> f64 {
    let exponent = (17.67 * t) / (t + 243.5);
    (6.112 * E.powf(exponent) * rh * 2.1674) / (273.15 + t)
}

/// Illuminance: five decades over the full 16-bit range.
pub fn lux(raw: u32) -> f64 {
    10f64.powf(f64::from(raw) / 13_107.2)
}

/// Occupancy as a fraction of full scale.
pub fn presence(raw: u16) -> f64 {
    f64::from(raw) / 32_768.0
}
