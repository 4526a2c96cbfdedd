//! Link statistics - per-channel counters reported by the MCU.
//!
//! # Frame Format
//!
//! All counters are 64-bit little-endian.
//!
//! ```text
//! [skip: 4 x u64] [bad_frames] [lost_frames] [drop_not_connected]
//! 255 x [serial_received] [domain_forwarded] [drop_not_connected]
//!       [domain_received] [serial_forwarded]
//! ```

use crate::{FrameError, GATEWAY_BUILD, SCHEMA_VERSION};

/// Number of sub-channels carried in a stats frame.
pub const STATS_CHANNELS: usize = 255;

/// Counters per sub-channel group.
const GROUP_COUNTERS: usize = 5;

/// Index of the first headline counter (the first four are skipped).
const HEADLINE_START: usize = 4;

/// Minimum length of a stats frame in bytes.
pub const STATS_FRAME_MIN_LEN: usize = 10_256;

/// Totals of the five per-channel counters, summed over all sub-channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelTotals {
    #[cfg_attr(feature = "serde", serde(rename = "sum_serial_received"))]
    pub serial_received: u64,
    #[cfg_attr(feature = "serde", serde(rename = "sum_domain_forwarded"))]
    pub domain_forwarded: u64,
    #[cfg_attr(feature = "serde", serde(rename = "sum_drop_not_connected"))]
    pub drop_not_connected: u64,
    #[cfg_attr(feature = "serde", serde(rename = "sum_domain_received"))]
    pub domain_received: u64,
    #[cfg_attr(feature = "serde", serde(rename = "sum_serial_forwarded"))]
    pub serial_forwarded: u64,
}

/// One aggregated stats record.
///
/// Channel sums are computed from a single snapshot; nothing accumulates
/// across snapshots. The publish counters and the MCU build are filled in
/// by the aggregator from process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkStats {
    /// Layout version of this record, [`SCHEMA_VERSION`] when produced here.
    pub schema: u32,

    pub bad_frames: u64,
    pub lost_frames: u64,
    pub drop_not_connected: u64,

    /// Sums over all sub-channels of this snapshot.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub channels: ChannelTotals,

    /// Telemetry publishes that succeeded since process start.
    #[cfg_attr(feature = "serde", serde(rename = "br_pub_ok"))]
    pub publish_ok: u64,

    /// Telemetry publishes that failed since process start.
    #[cfg_attr(feature = "serde", serde(rename = "br_pub_err"))]
    pub publish_err: u64,

    /// Last build number reported by the MCU heartbeat (0 until one arrives).
    #[cfg_attr(feature = "serde", serde(rename = "mcu_version"))]
    pub mcu_build: u32,

    /// Build number of this gateway.
    #[cfg_attr(feature = "serde", serde(rename = "brgw_version"))]
    pub gateway_build: u32,
}

impl LinkStats {
    /// Parse a stats frame.
    ///
    /// Frames shorter than [`STATS_FRAME_MIN_LEN`] are rejected whole; no
    /// partial record is produced.
    pub fn from_frame(frame: &[u8]) -> Result<Self, FrameError> {
        if frame.len() < STATS_FRAME_MIN_LEN {
            return Err(FrameError::TooShort {
                frame: "stats",
                len: frame.len(),
                min: STATS_FRAME_MIN_LEN,
            });
        }

        let counter = |idx: usize| {
            let mut word = [0u8; 8];
            word.copy_from_slice(&frame[idx * 8..idx * 8 + 8]);
            u64::from_le_bytes(word)
        };

        let mut channels = ChannelTotals::default();
        let first_group = HEADLINE_START + 3;
        for group in 0..STATS_CHANNELS {
            let base = first_group + group * GROUP_COUNTERS;
            channels.serial_received = channels.serial_received.wrapping_add(counter(base));
            channels.domain_forwarded = channels.domain_forwarded.wrapping_add(counter(base + 1));
            channels.drop_not_connected =
                channels.drop_not_connected.wrapping_add(counter(base + 2));
            channels.domain_received = channels.domain_received.wrapping_add(counter(base + 3));
            channels.serial_forwarded = channels.serial_forwarded.wrapping_add(counter(base + 4));
        }

        Ok(Self {
            schema: SCHEMA_VERSION,
            bad_frames: counter(HEADLINE_START),
            lost_frames: counter(HEADLINE_START + 1),
            drop_not_connected: counter(HEADLINE_START + 2),
            channels,
            publish_ok: 0,
            publish_err: 0,
            mcu_build: 0,
            gateway_build: GATEWAY_BUILD,
        })
    }

    /// Attach the MCU build number.
    pub fn with_mcu_build(mut self, build: u32) -> Self {
        self.mcu_build = build;
        self
    }

    /// Attach the cumulative publish counters.
    pub fn with_publish_counts(mut self, ok: u64, err: u64) -> Self {
        self.publish_ok = ok;
        self.publish_err = err;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn frame_with(len: usize, set: &[(usize, u64)]) -> Vec<u8> {
        let mut frame = vec![0u8; len];
        for &(idx, value) in set {
            frame[idx * 8..idx * 8 + 8].copy_from_slice(&value.to_le_bytes());
        }
        frame
    }

    #[test]
    fn layout_fills_exactly_the_minimum_length() {
        let counters = HEADLINE_START + 3 + STATS_CHANNELS * GROUP_COUNTERS;
        assert_eq!(counters * 8, STATS_FRAME_MIN_LEN);
    }

    #[test]
    fn short_frame_is_rejected() {
        let err = LinkStats::from_frame(&vec![0u8; STATS_FRAME_MIN_LEN - 1]).unwrap_err();
        assert_eq!(
            err,
            FrameError::TooShort {
                frame: "stats",
                len: STATS_FRAME_MIN_LEN - 1,
                min: STATS_FRAME_MIN_LEN
            }
        );
    }

    #[test]
    fn headline_counters_skip_first_four() {
        let frame = frame_with(
            STATS_FRAME_MIN_LEN,
            &[(0, 99), (3, 99), (4, 11), (5, 22), (6, 33)],
        );
        let stats = LinkStats::from_frame(&frame).unwrap();
        assert_eq!(stats.bad_frames, 11);
        assert_eq!(stats.lost_frames, 22);
        assert_eq!(stats.drop_not_connected, 33);
        assert_eq!(stats.channels, ChannelTotals::default());
        assert_eq!(stats.gateway_build, GATEWAY_BUILD);
    }

    #[test]
    fn channel_groups_are_summed() {
        let mut set = Vec::new();
        for group in 0..STATS_CHANNELS {
            let base = 7 + group * 5;
            set.push((base, 1));
            set.push((base + 1, 2));
            set.push((base + 2, 3));
            set.push((base + 3, 4));
            set.push((base + 4, group as u64));
        }
        let stats = LinkStats::from_frame(&frame_with(STATS_FRAME_MIN_LEN, &set)).unwrap();
        let n = STATS_CHANNELS as u64;
        assert_eq!(stats.channels.serial_received, n);
        assert_eq!(stats.channels.domain_forwarded, 2 * n);
        assert_eq!(stats.channels.drop_not_connected, 3 * n);
        assert_eq!(stats.channels.domain_received, 4 * n);
        assert_eq!(stats.channels.serial_forwarded, n * (n - 1) / 2);
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let frame = frame_with(STATS_FRAME_MIN_LEN + 64, &[(4, 1), (1282, 500)]);
        let stats = LinkStats::from_frame(&frame).unwrap();
        assert_eq!(stats.bad_frames, 1);
        assert_eq!(stats.channels.serial_received, 0);
    }

    #[test]
    fn builders_attach_process_state() {
        let stats = LinkStats::from_frame(&vec![0u8; STATS_FRAME_MIN_LEN])
            .unwrap()
            .with_mcu_build(417)
            .with_publish_counts(8, 3);
        assert_eq!(stats.mcu_build, 417);
        assert_eq!(stats.publish_ok, 8);
        assert_eq!(stats.publish_err, 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_field_names() {
        let stats = LinkStats::from_frame(&frame_with(STATS_FRAME_MIN_LEN, &[(4, 5), (7, 6)]))
            .unwrap()
            .with_mcu_build(3);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["bad_frames"], 5);
        assert_eq!(json["sum_serial_received"], 6);
        assert_eq!(json["mcu_version"], 3);
        assert_eq!(json["brgw_version"], GATEWAY_BUILD);
        assert_eq!(json["schema"], SCHEMA_VERSION);

        let parsed: LinkStats = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, stats);
    }
}
