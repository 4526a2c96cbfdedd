//! Heartbeat frames exchanged with the MCU, and the status codes they carry.
//!
//! ```text
//! MCU -> gateway (>= 16 bytes):
//! [tag: u32 LE = 2] [reserved: 8] [mcu_build: u32 LE] [...]
//!
//! gateway -> MCU (4 bytes):
//! [tag: 2] [wan_state] [0x55] [0xAA]
//! ```

/// Tag carried by a valid MCU-to-gateway heartbeat (little-endian u32 at offset 0).
pub const MCU_HEARTBEAT_TAG: u32 = 2;

/// Tag byte of the gateway-to-MCU WAN status frame.
pub const GATEWAY_HEARTBEAT_TAG: u8 = 2;

/// Minimum length of a valid MCU-to-gateway heartbeat.
pub const HEARTBEAT_MIN_LEN: usize = 16;

/// Trailer bytes closing the gateway-to-MCU frame.
pub const WAN_FRAME_TRAILER: [u8; 2] = [0x55, 0xAA];

const MCU_BUILD_OFFSET: usize = 12;

/// A valid heartbeat received from the MCU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// Firmware build number reported by the MCU.
    pub mcu_build: u32,
}

impl Heartbeat {
    /// Parse a heartbeat frame.
    ///
    /// Returns `None` unless the frame is at least 16 bytes long and starts
    /// with [`MCU_HEARTBEAT_TAG`]. Anything else counts as a liveness failure
    /// for the caller.
    pub fn parse(frame: &[u8]) -> Option<Self> {
        if frame.len() < HEARTBEAT_MIN_LEN {
            return None;
        }
        if read_u32_le(frame, 0) != MCU_HEARTBEAT_TAG {
            return None;
        }
        Some(Self {
            mcu_build: read_u32_le(frame, MCU_BUILD_OFFSET),
        })
    }
}

fn read_u32_le(buf: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(word)
}

/// WAN reachability as relayed to the MCU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum WanState {
    /// Internet unreachable.
    FullOff = 1,
    /// Internet reachable.
    FullOn = 2,
}

impl WanState {
    /// Map a reachability flag to a state.
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            WanState::FullOn
        } else {
            WanState::FullOff
        }
    }

    /// Wire code of this state.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Encode the 4-byte gateway-to-MCU frame for this state.
    pub const fn to_frame(self) -> [u8; 4] {
        [
            GATEWAY_HEARTBEAT_TAG,
            self as u8,
            WAN_FRAME_TRAILER[0],
            WAN_FRAME_TRAILER[1],
        ]
    }
}

/// Command rendered by the status LED.
///
/// Codes share the numbering of [`WanState`]; the two faster blink speeds
/// are reserved and leave the output untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum LedCommand {
    /// Output held low.
    #[default]
    Off = 1,
    /// Output held high.
    On = 2,
    /// Output toggled on every render tick.
    BlinkSlow = 3,
    /// Reserved.
    BlinkMedium = 4,
    /// Reserved.
    BlinkFast = 5,
}

impl LedCommand {
    /// Wire code of this command.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heartbeat_frame(tag: u32, build: u32, len: usize) -> alloc::vec::Vec<u8> {
        let mut frame = alloc::vec![0u8; len];
        frame[0..4].copy_from_slice(&tag.to_le_bytes());
        if len >= 16 {
            frame[12..16].copy_from_slice(&build.to_le_bytes());
        }
        frame
    }

    #[test]
    fn valid_heartbeat_carries_build() {
        let frame = heartbeat_frame(MCU_HEARTBEAT_TAG, 0x0102_0304, 16);
        assert_eq!(
            Heartbeat::parse(&frame),
            Some(Heartbeat {
                mcu_build: 0x0102_0304
            })
        );
    }

    #[test]
    fn longer_heartbeat_is_valid() {
        let frame = heartbeat_frame(MCU_HEARTBEAT_TAG, 9, 64);
        assert_eq!(Heartbeat::parse(&frame).map(|h| h.mcu_build), Some(9));
    }

    #[test]
    fn short_heartbeat_is_invalid() {
        let frame = heartbeat_frame(MCU_HEARTBEAT_TAG, 0, 15);
        assert_eq!(Heartbeat::parse(&frame), None);
        assert_eq!(Heartbeat::parse(&[]), None);
    }

    #[test]
    fn wrong_tag_is_invalid() {
        for tag in [0, 1, 3, 0x0200_0000] {
            let frame = heartbeat_frame(tag, 5, 16);
            assert_eq!(Heartbeat::parse(&frame), None, "tag {tag}");
        }
    }

    #[test]
    fn wan_frame_layout() {
        assert_eq!(WanState::FullOn.to_frame(), [2, 2, 0x55, 0xAA]);
        assert_eq!(WanState::FullOff.to_frame(), [2, 1, 0x55, 0xAA]);
        assert_eq!(WanState::from_reachable(true), WanState::FullOn);
        assert_eq!(WanState::from_reachable(false), WanState::FullOff);
    }

    #[test]
    fn led_codes() {
        assert_eq!(LedCommand::Off.code(), 1);
        assert_eq!(LedCommand::On.code(), 2);
        assert_eq!(LedCommand::BlinkSlow.code(), 3);
        assert_eq!(LedCommand::default(), LedCommand::Off);
    }
}
