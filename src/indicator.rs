//! Status pin implementations.

use std::path::PathBuf;

use fieldlink_link::StatusPin;
use tracing::{trace, warn};

/// Drives a sysfs-style value file (e.g. `/sys/class/gpio/gpio17/value`)
/// with `1` or `0`.
#[derive(Debug, Clone)]
pub struct SysfsPin {
    path: PathBuf,
}

impl SysfsPin {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatusPin for SysfsPin {
    fn set(&self, on: bool) {
        let value: &[u8] = if on { b"1" } else { b"0" };
        if let Err(e) = std::fs::write(&self.path, value) {
            warn!(path = %self.path.display(), error = %e, "failed to drive status pin");
        }
    }
}

/// Logs the level instead of driving hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPin;

impl StatusPin for LogPin {
    fn set(&self, on: bool) {
        trace!(on, "status pin");
    }
}
