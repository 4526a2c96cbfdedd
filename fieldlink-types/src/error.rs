//! Layout errors.

use core::fmt;

/// A frame that does not satisfy its fixed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The frame is shorter than the layout requires.
    TooShort {
        /// Which layout was being parsed ("stats", "data", ...).
        frame: &'static str,
        /// Actual length in bytes.
        len: usize,
        /// Minimum length in bytes.
        min: usize,
    },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::TooShort { frame, len, min } => {
                write!(f, "malformed {} frame: length {} (min {})", frame, len, min)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}
