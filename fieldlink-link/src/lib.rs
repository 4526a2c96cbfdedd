//! # fieldlink-link
//!
//! Local-link runtime of the fieldlink gateway. Everything that talks to the
//! MCU over the local IPC sockets lives here:
//!
//! - [`FrameReader`] / [`FrameWriter`]: length-prefixed framing
//! - [`HeartbeatMonitor`]: MCU liveness supervision and WAN status relay
//! - [`WanMonitor`]: samples a [`ReachabilityFlag`] every 500 ms
//! - [`LedIndicator`]: renders [`LedCommand`](fieldlink_types::LedCommand)s onto a [`StatusPin`]
//! - [`StatsAggregator`]: turns stats snapshots into [`LinkStats`](fieldlink_types::LinkStats) records
//!
//! Any error returned by a stage is link-fatal; callers are expected to
//! terminate with [`LinkError::exit_code`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use fieldlink_link::{
//!     FrameReader, FrameWriter, HeartbeatMonitor, LedIndicator, ReachabilityFlag,
//!     SharedState, StatusPin, WanMonitor,
//! };
//! use tokio::sync::mpsc;
//!
//! struct Pin;
//! impl StatusPin for Pin {
//!     fn set(&self, _on: bool) {}
//! }
//!
//! # async fn demo(socket: tokio::net::UnixStream) -> Result<(), fieldlink_link::LinkError> {
//! let state = SharedState::new();
//! let (led, handle) = LedIndicator::new(Pin);
//! tokio::spawn(led.run());
//!
//! let (wan_tx, wan_rx) = mpsc::channel(1);
//! tokio::spawn(WanMonitor::new(ReachabilityFlag::new(false), wan_tx).run());
//!
//! let (rd, wr) = socket.into_split();
//! HeartbeatMonitor::new(handle, state)
//!     .run(FrameReader::new(rd), FrameWriter::new(wr), wan_rx)
//!     .await
//! # }
//! ```

mod error;
mod framing;
mod heartbeat;
mod led;
mod output;
mod state;
mod stats;
mod wan;

pub use error::LinkError;
pub use framing::{FrameReader, FrameWriter, FramingError, DEFAULT_MAX_FRAME_LEN, HEADER_LEN};
pub use heartbeat::{Consensus, HeartbeatMonitor, HEARTBEAT_TIMEOUT};
pub use led::{LedHandle, LedIndicator, StatusPin, BLINK_INTERVAL};
pub use output::{StatsOutput, TCP_EMIT_TIMEOUT};
pub use state::{ReachabilityFlag, SharedState};
pub use stats::StatsAggregator;
pub use wan::{WanMonitor, WAN_SAMPLE_INTERVAL};
