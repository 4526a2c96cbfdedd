//! Stats frame aggregation.

use std::sync::Arc;

use fieldlink_types::LinkStats;
use tokio::io::AsyncRead;
use tracing::{error, warn};

use crate::error::LinkError;
use crate::framing::FrameReader;
use crate::output::StatsOutput;
use crate::state::SharedState;

/// Turns stats snapshots into [`LinkStats`] records.
#[derive(Debug)]
pub struct StatsAggregator {
    state: Arc<SharedState>,
    outputs: Vec<StatsOutput>,
}

impl StatsAggregator {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self {
            state,
            outputs: Vec::new(),
        }
    }

    /// Add an output destination.
    pub fn output(mut self, output: StatsOutput) -> Self {
        self.outputs.push(output);
        self
    }

    /// Build a record from one frame plus the current shared counters.
    ///
    /// Sums come from this frame only.
    pub fn assemble(&self, frame: &[u8]) -> Result<LinkStats, LinkError> {
        let (ok, err) = self.state.publish_counts();
        let stats = LinkStats::from_frame(frame)?
            .with_mcu_build(self.state.mcu_build())
            .with_publish_counts(ok, err);
        Ok(stats)
    }

    /// Read frames until the link fails.
    ///
    /// An undersized frame is link-fatal; no partial record is emitted.
    pub async fn run<R: AsyncRead + Unpin>(
        self,
        mut reader: FrameReader<R>,
    ) -> Result<(), LinkError> {
        loop {
            let frame = reader
                .read_frame()
                .await
                .map_err(|source| LinkError::Read {
                    channel: "stats",
                    source,
                })?;

            let stats = match self.assemble(&frame) {
                Ok(stats) => stats,
                Err(e) => {
                    error!(len = frame.len(), error = %e, "stats frame rejected");
                    return Err(e);
                }
            };

            for output in &self.outputs {
                if let Err(e) = output.emit(&stats).await {
                    warn!(error = %e, "failed to emit link stats");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldlink_types::{FrameError, STATS_FRAME_MIN_LEN};

    fn frame_with(set: &[(usize, u64)]) -> Vec<u8> {
        let mut frame = vec![0u8; STATS_FRAME_MIN_LEN];
        for &(idx, value) in set {
            frame[idx * 8..idx * 8 + 8].copy_from_slice(&value.to_le_bytes());
        }
        frame
    }

    #[test]
    fn assemble_attaches_shared_counters() {
        let state = SharedState::new();
        state.set_mcu_build(311);
        state.record_publish(true);
        state.record_publish(true);
        state.record_publish(false);

        let stats = StatsAggregator::new(state)
            .assemble(&frame_with(&[(4, 9), (7, 1), (12, 2)]))
            .unwrap();

        assert_eq!(stats.bad_frames, 9);
        assert_eq!(stats.channels.serial_received, 3);
        assert_eq!(stats.mcu_build, 311);
        assert_eq!((stats.publish_ok, stats.publish_err), (2, 1));
        assert_eq!(stats.gateway_build, 602);
    }

    #[test]
    fn sums_do_not_accumulate_across_frames() {
        let agg = StatsAggregator::new(SharedState::new());
        let frame = frame_with(&[(8, 5)]);
        assert_eq!(agg.assemble(&frame).unwrap().channels.domain_forwarded, 5);
        assert_eq!(agg.assemble(&frame).unwrap().channels.domain_forwarded, 5);
    }

    #[test]
    fn undersized_frame_is_fatal() {
        let agg = StatsAggregator::new(SharedState::new());
        let err = agg.assemble(&[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            LinkError::MalformedStats(FrameError::TooShort { len: 10, .. })
        ));
    }
}
