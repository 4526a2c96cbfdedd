//! WAN status sampling.

use std::time::Duration;

use fieldlink_types::WanState;
use tokio::sync::mpsc;
use tokio::time;

use crate::error::LinkError;
use crate::state::ReachabilityFlag;

/// Sampling cadence of the reachability flag.
pub const WAN_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Samples a [`ReachabilityFlag`] and feeds the heartbeat forwarder.
///
/// The outbound queue is bounded; a full queue blocks the sampler rather
/// than dropping a sample.
#[derive(Debug)]
pub struct WanMonitor {
    flag: ReachabilityFlag,
    tx: mpsc::Sender<WanState>,
    interval: Duration,
}

impl WanMonitor {
    pub fn new(flag: ReachabilityFlag, tx: mpsc::Sender<WanState>) -> Self {
        Self {
            flag,
            tx,
            interval: WAN_SAMPLE_INTERVAL,
        }
    }

    /// Run until the forwarder goes away.
    pub async fn run(self) -> Result<(), LinkError> {
        loop {
            let state = WanState::from_reachable(self.flag.is_reachable());
            self.tx
                .send(state)
                .await
                .map_err(|_| LinkError::QueueClosed("wan"))?;
            time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn emits_flag_at_fixed_cadence() {
        let flag = ReachabilityFlag::new(true);
        let (tx, mut rx) = mpsc::channel(1);
        let task = tokio::spawn(WanMonitor::new(flag.clone(), tx).run());

        let start = time::Instant::now();
        assert_eq!(rx.recv().await, Some(WanState::FullOn));
        assert_eq!(rx.recv().await, Some(WanState::FullOn));
        assert_eq!(start.elapsed(), WAN_SAMPLE_INTERVAL);

        flag.set(false);
        assert_eq!(rx.recv().await, Some(WanState::FullOff));

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_blocks_instead_of_dropping() {
        let flag = ReachabilityFlag::new(false);
        let (tx, mut rx) = mpsc::channel(1);
        let task = tokio::spawn(WanMonitor::new(flag.clone(), tx).run());

        // Let several intervals pass without draining: one sample is queued,
        // the next is parked in `send`.
        time::sleep(WAN_SAMPLE_INTERVAL * 5).await;
        flag.set(true);

        assert_eq!(rx.recv().await, Some(WanState::FullOff));
        assert_eq!(rx.recv().await, Some(WanState::FullOff));
        assert_eq!(rx.recv().await, Some(WanState::FullOn));

        task.abort();
    }

    #[tokio::test]
    async fn closed_queue_ends_sampler() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let err = WanMonitor::new(ReachabilityFlag::new(true), tx)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::QueueClosed("wan")));
    }
}
