//! Internet reachability probe.

use std::time::Duration;

use fieldlink_link::ReachabilityFlag;
use tokio::net::TcpStream;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Periodically checks that a remote TCP endpoint accepts connections.
#[derive(Debug, Clone)]
pub struct Probe {
    address: Option<String>,
    interval: Duration,
    timeout: Duration,
    flag: ReachabilityFlag,
}

impl Probe {
    /// Probe `address` every `interval`. With no address the WAN is reported
    /// reachable.
    pub fn new(
        address: Option<String>,
        interval: Duration,
        timeout: Duration,
        flag: ReachabilityFlag,
    ) -> Self {
        Self {
            address,
            interval,
            timeout,
            flag,
        }
    }

    /// Connect once; `true` if the connection succeeded within the timeout.
    pub async fn check(&self, address: &str) -> bool {
        match time::timeout(self.timeout, TcpStream::connect(address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(address, error = %e, "reachability probe failed");
                false
            }
            Err(_) => {
                debug!(address, "reachability probe timed out");
                false
            }
        }
    }

    /// Run forever, or return at once when no address is configured.
    pub async fn run(self) {
        let Some(address) = self.address.clone() else {
            self.flag.set(true);
            return;
        };

        let mut tick = time::interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = None;

        loop {
            tick.tick().await;
            let reachable = self.check(&address).await;
            self.flag.set(reachable);
            if last != Some(reachable) {
                if reachable {
                    info!(address = %address, "internet reachable");
                } else {
                    warn!(address = %address, "internet unreachable");
                }
                last = Some(reachable);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn probe(address: Option<String>, flag: &ReachabilityFlag) -> Probe {
        Probe::new(
            address,
            Duration::from_millis(50),
            Duration::from_millis(500),
            flag.clone(),
        )
    }

    #[tokio::test]
    async fn no_address_means_reachable() {
        let flag = ReachabilityFlag::new(false);
        probe(None, &flag).run().await;
        assert!(flag.is_reachable());
    }

    #[tokio::test]
    async fn listening_endpoint_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let flag = ReachabilityFlag::new(false);

        assert!(probe(None, &flag).check(&addr).await);
    }

    #[tokio::test]
    async fn closed_endpoint_clears_flag() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let flag = ReachabilityFlag::new(true);
        let task = tokio::spawn(probe(Some(addr), &flag).run());
        time::timeout(Duration::from_secs(2), async {
            while flag.is_reachable() {
                time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        task.abort();
    }
}
