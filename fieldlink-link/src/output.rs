//! Output backends for emitting link stats records.

use std::time::Duration;

use fieldlink_types::LinkStats;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info};

/// Upper bound on connecting to and writing one record to a TCP collector.
pub const TCP_EMIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Output destination for [`LinkStats`] records.
#[derive(Debug, Clone)]
pub enum StatsOutput {
    /// Emit each record as a structured log event.
    Log,

    /// Send records to a TCP server.
    ///
    /// Each record is sent as a newline-delimited JSON message. Connect and
    /// write together are bounded by [`TCP_EMIT_TIMEOUT`]; a record that
    /// misses it is dropped.
    Tcp(String),

    /// Send records through a channel.
    ///
    /// Use `StatsOutput::channel()` to create this variant and get the receiver.
    Channel(mpsc::Sender<LinkStats>),
}

impl StatsOutput {
    /// Create a TCP output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fieldlink_link::StatsOutput;
    ///
    /// let output = StatsOutput::tcp("localhost:9090");
    /// ```
    pub fn tcp(addr: impl Into<String>) -> Self {
        StatsOutput::Tcp(addr.into())
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fieldlink_link::StatsOutput;
    ///
    /// let (output, mut rx) = StatsOutput::channel(16);
    /// ```
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<LinkStats>) {
        let (tx, rx) = mpsc::channel(buffer);
        (StatsOutput::Channel(tx), rx)
    }

    /// Emit a record to this output.
    pub async fn emit(&self, stats: &LinkStats) -> std::io::Result<()> {
        match self {
            StatsOutput::Log => {
                info!(
                    bad_frames = stats.bad_frames,
                    lost_frames = stats.lost_frames,
                    drop_not_connected = stats.drop_not_connected,
                    sum_serial_received = stats.channels.serial_received,
                    sum_domain_forwarded = stats.channels.domain_forwarded,
                    sum_drop_not_connected = stats.channels.drop_not_connected,
                    sum_domain_received = stats.channels.domain_received,
                    sum_serial_forwarded = stats.channels.serial_forwarded,
                    br_pub_ok = stats.publish_ok,
                    br_pub_err = stats.publish_err,
                    mcu_version = stats.mcu_build,
                    brgw_version = stats.gateway_build,
                    "link stats"
                );
            }
            StatsOutput::Tcp(addr) => {
                let mut line = serde_json::to_string(stats)?;
                line.push('\n');
                let send = async {
                    let mut stream = TcpStream::connect(addr.as_str()).await?;
                    stream.write_all(line.as_bytes()).await
                };
                match time::timeout(TCP_EMIT_TIMEOUT, send).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => debug!(addr = %addr, error = %e, "stats record not delivered"),
                    Err(_) => debug!(addr = %addr, "stats collector timed out"),
                }
            }
            StatsOutput::Channel(tx) => {
                let _ = tx.try_send(stats.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use tokio::io::AsyncBufReadExt;
    use tokio::net::{TcpListener, TcpSocket};

    fn sample() -> LinkStats {
        LinkStats::from_frame(&vec![0u8; fieldlink_types::STATS_FRAME_MIN_LEN])
            .unwrap()
            .with_mcu_build(7)
            .with_publish_counts(3, 1)
    }

    #[tokio::test]
    async fn channel_output_delivers_record() {
        let (output, mut rx) = StatsOutput::channel(4);
        output.emit(&sample()).await.unwrap();
        assert_eq!(rx.recv().await, Some(sample()));
    }

    #[tokio::test]
    async fn full_channel_drops_instead_of_blocking() {
        let (output, mut rx) = StatsOutput::channel(1);
        output.emit(&sample()).await.unwrap();
        output.emit(&sample()).await.unwrap();
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn tcp_output_writes_one_json_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut lines = tokio::io::BufReader::new(stream).lines();
            lines.next_line().await.unwrap()
        });

        StatsOutput::tcp(addr).emit(&sample()).await.unwrap();

        let line = server.await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["mcu_version"], 7);
        assert_eq!(value["br_pub_ok"], 3);
        assert_eq!(value["brgw_version"], 602);
    }

    #[tokio::test]
    async fn unreachable_tcp_output_is_not_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(StatsOutput::tcp(addr).emit(&sample()).await.is_ok());
    }

    #[tokio::test]
    async fn stalled_collector_is_bounded_by_timeout() {
        // Backlog 1 and nothing accepting: once the queue fills, further
        // handshakes are left unanswered.
        let socket = TcpSocket::new_v4().unwrap();
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let listener = socket.listen(1).unwrap();
        let addr = listener.local_addr().unwrap();

        let mut held = Vec::new();
        for _ in 0..16 {
            let connect = TcpStream::connect(addr);
            match time::timeout(Duration::from_millis(200), connect).await {
                Ok(Ok(stream)) => held.push(stream),
                _ => break,
            }
        }

        let started = Instant::now();
        let emitted = time::timeout(
            TCP_EMIT_TIMEOUT + Duration::from_secs(3),
            StatsOutput::tcp(addr.to_string()).emit(&sample()),
        )
        .await;
        assert!(matches!(emitted, Ok(Ok(()))));
        assert!(started.elapsed() < TCP_EMIT_TIMEOUT + Duration::from_secs(1));
        drop(listener);
    }
}
