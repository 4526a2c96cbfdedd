//! Stage wiring.
//!
//! ```text
//!   probe ──flag──▶ WAN monitor ──▶ heartbeat monitor ◀──▶ heartbeat socket
//!                                          │
//!                                          ▼
//!                                    LED indicator ──▶ status pin
//!
//!   stats socket ──▶ stats aggregator ──▶ stats output
//!   data socket  ──▶ decoder ──▶ telemetry sink
//! ```
//!
//! Every stage runs as its own task. The first stage to fail ends the
//! gateway; there is no reconnect.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use fieldlink_decode::{Decoder, HttpSink, KeyStore, LogSink, TelemetrySink};
use fieldlink_link::{
    FrameReader, FrameWriter, HeartbeatMonitor, LedIndicator, LinkError, ReachabilityFlag,
    SharedState, StatsAggregator, StatusPin, WanMonitor,
};
use tokio::net::UnixStream;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::Settings;
use crate::indicator::{LogPin, SysfsPin};
use crate::probe::Probe;

/// Connect to a local socket. A leading `@` names a Linux abstract socket.
pub async fn connect(path: &str) -> io::Result<UnixStream> {
    if let Some(name) = path.strip_prefix('@') {
        return connect_abstract(name);
    }
    UnixStream::connect(path).await
}

#[cfg(target_os = "linux")]
fn connect_abstract(name: &str) -> io::Result<UnixStream> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::{SocketAddr, UnixStream as StdUnixStream};

    let addr = SocketAddr::from_abstract_name(name)?;
    let stream = StdUnixStream::connect_addr(&addr)?;
    stream.set_nonblocking(true)?;
    UnixStream::from_std(stream)
}

#[cfg(not(target_os = "linux"))]
fn connect_abstract(_name: &str) -> io::Result<UnixStream> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "abstract sockets are only available on Linux",
    ))
}

async fn connect_endpoint(path: &str) -> Result<UnixStream, LinkError> {
    let stream = connect(path).await.map_err(|source| LinkError::Connect {
        endpoint: path.to_string(),
        source,
    })?;
    info!(endpoint = path, "socket connected");
    Ok(stream)
}

/// Run the gateway until a stage fails.
///
/// A returned error wrapping a [`LinkError`] carries the process exit code.
pub async fn run(settings: Settings, keys: Arc<KeyStore>) -> Result<()> {
    let state = SharedState::new();
    let flag = ReachabilityFlag::new(false);
    let max_len = settings.sockets.max_frame_len;

    let heartbeat = connect_endpoint(&settings.sockets.heartbeat).await?;
    let stats = connect_endpoint(&settings.sockets.stats).await?;
    let data = connect_endpoint(&settings.sockets.data).await?;

    let pin: Arc<dyn StatusPin> = match &settings.indicator.path {
        Some(path) => Arc::new(SysfsPin::new(path)),
        None => Arc::new(LogPin),
    };
    let (indicator, led) = LedIndicator::new(pin);

    let sink: Arc<dyn TelemetrySink> = if settings.sink.url.is_empty() {
        info!("no sink url set, readings will be logged only");
        Arc::new(LogSink)
    } else {
        info!(url = %settings.sink.url, "publishing readings");
        Arc::new(
            HttpSink::new(&settings.sink.url, settings.sink.timeout())
                .context("Failed to create telemetry client")?,
        )
    };
    let decoder = Decoder::new(keys.clone(), sink, state.clone());

    let probe = Probe::new(
        settings.probe.address.clone(),
        settings.probe.interval(),
        settings.probe.timeout(),
        flag.clone(),
    );
    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;

    let (wan_tx, wan_rx) = mpsc::channel(1);
    let (hb_rd, hb_wr) = heartbeat.into_split();
    let aggregator = StatsAggregator::new(state.clone()).output(settings.stats.output()?);
    let site_id = settings.site_id.clone();

    let mut tasks: JoinSet<Result<(), LinkError>> = JoinSet::new();
    tasks.spawn(async move {
        indicator.run().await;
        Ok(())
    });
    tasks.spawn(async move {
        probe.run().await;
        Ok(())
    });
    tasks.spawn(async move {
        while hangup.recv().await.is_some() {
            match keys.reload() {
                Ok(len) => info!(keys = len, "key table reloaded"),
                Err(e) => warn!(error = %e, "key reload failed, keeping previous table"),
            }
        }
        Ok(())
    });
    tasks.spawn(WanMonitor::new(flag, wan_tx).run());
    tasks.spawn(HeartbeatMonitor::new(led, state).run(
        FrameReader::new(hb_rd).with_max_len(max_len),
        FrameWriter::new(hb_wr),
        wan_rx,
    ));
    tasks.spawn(aggregator.run(FrameReader::new(stats).with_max_len(max_len)));
    tasks.spawn(async move {
        decoder
            .run(FrameReader::new(data).with_max_len(max_len), &site_id)
            .await
    });

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(e) => return Err(anyhow::Error::new(e).context("gateway task panicked")),
        }
    }
    Ok(())
}
