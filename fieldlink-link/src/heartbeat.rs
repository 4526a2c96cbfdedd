//! MCU liveness supervision.
//!
//! The monitor runs four cooperating activities over one heartbeat socket:
//!
//! ```text
//!   socket ──read──▶ receive ──seen──▶ watchdog ──┐
//!                       │                          ├─verdict─▶ consensus ──▶ LED
//!                       └──────────── not-ok ──────┘
//!   WAN monitor ──state──▶ forward ──write──▶ socket
//! ```
//!
//! The watchdog's timeout clock is decoupled from socket I/O, so a slow read
//! never stalls it. All hand-offs use depth-1 queues.

use std::sync::Arc;
use std::time::Duration;

use fieldlink_types::{Heartbeat, LedCommand, WanState};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time;
use tracing::{debug, info};

use crate::error::LinkError;
use crate::framing::{FrameReader, FrameWriter};
use crate::led::LedHandle;
use crate::state::SharedState;

/// Silence after which the watchdog reports a liveness failure.
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(2);

/// Consecutive ok verdicts needed before the LED goes steady on.
const OK_STREAK_THRESHOLD: u8 = 5;

/// Turns a stream of liveness verdicts into LED commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Consensus {
    okay: u8,
}

impl Consensus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current consecutive-success count.
    pub fn streak(&self) -> u8 {
        self.okay
    }

    /// Feed one verdict; returns the LED command it triggers, if any.
    ///
    /// Every ok verdict past the fifth in a row commands steady on. Any
    /// failure resets the streak and commands a slow blink.
    pub fn observe(&mut self, ok: bool) -> Option<LedCommand> {
        if !ok {
            self.okay = 0;
            return Some(LedCommand::BlinkSlow);
        }
        self.okay = (self.okay + 1).min(OK_STREAK_THRESHOLD + 1);
        if self.okay > OK_STREAK_THRESHOLD {
            self.okay = OK_STREAK_THRESHOLD;
            return Some(LedCommand::On);
        }
        None
    }
}

/// Supervises MCU liveness and relays WAN status to the MCU.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    led: LedHandle,
    state: Arc<SharedState>,
    timeout: Duration,
}

impl HeartbeatMonitor {
    pub fn new(led: LedHandle, state: Arc<SharedState>) -> Self {
        Self {
            led,
            state,
            timeout: HEARTBEAT_TIMEOUT,
        }
    }

    /// Override the watchdog timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run until the link fails.
    ///
    /// Returns [`LinkError::Read`] when the socket read fails and
    /// [`LinkError::ForwardWrite`] when a WAN status write fails.
    pub async fn run<R, W>(
        self,
        reader: FrameReader<R>,
        writer: FrameWriter<W>,
        wan_rx: mpsc::Receiver<WanState>,
    ) -> Result<(), LinkError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (seen_tx, seen_rx) = mpsc::channel(1);
        let (verdict_tx, verdict_rx) = mpsc::channel(1);

        // Dropping the set aborts the helpers when the monitor returns.
        let mut helpers = JoinSet::new();
        helpers.spawn(watchdog(seen_rx, verdict_tx.clone(), self.timeout));
        helpers.spawn(consensus(verdict_rx, self.led));

        info!("heartbeat socket: connected ok");

        tokio::select! {
            res = forward(writer, wan_rx) => res,
            res = receive(reader, seen_tx, verdict_tx, self.state) => res,
        }
    }
}

async fn watchdog(
    mut seen_rx: mpsc::Receiver<()>,
    verdict_tx: mpsc::Sender<bool>,
    timeout: Duration,
) {
    loop {
        let verdict = match time::timeout(timeout, seen_rx.recv()).await {
            Ok(Some(())) => true,
            Ok(None) => return,
            Err(_) => {
                debug!(timeout_ms = timeout.as_millis() as u64, "heartbeat timed out");
                false
            }
        };
        if verdict_tx.send(verdict).await.is_err() {
            return;
        }
    }
}

async fn consensus(mut verdict_rx: mpsc::Receiver<bool>, led: LedHandle) {
    let mut consensus = Consensus::new();
    while let Some(ok) = verdict_rx.recv().await {
        if let Some(command) = consensus.observe(ok) {
            led.command(command);
        }
    }
}

async fn forward<W: AsyncWrite + Unpin>(
    mut writer: FrameWriter<W>,
    mut wan_rx: mpsc::Receiver<WanState>,
) -> Result<(), LinkError> {
    while let Some(state) = wan_rx.recv().await {
        writer
            .write_frame(&state.to_frame())
            .await
            .map_err(LinkError::ForwardWrite)?;
    }
    Err(LinkError::QueueClosed("wan"))
}

async fn receive<R: AsyncRead + Unpin>(
    mut reader: FrameReader<R>,
    seen_tx: mpsc::Sender<()>,
    verdict_tx: mpsc::Sender<bool>,
    state: Arc<SharedState>,
) -> Result<(), LinkError> {
    loop {
        let frame = reader
            .read_frame()
            .await
            .map_err(|source| LinkError::Read {
                channel: "heartbeat",
                source,
            })?;

        match Heartbeat::parse(&frame) {
            Some(heartbeat) => {
                state.set_mcu_build(heartbeat.mcu_build);
                seen_tx
                    .send(())
                    .await
                    .map_err(|_| LinkError::QueueClosed("heartbeat"))?;
            }
            None => {
                debug!(len = frame.len(), "invalid heartbeat frame");
                verdict_tx
                    .send(false)
                    .await
                    .map_err(|_| LinkError::QueueClosed("heartbeat"))?;
            }
        }
    }
}
