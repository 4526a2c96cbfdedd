//! Status LED rendering.
//!
//! The indicator owns the rendered state: commands arrive on a watch channel
//! (the newest command always wins) and a 200 ms tick renders the current
//! command onto a [`StatusPin`].

use std::sync::Arc;
use std::time::Duration;

use fieldlink_types::LedCommand;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

/// Render tick of the indicator.
pub const BLINK_INTERVAL: Duration = Duration::from_millis(200);

/// A boolean-drivable output.
pub trait StatusPin: Send + Sync + 'static {
    /// Drive the output high (`true`) or low (`false`).
    fn set(&self, on: bool);
}

impl<P: StatusPin + ?Sized> StatusPin for Arc<P> {
    fn set(&self, on: bool) {
        (**self).set(on)
    }
}

/// Sends commands to a running [`LedIndicator`].
#[derive(Debug, Clone)]
pub struct LedHandle {
    tx: Arc<watch::Sender<LedCommand>>,
}

impl LedHandle {
    /// Replace the current command. Never blocks.
    pub fn command(&self, command: LedCommand) {
        self.tx.send_replace(command);
    }

    /// The most recently issued command.
    pub fn current(&self) -> LedCommand {
        *self.tx.borrow()
    }
}

/// Renders [`LedCommand`]s onto a pin.
pub struct LedIndicator<P> {
    pin: P,
    rx: watch::Receiver<LedCommand>,
    interval: Duration,
    last: bool,
}

impl<P: StatusPin> LedIndicator<P> {
    /// Create an indicator starting in [`LedCommand::Off`], and its handle.
    pub fn new(pin: P) -> (Self, LedHandle) {
        let (tx, rx) = watch::channel(LedCommand::Off);
        let indicator = Self {
            pin,
            rx,
            interval: BLINK_INTERVAL,
            last: false,
        };
        (indicator, LedHandle { tx: Arc::new(tx) })
    }

    /// Override the render tick.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the render loop forever.
    pub async fn run(mut self) {
        let mut tick = time::interval_at(Instant::now() + self.interval, self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        loop {
            tokio::select! {
                changed = self.rx.changed(), if commands_open => {
                    if changed.is_err() {
                        debug!("led command channel closed, holding last command");
                        commands_open = false;
                        continue;
                    }
                    let command = *self.rx.borrow_and_update();
                    self.apply(command);
                }
                _ = tick.tick() => {
                    let command = *self.rx.borrow();
                    self.render(command);
                }
            }
        }
    }

    /// Steady commands take effect immediately.
    fn apply(&mut self, command: LedCommand) {
        match command {
            LedCommand::Off => self.pin.set(false),
            LedCommand::On => self.pin.set(true),
            _ => {}
        }
    }

    fn render(&mut self, command: LedCommand) {
        match command {
            LedCommand::Off => self.pin.set(false),
            LedCommand::On => self.pin.set(true),
            LedCommand::BlinkSlow => {
                self.last = !self.last;
                self.pin.set(self.last);
            }
            LedCommand::BlinkMedium | LedCommand::BlinkFast => {}
        }
    }
}
