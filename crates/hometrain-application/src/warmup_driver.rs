//! Warm-up driver.
//!
//! Runs a [`WarmupSequencer`] against wall-clock time: a one-second ticker
//! feeds the countdown while user commands arrive on a channel. The driver
//! owns the sequencer for the duration of the warm-up and hands back its
//! summary.

use hometrain_core::warmup::{WarmupSequencer, WarmupSignal, WarmupState, WarmupSummary};
use std::time::Duration;
use strum::{Display, EnumString};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

/// User action during the warm-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WarmupCommand {
    Start,
    Pause,
    Advance,
    Skip,
    Reset,
}

pub struct WarmupDriver {
    sequencer: WarmupSequencer,
    auto_continue: bool,
    tick: Duration,
}

impl WarmupDriver {
    pub fn new(sequencer: WarmupSequencer, auto_continue: bool) -> Self {
        Self {
            sequencer,
            auto_continue,
            tick: Duration::from_secs(1),
        }
    }

    pub fn sequencer(&self) -> &WarmupSequencer {
        &self.sequencer
    }

    /// Drives the warm-up to its end.
    ///
    /// With `auto_continue` the first step starts immediately and each next
    /// step starts as soon as the previous one ends; otherwise every step
    /// waits for [`WarmupCommand::Start`]. A closed command channel or a
    /// cancelled token skips the rest of the warm-up.
    ///
    /// # Arguments
    ///
    /// * `commands` - User actions
    /// * `signals` - Receives every countdown signal
    /// * `cancel` - Stops the warm-up early
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<WarmupCommand>,
        signals: mpsc::Sender<WarmupSignal>,
        cancel: CancellationToken,
    ) -> WarmupSummary {
        let step = u32::try_from(self.tick.as_secs()).unwrap_or(1).max(1);
        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(
            "[WarmupDriver] Starting warm-up with {} step(s)",
            self.sequencer.steps().len()
        );

        loop {
            if let Some(summary) = self.sequencer.summary() {
                tracing::debug!(
                    "[WarmupDriver] Finished: {}/{} steps",
                    summary.steps_completed,
                    summary.total_steps
                );
                return summary;
            }
            if self.auto_continue && matches!(self.sequencer.state(), WarmupState::Ready(_)) {
                self.start();
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("[WarmupDriver] Cancelled, skipping the rest");
                    return self.sequencer.skip();
                }
                command = commands.recv() => match command {
                    Some(command) => {
                        if let Some(signal) = self.apply(command) {
                            let _ = signals.send(signal).await;
                        }
                    }
                    None => return self.sequencer.skip(),
                },
                _ = ticker.tick() => {
                    let signal = self.sequencer.tick(step);
                    if signal != WarmupSignal::Idle {
                        let _ = signals.send(signal).await;
                    }
                }
            }
        }
    }

    fn start(&mut self) {
        if let Err(err) = self.sequencer.start() {
            tracing::debug!("[WarmupDriver] start ignored: {}", err);
        }
    }

    fn apply(&mut self, command: WarmupCommand) -> Option<WarmupSignal> {
        tracing::debug!("[WarmupDriver] Command: {}", command);
        match command {
            WarmupCommand::Start => {
                self.start();
                None
            }
            WarmupCommand::Pause => {
                if let Err(err) = self.sequencer.pause() {
                    tracing::debug!("[WarmupDriver] pause ignored: {}", err);
                }
                None
            }
            WarmupCommand::Advance => Some(self.sequencer.advance()),
            WarmupCommand::Skip => Some(WarmupSignal::Completed(self.sequencer.skip())),
            WarmupCommand::Reset => {
                self.sequencer.reset();
                None
            }
        }
    }
}
