//! Abandonment monitor.
//!
//! Reacts to environment signals (page unload, app backgrounded, app
//! foregrounded) by persisting a best-effort snapshot of the ledger through
//! the session store's abandon operation. Every snapshot write holds the
//! session's single-flight permit until the store answers, so it never
//! overlaps a progress update for the same session.

use crate::ledger::SharedLedger;
use crate::update_client::SingleFlight;
use hometrain_core::session::{AbandonOutcome, AbandonReason, SessionRepository};
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Lifecycle signal from the hosting environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EnvironmentSignal {
    Unload,
    Backgrounded,
    Foregrounded,
}

/// What the monitor did with a signal.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotDisposition {
    /// Nothing was sent.
    Skipped(&'static str),
    /// Handed to a detached task; the result is only logged.
    Spawned,
    Persisted(AbandonOutcome),
    Failed(String),
}

pub struct AbandonmentMonitor {
    sessions: Arc<dyn SessionRepository>,
    ledger: SharedLedger,
    flights: Arc<SingleFlight>,
    snapshot_timeout: Duration,
    unload_writes: Mutex<JoinSet<()>>,
}

impl AbandonmentMonitor {
    /// # Arguments
    ///
    /// * `sessions` - Store receiving the abandon snapshot
    /// * `ledger` - Ledger shared with the session controller
    /// * `flights` - Single-flight guard shared with the update client
    /// * `snapshot_timeout` - Bound on the backgrounded snapshot write
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        ledger: SharedLedger,
        flights: Arc<SingleFlight>,
        snapshot_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            ledger,
            flights,
            snapshot_timeout,
            unload_writes: Mutex::new(JoinSet::new()),
        }
    }

    /// Page is going away. Fires the snapshot without waiting for it, and
    /// only when the ledger holds progress the store has not acknowledged.
    pub async fn on_unload(&self) -> SnapshotDisposition {
        let snapshot = {
            let ledger = self.ledger.read().await;
            if !ledger.is_session_active() {
                return SnapshotDisposition::Skipped("no active session");
            }
            if !ledger.has_unsynced() {
                return SnapshotDisposition::Skipped("nothing unsynced");
            }
            ledger.snapshot(AbandonReason::Unload)
        };
        let Some((session_id, request)) = snapshot else {
            return SnapshotDisposition::Skipped("no active session");
        };
        let Ok(permit) = self.flights.try_acquire(&session_id) else {
            return SnapshotDisposition::Skipped("update in flight");
        };

        let sessions = Arc::clone(&self.sessions);
        self.unload_writes.lock().await.spawn(async move {
            let _permit = permit;
            match sessions.handle_abandon(&session_id, &request).await {
                Ok(outcome) => tracing::debug!(
                    "[AbandonmentMonitor] Unload snapshot for {} stored ({})",
                    session_id,
                    outcome.final_status
                ),
                Err(err) => tracing::warn!(
                    "[AbandonmentMonitor] Unload snapshot for {} lost: {}",
                    session_id,
                    err
                ),
            }
        });
        SnapshotDisposition::Spawned
    }

    /// Waits up to `limit` for detached unload writes. Returns `false` when
    /// some were still running at the deadline.
    pub async fn flush(&self, limit: Duration) -> bool {
        let mut writes = self.unload_writes.lock().await;
        let drained = tokio::time::timeout(limit, async {
            while let Some(joined) = writes.join_next().await {
                if let Err(err) = joined {
                    tracing::warn!("[AbandonmentMonitor] Unload write panicked: {}", err);
                }
            }
        })
        .await
        .is_ok();
        if !drained {
            tracing::warn!(
                "[AbandonmentMonitor] {} unload write(s) still pending after {:?}",
                writes.len(),
                limit
            );
        }
        drained
    }

    /// App moved to the background. Writes a bounded snapshot and marks the
    /// ledger stale so the next user action reconciles with the store.
    pub async fn on_background(&self) -> SnapshotDisposition {
        let should_snapshot = {
            let ledger = self.ledger.read().await;
            ledger.is_session_active() && ledger.has_progress()
        };
        if !should_snapshot {
            return SnapshotDisposition::Skipped("no progress to save");
        }

        let disposition = match tokio::time::timeout(
            self.snapshot_timeout,
            self.persist_snapshot(AbandonReason::Backgrounded),
        )
        .await
        {
            Ok(disposition) => disposition,
            Err(_) => {
                tracing::warn!(
                    "[AbandonmentMonitor] Background snapshot timed out after {:?}",
                    self.snapshot_timeout
                );
                SnapshotDisposition::Failed("timed out".to_string())
            }
        };

        self.ledger.write().await.mark_stale();
        disposition
    }

    /// App came back. Returns the session to reconcile, if any.
    pub async fn on_foreground(&self) -> Option<String> {
        let ledger = self.ledger.read().await;
        if ledger.is_session_active() {
            ledger.session_id().map(str::to_string)
        } else {
            None
        }
    }

    /// Sends the ledger snapshot and waits for the store's answer.
    pub async fn persist_snapshot(&self, reason: AbandonReason) -> SnapshotDisposition {
        let Some((session_id, request)) = self.ledger.read().await.snapshot(reason) else {
            return SnapshotDisposition::Skipped("no active session");
        };
        let Ok(_permit) = self.flights.try_acquire(&session_id) else {
            tracing::debug!(
                "[AbandonmentMonitor] Update in flight for {}, snapshot skipped",
                session_id
            );
            return SnapshotDisposition::Skipped("update in flight");
        };

        tracing::info!(
            "[AbandonmentMonitor] Persisting {} snapshot for {} ({} exercise(s))",
            reason,
            session_id,
            request.current_progress.len()
        );
        match self.sessions.handle_abandon(&session_id, &request).await {
            Ok(outcome) => SnapshotDisposition::Persisted(outcome),
            Err(err) => {
                tracing::warn!(
                    "[AbandonmentMonitor] Snapshot for {} failed: {}",
                    session_id,
                    err
                );
                SnapshotDisposition::Failed(err.to_string())
            }
        }
    }

    /// Runs the monitor until `cancel` fires or the signal channel closes.
    ///
    /// Signals already queued are handled before cancellation is observed.
    /// Foreground signals forward the session id to `reconcile`.
    pub fn spawn(
        self: Arc<Self>,
        mut signals: mpsc::Receiver<EnvironmentSignal>,
        reconcile: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::debug!("[AbandonmentMonitor] Started");
            loop {
                let signal = tokio::select! {
                    biased;
                    signal = signals.recv() => match signal {
                        Some(signal) => signal,
                        None => break,
                    },
                    _ = cancel.cancelled() => break,
                };

                match signal {
                    EnvironmentSignal::Unload => {
                        let disposition = self.on_unload().await;
                        tracing::debug!("[AbandonmentMonitor] unload: {:?}", disposition);
                    }
                    EnvironmentSignal::Backgrounded => {
                        let disposition = self.on_background().await;
                        tracing::debug!("[AbandonmentMonitor] backgrounded: {:?}", disposition);
                    }
                    EnvironmentSignal::Foregrounded => {
                        if let Some(session_id) = self.on_foreground().await
                            && reconcile.send(session_id).await.is_err()
                        {
                            tracing::debug!("[AbandonmentMonitor] Reconcile receiver dropped");
                        }
                    }
                }
            }
            tracing::debug!("[AbandonmentMonitor] Stopped");
        })
    }
}
