//! Periodic sync scheduler.
//!
//! ```text
//!            start(owner)
//!   Idle ──────────────────► Armed ──┐ tick: attempt, report, re-arm
//!    ▲                          │ ◄──┘
//!    └────────── stop() ────────┘
//! ```
//!
//! While armed, a tokio task ticks at a fixed period (first tick immediate).
//! Each tick runs one blocking attempt on the blocking pool and awaits it
//! before the next tick can fire. Attempts also hold a gate shared by every
//! session of the scheduler, so a restarted session waits for the attempt
//! its predecessor still has in flight. Stopping signals the task through a
//! `watch` channel; an attempt already in flight is left to finish and its
//! result is dropped.

use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use crate::report::{FullSyncReport, SyncStatusSnapshot};
use offsync_core::RecordId;
use offsync_remote::RemoteStore;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// No session; nothing runs.
    Idle,
    /// A session is active and the next attempt is scheduled.
    Armed,
}

/// What one scheduled attempt produced.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Session that ran the attempt. Restarting starts a new session.
    pub session: u64,
    /// Owner being synced.
    pub owner_id: RecordId,
    /// Attempt number within the session, from 1.
    pub attempt: u64,
    /// Status after the attempt.
    pub status: SyncStatusSnapshot,
    /// Result of the full sync; `None` if the remote was unavailable.
    pub last_sync: Option<FullSyncReport>,
    /// Local failure during the attempt, if any.
    pub error: Option<String>,
}

struct Session {
    id: u64,
    owner_id: RecordId,
    cancel: watch::Sender<bool>,
}

impl Session {
    fn cancel(&self) {
        self.cancel.send_replace(true);
    }
}

/// Drives [`SyncEngine::sync_attempt`] at a fixed period for one owner.
pub struct SyncScheduler<S> {
    engine: Arc<SyncEngine<S>>,
    interval: Duration,
    session: Mutex<Option<Session>>,
    next_session: AtomicU64,
    reports: Arc<watch::Sender<Option<SyncReport>>>,
    attempt_gate: Arc<Mutex<()>>,
}

impl<S: RemoteStore + 'static> SyncScheduler<S> {
    /// Creates an idle scheduler using the engine's configured interval.
    pub fn new(engine: Arc<SyncEngine<S>>) -> Self {
        let interval = engine.config().sync_interval;
        let (reports, _) = watch::channel(None);
        Self {
            engine,
            interval,
            session: Mutex::new(None),
            next_session: AtomicU64::new(1),
            reports: Arc::new(reports),
            attempt_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the engine.
    pub fn engine(&self) -> &Arc<SyncEngine<S>> {
        &self.engine
    }

    /// Returns the current state.
    pub fn state(&self) -> SchedulerState {
        if self.session.lock().is_some() {
            SchedulerState::Armed
        } else {
            SchedulerState::Idle
        }
    }

    /// Returns the owner of the active session.
    pub fn owner(&self) -> Option<RecordId> {
        self.session.lock().as_ref().map(|s| s.owner_id)
    }

    /// Subscribes to attempt reports. The latest report is kept.
    pub fn subscribe(&self) -> watch::Receiver<Option<SyncReport>> {
        self.reports.subscribe()
    }

    /// Arms the scheduler for `owner_id`; the first attempt runs at once.
    ///
    /// Starting while armed ends the current session and starts a new one.
    /// Returns the new session id.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Runtime`] when called outside a tokio runtime,
    /// and [`SyncError::Config`] when the configured interval is zero.
    pub fn start(&self, owner_id: RecordId) -> SyncResult<u64> {
        if self.interval.is_zero() {
            return Err(SyncError::config("sync_interval", "must be greater than zero"));
        }
        let handle = Handle::try_current().map_err(|e| SyncError::Runtime(e.to_string()))?;

        let mut session = self.session.lock();
        if let Some(previous) = session.take() {
            previous.cancel();
            info!(session = previous.id, "sync session replaced");
        }

        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        let (cancel, cancelled) = watch::channel(false);
        handle.spawn(run_session(
            Arc::clone(&self.engine),
            SessionParams {
                id,
                owner_id,
                interval: self.interval,
            },
            cancelled,
            Arc::clone(&self.reports),
            Arc::clone(&self.attempt_gate),
        ));
        *session = Some(Session {
            id,
            owner_id,
            cancel,
        });

        info!(session = id, %owner_id, interval_secs = self.interval.as_secs(), "sync scheduler armed");
        Ok(id)
    }

    /// Ends the session. Returns false if the scheduler was already idle.
    pub fn stop(&self) -> bool {
        let Some(session) = self.session.lock().take() else {
            return false;
        };
        session.cancel();
        info!(session = session.id, "sync scheduler idle");
        true
    }
}

impl<S> Drop for SyncScheduler<S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.cancel();
        }
    }
}

impl<S> std::fmt::Debug for SyncScheduler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session.lock();
        f.debug_struct("SyncScheduler")
            .field("interval", &self.interval)
            .field("session", &session.as_ref().map(|s| s.id))
            .finish()
    }
}

#[derive(Clone, Copy)]
struct SessionParams {
    id: u64,
    owner_id: RecordId,
    interval: Duration,
}

async fn run_session<S: RemoteStore + 'static>(
    engine: Arc<SyncEngine<S>>,
    params: SessionParams,
    mut cancelled: watch::Receiver<bool>,
    reports: Arc<watch::Sender<Option<SyncReport>>>,
    gate: Arc<Mutex<()>>,
) {
    let SessionParams {
        id,
        owner_id,
        interval,
    } = params;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempt = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = cancelled.changed() => break,
            _ = ticker.tick() => {}
        }
        if *cancelled.borrow() {
            break;
        }

        attempt += 1;
        let worker = Arc::clone(&engine);
        let gate = Arc::clone(&gate);
        let joined = tokio::task::spawn_blocking(move || {
            let _turn = gate.lock();
            let result = worker.sync_attempt(owner_id);
            (result, worker.sync_status())
        })
        .await;

        let (last_sync, status, failure) = match joined {
            Ok((Ok(last_sync), status)) => (last_sync, status, None),
            Ok((Err(err), status)) => {
                error!(session = id, attempt, error = %err, "sync attempt failed");
                (None, status, Some(err.to_string()))
            }
            Err(err) => {
                error!(session = id, attempt, error = %err, "sync attempt aborted");
                (None, engine.sync_status(), Some(err.to_string()))
            }
        };
        let report = SyncReport {
            session: id,
            owner_id,
            attempt,
            status,
            last_sync,
            error: failure,
        };

        let published = reports.send_if_modified(|slot| {
            if *cancelled.borrow() {
                return false;
            }
            *slot = Some(report);
            true
        });
        if !published {
            debug!(session = id, attempt, "session ended during attempt; result discarded");
            break;
        }
    }

    debug!(session = id, attempts = attempt, "sync session finished");
}
