//! Scheduler behaviour with a remote that takes real time to answer.

use offsync_core::{LocalStore, Record, RecordId, Table};
use offsync_engine::{EngineConfig, SchedulerState, SyncEngine, SyncScheduler};
use offsync_remote::{MemoryRemote, RemoteConnector, RemoteResult, RemoteSettings, RemoteStore};
use offsync_testkit::TestHarness;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

/// Wraps a memory remote, sleeping in every call and tracking overlap.
struct SlowRemote {
    inner: MemoryRemote,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    pings: AtomicUsize,
}

impl SlowRemote {
    fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryRemote::new(),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            pings: AtomicUsize::new(0),
        }
    }

    fn slow<T>(&self, f: impl FnOnce() -> T) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        let out = f();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

impl RemoteStore for SlowRemote {
    fn ping(&self) -> RemoteResult<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        self.slow(|| self.inner.ping())
    }

    fn upsert(&self, table: Table, record: &Record) -> RemoteResult<()> {
        self.slow(|| self.inner.upsert(table, record))
    }

    fn fetch_for_owner(&self, table: Table, owner_id: RecordId) -> RemoteResult<Vec<Record>> {
        self.slow(|| self.inner.fetch_for_owner(table, owner_id))
    }
}

/// Blocks every ping until the test releases it.
struct GatedRemote {
    inner: MemoryRemote,
    entered: parking_lot::Mutex<mpsc::Sender<()>>,
    release: parking_lot::Mutex<mpsc::Receiver<()>>,
}

impl RemoteStore for GatedRemote {
    fn ping(&self) -> RemoteResult<()> {
        let _ = self.entered.lock().send(());
        let _ = self.release.lock().recv_timeout(Duration::from_secs(5));
        self.inner.ping()
    }

    fn upsert(&self, table: Table, record: &Record) -> RemoteResult<()> {
        self.inner.upsert(table, record)
    }

    fn fetch_for_owner(&self, table: Table, owner_id: RecordId) -> RemoteResult<Vec<Record>> {
        self.inner.fetch_for_owner(table, owner_id)
    }
}

fn engine_over<S: RemoteStore>(remote: S, interval: Duration) -> SyncEngine<S> {
    SyncEngine::new(
        Arc::new(LocalStore::open_in_memory().unwrap()),
        RemoteConnector::new(RemoteSettings::new("memory://", "token"), remote),
        EngineConfig::default().with_sync_interval(interval),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn attempts_never_overlap() {
    let remote = Arc::new(SlowRemote::new(Duration::from_millis(20)));
    let engine = Arc::new(engine_over(Arc::clone(&remote), Duration::from_millis(5)));
    let owner = engine
        .create_account(offsync_core::NewAccount::new("alice", "h"))
        .unwrap();
    for name in ["Rex", "Max", "Bella"] {
        engine
            .create_pet(owner, offsync_core::NewPet::new(name, "dog"))
            .unwrap();
    }

    let scheduler = SyncScheduler::new(Arc::clone(&engine));
    scheduler.start(owner).unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(scheduler.stop());

    assert!(remote.pings.load(Ordering::SeqCst) >= 2);
    assert_eq!(remote.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(engine.sync_status().total_pending, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn restart_waits_for_previous_session_attempt() {
    let remote = Arc::new(SlowRemote::new(Duration::from_millis(100)));
    let engine = Arc::new(engine_over(Arc::clone(&remote), Duration::from_secs(60)));
    let owner = engine
        .create_account(offsync_core::NewAccount::new("alice", "h"))
        .unwrap();
    for name in ["Rex", "Max", "Bella"] {
        engine
            .create_pet(owner, offsync_core::NewPet::new(name, "dog"))
            .unwrap();
    }

    let scheduler = SyncScheduler::new(Arc::clone(&engine));
    let mut reports = scheduler.subscribe();
    scheduler.start(owner).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    let second = scheduler.start(owner).unwrap();

    tokio::time::timeout(Duration::from_secs(5), reports.changed())
        .await
        .unwrap()
        .unwrap();
    let report = reports.borrow_and_update().clone().unwrap();
    assert!(scheduler.stop());

    assert_eq!(report.session, second);
    assert_eq!(report.attempt, 1);
    assert_eq!(remote.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(engine.sync_status().total_pending, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn result_of_attempt_in_flight_at_stop_is_discarded() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let remote = GatedRemote {
        inner: MemoryRemote::new(),
        entered: parking_lot::Mutex::new(entered_tx),
        release: parking_lot::Mutex::new(release_rx),
    };
    let engine = Arc::new(engine_over(remote, Duration::from_secs(60)));
    let scheduler = SyncScheduler::new(Arc::clone(&engine));
    let mut reports = scheduler.subscribe();

    scheduler.start(RecordId::new()).unwrap();
    tokio::task::spawn_blocking(move || entered_rx.recv_timeout(Duration::from_secs(5)))
        .await
        .unwrap()
        .unwrap();

    assert!(scheduler.stop());
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    release_tx.send(()).unwrap();

    // Give the attempt time to finish.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!reports.has_changed().unwrap());
    assert!(reports.borrow_and_update().is_none());
}

#[tokio::test(start_paused = true)]
async fn offline_period_keeps_cadence_then_catches_up() {
    let h = TestHarness::memory();
    let owner = h.account("alice");
    h.pet(owner, "Rex");
    h.go_offline();

    let scheduler = h.scheduler();
    let mut reports = scheduler.subscribe();
    scheduler.start(owner).unwrap();

    reports.changed().await.unwrap();
    let first = reports.borrow_and_update().clone().unwrap();
    assert!(first.last_sync.is_none());
    assert_eq!(first.status.total_pending, 2);

    h.remote.set_reachable(true);
    reports.changed().await.unwrap();
    let second = reports.borrow_and_update().clone().unwrap();
    assert_eq!(second.attempt, 2);
    assert_eq!(second.last_sync.unwrap().total_pushed(), 2);
    assert!(second.status.is_online);
    assert_eq!(second.status.total_pending, 0);
}
