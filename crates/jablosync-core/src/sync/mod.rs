// ── Synchronization coordinator ──
//
// Owns the polling loop. Each cycle fetches sections, gates, and sensors
// concurrently under one timeout, swaps the result into the store,
// reconciles pending commands, then notifies subscribers. Failures back
// off exponentially and, past a threshold, mark the data degraded.

mod backoff;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use jablosync_api::RemoteClient;
use serde::Serialize;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use backoff::BackoffPolicy;

use crate::command::Dispatcher;
use crate::config::SyncConfig;
use crate::convert::build_snapshot;
use crate::error::CoreError;
use crate::model::Snapshot;
use crate::store::{Availability, SnapshotStore};

type Listener = Arc<dyn Fn(&Arc<Snapshot>) + Send + Sync>;

/// Answer to [`Coordinator::force_refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTicket {
    /// A fetch was requested.
    Scheduled,
    /// A fetch was already requested; this call shares it.
    Coalesced,
    /// The polling loop isn't running; nothing was requested.
    NotRunning,
}

/// Health of the polling loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub running: bool,
    pub consecutive_failures: u32,
    /// Wait before the next scheduled cycle.
    pub next_delay: Duration,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

struct RunState {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives polling for one installation.
///
/// Cheaply cloneable; clones share the same loop and state.
pub struct Coordinator<C: RemoteClient> {
    inner: Arc<CoordinatorInner<C>>,
}

impl<C: RemoteClient> Clone for Coordinator<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<C: RemoteClient> {
    client: Arc<C>,
    store: Arc<SnapshotStore>,
    dispatcher: Arc<Dispatcher<C>>,
    poll_timeout: Duration,
    degraded_after: u32,
    max_backoff: Duration,
    backoff: Mutex<BackoffPolicy>,
    refresh_requested: AtomicBool,
    refresh_notify: Notify,
    /// One fetch in flight at a time, loop or on-demand.
    fetch_lock: tokio::sync::Mutex<()>,
    /// Bumped by `start` and `stop`. A loop cycle only applies its result
    /// if the generation it was started under is still current.
    generation: Mutex<u64>,
    run: Mutex<Option<RunState>>,
    status: watch::Sender<SyncStatus>,
    listeners: Mutex<Vec<Listener>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C: RemoteClient> Coordinator<C> {
    pub fn new(
        client: Arc<C>,
        store: Arc<SnapshotStore>,
        dispatcher: Arc<Dispatcher<C>>,
        config: &SyncConfig,
    ) -> Self {
        let backoff = BackoffPolicy::new(config.poll_interval, config.max_backoff);
        let (status, _) = watch::channel(SyncStatus {
            running: false,
            consecutive_failures: 0,
            next_delay: config.poll_interval,
            last_success: None,
            last_error: None,
        });

        Self {
            inner: Arc::new(CoordinatorInner {
                client,
                store,
                dispatcher,
                poll_timeout: config.poll_timeout,
                degraded_after: config.degraded_after.max(1),
                max_backoff: config.max_backoff,
                backoff: Mutex::new(backoff),
                refresh_requested: AtomicBool::new(false),
                refresh_notify: Notify::new(),
                fetch_lock: tokio::sync::Mutex::new(()),
                generation: Mutex::new(0),
                run: Mutex::new(None),
                status,
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start polling. The first cycle runs immediately.
    ///
    /// Returns `false`, changing nothing, if already running.
    pub fn start(&self, poll_interval: Duration, timeout: Duration) -> bool {
        let mut run = lock(&self.inner.run);
        if run.is_some() {
            debug!("coordinator already running");
            return false;
        }

        let generation = {
            let mut current = lock(&self.inner.generation);
            *current += 1;
            *current
        };
        *lock(&self.inner.backoff) = BackoffPolicy::new(poll_interval, self.inner.max_backoff);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_task(
            self.clone(),
            timeout,
            generation,
            cancel.clone(),
        ));
        *run = Some(RunState { cancel, handle });

        self.inner.status.send_modify(|s| {
            s.running = true;
            s.next_delay = poll_interval;
        });
        info!(interval = ?poll_interval, ?timeout, "polling started");
        true
    }

    /// Stop scheduling cycles. A fetch already in flight finishes, but
    /// its result is discarded.
    ///
    /// Returns `false` if not running.
    pub fn stop(&self) -> bool {
        self.halt().is_some()
    }

    /// Like [`stop`](Self::stop), then wait for the loop to exit.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.halt() {
            let _ = handle.await;
        }
    }

    fn halt(&self) -> Option<JoinHandle<()>> {
        let run = lock(&self.inner.run).take()?;
        *lock(&self.inner.generation) += 1;
        run.cancel.cancel();
        self.inner.status.send_modify(|s| s.running = false);
        info!("polling stopped");
        Some(run.handle)
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner.run).is_some()
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Ask the loop to poll now instead of waiting out its delay.
    ///
    /// Returns immediately. Requests made before the loop picks one up
    /// are merged into a single fetch.
    pub fn force_refresh(&self) -> RefreshTicket {
        if !self.is_running() {
            return RefreshTicket::NotRunning;
        }
        if self.inner.refresh_requested.swap(true, Ordering::AcqRel) {
            return RefreshTicket::Coalesced;
        }
        self.inner.refresh_notify.notify_one();
        RefreshTicket::Scheduled
    }

    /// Fetch and apply one snapshot now, waiting for the result.
    ///
    /// Works whether or not the loop is running. Counts toward the
    /// failure streak like any other cycle.
    pub async fn refresh_now(&self) -> Result<Arc<Snapshot>, CoreError> {
        let (_, result) = self.run_cycle(self.inner.poll_timeout, None).await;
        result?.ok_or(CoreError::NoSnapshot)
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn status(&self) -> SyncStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    /// Call `listener` with every applied snapshot, after reconciliation.
    ///
    /// Listeners run on the polling task; keep them quick.
    pub fn on_snapshot(&self, listener: impl Fn(&Arc<Snapshot>) + Send + Sync + 'static) {
        lock(&self.inner.listeners).push(Arc::new(listener));
    }

    // ── Cycle ────────────────────────────────────────────────────────

    /// Clear a pending refresh request that the upcoming fetch satisfies.
    fn take_refresh_request(&self) {
        if self.inner.refresh_requested.swap(false, Ordering::AcqRel) {
            // Consume the stored wakeup so it doesn't trigger a second fetch.
            let _ = self.inner.refresh_notify.notified().now_or_never();
        }
    }

    /// One fetch-and-apply. Returns the delay until the next cycle and
    /// the applied snapshot (`None` if discarded as stale).
    async fn run_cycle(
        &self,
        timeout: Duration,
        generation: Option<u64>,
    ) -> (Duration, Result<Option<Arc<Snapshot>>, CoreError>) {
        let _fetching = self.inner.fetch_lock.lock().await;
        let started = Instant::now();

        match self.fetch(timeout).await {
            Ok(snapshot) => {
                let applied = self.apply(snapshot, started, generation);
                (self.status().next_delay, Ok(applied))
            }
            Err(err) => {
                if self.is_current(generation) {
                    self.record_failure(&err);
                } else {
                    debug!(error = %err, "ignoring failure from stopped poll loop");
                }
                (self.status().next_delay, Err(err))
            }
        }
    }

    async fn fetch(&self, timeout: Duration) -> Result<Snapshot, CoreError> {
        let client = &self.inner.client;
        let fetch_all = async {
            let (sections, gates, sensors) = tokio::join!(
                client.fetch_sections(),
                client.fetch_gates(),
                client.fetch_sensors(),
            );
            Ok::<_, jablosync_api::Error>((sections?, gates?, sensors?))
        };

        let (sections, gates, sensors) = tokio::time::timeout(timeout, fetch_all)
            .await
            .map_err(|_| CoreError::Transport {
                message: format!("poll timed out after {}s", timeout.as_secs()),
                auth: false,
            })??;

        let snapshot = build_snapshot(Utc::now(), sections, gates, sensors);
        debug!(entities = snapshot.len(), "fetched snapshot");
        Ok(snapshot)
    }

    fn is_current(&self, generation: Option<u64>) -> bool {
        generation.is_none_or(|g| g == *lock(&self.inner.generation))
    }

    /// Swap, reconcile, then notify, in that order.
    fn apply(
        &self,
        snapshot: Snapshot,
        fetch_started: Instant,
        generation: Option<u64>,
    ) -> Option<Arc<Snapshot>> {
        let snapshot = Arc::new(snapshot);

        let reissues = {
            let current = lock(&self.inner.generation);
            if generation.is_some_and(|g| g != *current) {
                debug!("discarding snapshot from stopped poll loop");
                return None;
            }

            self.inner.store.swap(Arc::clone(&snapshot));
            let reissues = self.inner.dispatcher.reconcile(&snapshot, fetch_started);
            self.record_success(&snapshot);
            self.inner.store.publish(&snapshot);
            reissues
        };

        for reissue in reissues {
            let dispatcher = Arc::clone(&self.inner.dispatcher);
            tokio::spawn(async move { dispatcher.reissue(reissue).await });
        }

        let listeners: Vec<Listener> = lock(&self.inner.listeners).clone();
        for listener in &listeners {
            listener(&snapshot);
        }

        Some(snapshot)
    }

    fn record_success(&self, snapshot: &Snapshot) {
        let base = lock(&self.inner.backoff).base;
        let mut recovered_from = 0;
        self.inner.status.send_modify(|s| {
            recovered_from = s.consecutive_failures;
            s.consecutive_failures = 0;
            s.next_delay = base;
            s.last_success = Some(snapshot.fetched_at());
            s.last_error = None;
        });

        if self.inner.store.set_availability(Availability::Available) && recovered_from > 0 {
            info!(failures = recovered_from, "polling recovered");
        }
    }

    fn record_failure(&self, err: &CoreError) {
        let policy = *lock(&self.inner.backoff);
        let mut failures = 0;
        let mut delay = policy.base;
        self.inner.status.send_modify(|s| {
            s.consecutive_failures = s.consecutive_failures.saturating_add(1);
            s.next_delay = policy.delay(s.consecutive_failures);
            s.last_error = Some(err.to_string());
            failures = s.consecutive_failures;
            delay = s.next_delay;
        });
        warn!(error = %err, failures, retry_in = ?delay, "poll failed");

        if failures >= self.inner.degraded_after
            && self.inner.store.set_availability(Availability::Degraded)
        {
            warn!(failures, "marking entities unavailable");
        }
        self.inner.dispatcher.expire_stale();
    }
}

// ── Background task ──────────────────────────────────────────────

async fn poll_task<C: RemoteClient>(
    coordinator: Coordinator<C>,
    timeout: Duration,
    generation: u64,
    cancel: CancellationToken,
) {
    loop {
        coordinator.take_refresh_request();
        let (delay, _) = coordinator.run_cycle(timeout, Some(generation)).await;
        if cancel.is_cancelled() {
            break;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = coordinator.inner.refresh_notify.notified() => {
                debug!("forced refresh");
            }
            () = tokio::time::sleep(delay) => {}
        }
    }
    debug!("poll task exited");
}
