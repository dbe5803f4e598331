// ── Controller abstraction ──
//
// Single entry point for hosts. Wires the snapshot store, coordinator,
// and dispatcher around one remote client and exposes polling control,
// commands, and projections.

use std::future::Future;
use std::sync::Arc;

use jablosync_api::RemoteClient;
use secrecy::SecretString;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;

use crate::command::{ArmMode, CommandOutcome, Dispatcher, PendingSet};
use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::model::Snapshot;
use crate::projection::{
    AlarmPanelView, BinaryGateView, EntityViews, Projections, SensorView, SwitchView,
};
use crate::store::{Availability, SnapshotStore};
use crate::stream::SnapshotStream;
use crate::sync::{Coordinator, RefreshTicket, SyncStatus};

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Nothing talks to the
/// cloud until [`start()`](Self::start) or [`refresh_now()`](Self::refresh_now).
pub struct Controller<C: RemoteClient> {
    inner: Arc<ControllerInner<C>>,
}

impl<C: RemoteClient> Clone for Controller<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<C: RemoteClient> {
    config: SyncConfig,
    store: Arc<SnapshotStore>,
    coordinator: Coordinator<C>,
    dispatcher: Arc<Dispatcher<C>>,
}

impl<C: RemoteClient> Controller<C> {
    pub fn new(client: C, config: SyncConfig) -> Self {
        Self::with_shared_client(Arc::new(client), config)
    }

    pub fn with_shared_client(client: Arc<C>, config: SyncConfig) -> Self {
        let store = Arc::new(SnapshotStore::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&client),
            Arc::clone(&store),
            &config,
        ));
        let coordinator = Coordinator::new(client, Arc::clone(&store), Arc::clone(&dispatcher), &config);

        Self {
            inner: Arc::new(ControllerInner {
                config,
                store,
                coordinator,
                dispatcher,
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.inner.store
    }

    // ── Polling lifecycle ────────────────────────────────────────────

    /// Start polling with the configured interval and timeout.
    /// Returns `false` if already running.
    pub fn start(&self) -> bool {
        self.inner
            .coordinator
            .start(self.inner.config.poll_interval, self.inner.config.poll_timeout)
    }

    pub fn stop(&self) -> bool {
        self.inner.coordinator.stop()
    }

    /// Stop and wait for the polling task to exit.
    pub async fn shutdown(&self) {
        self.inner.coordinator.shutdown().await;
    }

    pub fn is_running(&self) -> bool {
        self.inner.coordinator.is_running()
    }

    pub fn force_refresh(&self) -> RefreshTicket {
        self.inner.coordinator.force_refresh()
    }

    /// Fetch once and wait for the applied snapshot.
    pub async fn refresh_now(&self) -> Result<Arc<Snapshot>, CoreError> {
        self.inner.coordinator.refresh_now().await
    }

    // ── One-shot convenience ─────────────────────────────────────────

    /// One-shot: fetch a snapshot, run closure, drop everything.
    ///
    /// For CLI use; no background polling is started. The closure still
    /// sees commands it issues tracked as pending.
    pub async fn oneshot<F, Fut, T>(client: C, config: SyncConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller<C>) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let controller = Controller::new(client, config);
        controller.refresh_now().await?;
        f(controller).await
    }

    // ── State observation ────────────────────────────────────────────

    /// Snapshots as they are applied, after reconciliation.
    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    /// Register a callback for every applied snapshot.
    pub fn on_snapshot(&self, listener: impl Fn(&Arc<Snapshot>) + Send + Sync + 'static) {
        self.inner.coordinator.on_snapshot(listener);
    }

    pub fn outcomes(&self) -> broadcast::Receiver<CommandOutcome> {
        self.inner.dispatcher.subscribe_outcomes()
    }

    pub fn availability(&self) -> Availability {
        self.inner.store.availability()
    }

    pub fn availability_changes(&self) -> watch::Receiver<Availability> {
        self.inner.store.subscribe_availability()
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.coordinator.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.coordinator.subscribe_status()
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.store.load()
    }

    pub fn pending(&self) -> PendingSet {
        self.inner.dispatcher.pending()
    }

    /// Ticks whenever the pending set changes.
    pub fn pending_changes(&self) -> watch::Receiver<u64> {
        self.inner.dispatcher.subscribe_pending()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn arm(
        &self,
        section_id: &str,
        mode: ArmMode,
        pin: Option<SecretString>,
        bypass: Option<bool>,
    ) -> Result<(), CoreError> {
        self.inner.dispatcher.arm(section_id, mode, pin, bypass).await
    }

    pub async fn disarm(&self, section_id: &str, pin: Option<SecretString>) -> Result<(), CoreError> {
        self.inner.dispatcher.disarm(section_id, pin).await
    }

    pub async fn set_gate(&self, gate_id: &str, on: bool) -> Result<(), CoreError> {
        self.inner.dispatcher.set_gate(gate_id, on).await
    }

    // ── Projections ──────────────────────────────────────────────────

    /// Freeze the current snapshot, pending set, and availability.
    pub fn projections(&self) -> Projections {
        Projections::new(
            self.snapshot(),
            self.pending(),
            self.availability(),
            Instant::now(),
            self.inner.config.confirmation_timeout,
            self.inner.config.distinguishes_partial_arm,
        )
    }

    pub fn alarm_panels(&self) -> Vec<AlarmPanelView> {
        self.projections().alarm_panels()
    }

    pub fn switches(&self) -> Vec<SwitchView> {
        self.projections().switches()
    }

    pub fn binary_gates(&self) -> Vec<BinaryGateView> {
        self.projections().binary_gates()
    }

    pub fn sensors(&self) -> Vec<SensorView> {
        self.projections().sensors()
    }

    pub fn panel(&self, id: &str) -> Option<AlarmPanelView> {
        self.projections().panel(id)
    }

    pub fn switch(&self, id: &str) -> Option<SwitchView> {
        self.projections().switch(id)
    }

    pub fn entities(&self) -> EntityViews {
        self.projections().all()
    }
}
