// ── Command dispatcher ──
//
// Validates user intents against the latest snapshot, resolves the PIN
// and bypass flag, sends them to the cloud, and tracks accepted ones as
// pending until polling settles them. Commands for one entity are
// serialized; different entities proceed concurrently.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use jablosync_api::{Ack, RemoteClient, SectionControl};
use secrecy::SecretString;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::pending::{ReconcilePolicy, Reconciliation};
use super::{
    ArmMode, CommandKind, CommandOutcome, OutcomeStatus, PendingCommand, PendingSet, Reissue,
    RemoteRequest, TargetValue,
};
use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::model::{ArmedKind, EntityId, SectionState, Snapshot};
use crate::store::SnapshotStore;

const OUTCOME_CHANNEL_SIZE: usize = 64;

pub struct Dispatcher<C: RemoteClient> {
    client: Arc<C>,
    store: Arc<SnapshotStore>,
    default_pin: Option<SecretString>,
    default_bypass: bool,
    policy: ReconcilePolicy,
    pending: Mutex<PendingSet>,
    /// Bumped whenever the pending set changes.
    pending_version: watch::Sender<u64>,
    entity_locks: DashMap<EntityId, Arc<tokio::sync::Mutex<()>>>,
    outcomes: broadcast::Sender<CommandOutcome>,
}

impl<C: RemoteClient> Dispatcher<C> {
    pub fn new(client: Arc<C>, store: Arc<SnapshotStore>, config: &SyncConfig) -> Self {
        let (pending_version, _) = watch::channel(0);
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_SIZE);
        Self {
            client,
            store,
            default_pin: config.default_pin.clone(),
            default_bypass: config.default_bypass,
            policy: ReconcilePolicy {
                confirmation_timeout: config.confirmation_timeout,
                max_auto_retries: config.max_auto_retries,
                distinguishes_partial_arm: config.distinguishes_partial_arm,
            },
            pending: Mutex::new(PendingSet::default()),
            pending_version,
            entity_locks: DashMap::new(),
            outcomes,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Arm a section fully (`Away`) or partially (`Home`).
    ///
    /// `pin` and `bypass` fall back to the configured defaults. Nothing
    /// is sent if validation fails.
    pub async fn arm(
        &self,
        section_id: &str,
        mode: ArmMode,
        pin: Option<SecretString>,
        bypass: Option<bool>,
    ) -> Result<(), CoreError> {
        let section = self.controllable_section(section_id)?;
        if mode == ArmMode::Home && !section.partial_arm_enabled {
            return Err(CoreError::Unsupported {
                operation: format!("arm home on {section_id}"),
                reason: "partial arming is not enabled for this section".into(),
            });
        }
        let pin = self.resolve_pin(&section.id, pin)?;

        let bypass = bypass.unwrap_or(self.default_bypass);

        let (control, target) = match mode {
            ArmMode::Away => (SectionControl::Arm, ArmedKind::Armed),
            ArmMode::Home if self.policy.distinguishes_partial_arm => {
                (SectionControl::PartialArm, ArmedKind::PartiallyArmed)
            }
            ArmMode::Home => (SectionControl::PartialArm, ArmedKind::Armed),
        };

        self.issue(
            section.id,
            mode.into(),
            TargetValue::Section(target),
            RemoteRequest::Section { control, pin, bypass },
        )
        .await
    }

    pub async fn disarm(&self, section_id: &str, pin: Option<SecretString>) -> Result<(), CoreError> {
        let section = self.controllable_section(section_id)?;
        let pin = self.resolve_pin(&section.id, pin)?;

        self.issue(
            section.id,
            CommandKind::Disarm,
            TargetValue::Section(ArmedKind::Disarmed),
            RemoteRequest::Section {
                control: SectionControl::Disarm,
                pin,
                bypass: false,
            },
        )
        .await
    }

    /// Switch a programmable gate. Read-only gates are refused locally.
    pub async fn set_gate(&self, gate_id: &str, on: bool) -> Result<(), CoreError> {
        let snapshot = self.store.load().ok_or(CoreError::NoSnapshot)?;
        let gate = snapshot
            .gate(gate_id)
            .ok_or_else(|| CoreError::not_found("gate", gate_id))?;
        if !gate.is_controllable {
            return Err(CoreError::NotControllable {
                entity_id: gate.id.clone(),
            });
        }

        self.issue(
            gate.id.clone(),
            CommandKind::SetGate,
            TargetValue::Gate(on),
            // The cloud takes an optional code for gates; send the default if configured.
            RemoteRequest::Gate {
                on,
                pin: self.default_pin.clone(),
            },
        )
        .await
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Copy of the outstanding commands.
    pub fn pending(&self) -> PendingSet {
        self.lock_pending().clone()
    }

    pub fn pending_for(&self, entity_id: &str) -> Option<PendingCommand> {
        self.lock_pending().get(entity_id).cloned()
    }

    pub fn subscribe_outcomes(&self) -> broadcast::Receiver<CommandOutcome> {
        self.outcomes.subscribe()
    }

    /// Ticks whenever a command is installed, settled, or dropped.
    pub fn subscribe_pending(&self) -> watch::Receiver<u64> {
        self.pending_version.subscribe()
    }

    // ── Coordinator hooks ────────────────────────────────────────────

    /// Settle pending commands against a freshly swapped-in snapshot.
    /// Returns contradicted commands to send again.
    pub(crate) fn reconcile(&self, snapshot: &Snapshot, fetch_started: Instant) -> Vec<Reissue> {
        let Reconciliation { outcomes, reissues } = self.with_pending(|set| {
            set.reconcile(snapshot, fetch_started, Instant::now(), self.policy)
        });
        for outcome in outcomes {
            self.emit(outcome);
        }
        reissues
    }

    /// Drop commands past the confirmation timeout.
    pub(crate) fn expire_stale(&self) {
        let outcomes = self.with_pending(|set| {
            set.expire(Instant::now(), self.policy.confirmation_timeout)
        });
        for outcome in outcomes {
            self.emit(outcome);
        }
    }

    /// Send a contradicted command again.
    ///
    /// Skipped if the command was settled or superseded in the meantime.
    /// A refusal or failure drops the pending command.
    pub(crate) async fn reissue(&self, reissue: Reissue) {
        let lock = self.entity_lock(&reissue.entity_id);
        let _guard = lock.lock().await;

        let still_current = self
            .lock_pending()
            .get(reissue.entity_id.as_str())
            .is_some_and(|cmd| reissue.matches(cmd));
        if !still_current {
            debug!(entity = %reissue.entity_id, "re-send no longer needed");
            return;
        }

        let reason = match self.send(&reissue.entity_id, &reissue.request).await {
            Ok(Ack::Accepted) => {
                debug!(entity = %reissue.entity_id, attempt = reissue.attempt, "re-send accepted");
                self.with_pending(|set| set.mark_resent(&reissue, Instant::now()));
                return;
            }
            Ok(Ack::Rejected { reason }) => reason,
            Err(e) => e.to_string(),
        };

        warn!(entity = %reissue.entity_id, %reason, "re-send failed, dropping command");
        let removed = self.with_pending(|set| {
            let current = set
                .get(reissue.entity_id.as_str())
                .is_some_and(|cmd| reissue.matches(cmd));
            current.then(|| set.remove(reissue.entity_id.as_str())).flatten()
        });
        if removed.is_some() {
            self.emit(CommandOutcome {
                entity_id: reissue.entity_id,
                kind: reissue.kind,
                status: OutcomeStatus::Failed { reason },
            });
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn controllable_section(&self, section_id: &str) -> Result<SectionState, CoreError> {
        let snapshot = self.store.load().ok_or(CoreError::NoSnapshot)?;
        let section = snapshot
            .section(section_id)
            .ok_or_else(|| CoreError::not_found("section", section_id))?;
        if !section.can_control {
            return Err(CoreError::NotControllable {
                entity_id: section.id.clone(),
            });
        }
        Ok(section.clone())
    }

    fn resolve_pin(
        &self,
        section_id: &EntityId,
        pin: Option<SecretString>,
    ) -> Result<SecretString, CoreError> {
        pin.or_else(|| self.default_pin.clone())
            .ok_or_else(|| CoreError::MissingPin {
                section_id: section_id.clone(),
            })
    }

    async fn issue(
        &self,
        entity_id: EntityId,
        kind: CommandKind,
        target: TargetValue,
        request: RemoteRequest,
    ) -> Result<(), CoreError> {
        let lock = self.entity_lock(&entity_id);
        let _guard = lock.lock().await;

        let ack = match self.send(&entity_id, &request).await {
            Ok(ack) => ack,
            Err(e) => {
                warn!(entity = %entity_id, %kind, error = %e, "command could not be sent");
                return Err(e.into());
            }
        };

        match ack {
            Ack::Accepted => {
                info!(entity = %entity_id, %kind, "command accepted");
                let cmd = PendingCommand::new(entity_id.clone(), kind, target, request, Instant::now());
                if let Some(old) = self.with_pending(|set| set.install(cmd)) {
                    self.emit(CommandOutcome {
                        entity_id: old.entity_id,
                        kind: old.kind,
                        status: OutcomeStatus::Superseded,
                    });
                }
                self.emit(CommandOutcome {
                    entity_id,
                    kind,
                    status: OutcomeStatus::Accepted,
                });
                Ok(())
            }
            Ack::Rejected { reason } => {
                warn!(entity = %entity_id, %kind, %reason, "command rejected");
                self.emit(CommandOutcome {
                    entity_id: entity_id.clone(),
                    kind,
                    status: OutcomeStatus::Failed {
                        reason: reason.clone(),
                    },
                });
                Err(CoreError::CommandRejected { entity_id, reason })
            }
        }
    }

    async fn send(
        &self,
        entity_id: &EntityId,
        request: &RemoteRequest,
    ) -> Result<Ack, jablosync_api::Error> {
        match request {
            RemoteRequest::Section {
                control,
                pin,
                bypass,
            } => {
                self.client
                    .send_arm(entity_id.as_str(), *control, pin, *bypass)
                    .await
            }
            RemoteRequest::Gate { on, pin } => {
                self.client
                    .send_gate(entity_id.as_str(), *on, pin.as_ref())
                    .await
            }
        }
    }

    fn entity_lock(&self, entity_id: &EntityId) -> Arc<tokio::sync::Mutex<()>> {
        self.entity_locks
            .entry(entity_id.clone())
            .or_default()
            .value()
            .clone()
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, PendingSet> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_pending<R>(&self, f: impl FnOnce(&mut PendingSet) -> R) -> R {
        let result = {
            let mut guard = self.lock_pending();
            f(&mut *guard)
        };
        self.pending_version.send_modify(|v| *v = v.wrapping_add(1));
        result
    }

    fn emit(&self, outcome: CommandOutcome) {
        // No receivers is fine.
        let _ = self.outcomes.send(outcome);
    }
}
