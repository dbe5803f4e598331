// ── Pending commands and reconciliation ──
//
// An accepted command is not yet true. Until polling confirms it, the
// command sits here as the entity's optimistic overlay. Each new
// snapshot is reconciled against the set: confirmed commands leave,
// contradicted ones are re-sent or dropped, and stale ones expire.

use std::collections::HashMap;
use std::time::Duration;

use jablosync_api::SectionControl;
use secrecy::SecretString;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{CommandKind, CommandOutcome, OutcomeStatus};
use crate::model::{ArmedKind, EntityId, Snapshot};

/// The state a command is trying to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "entity", content = "value", rename_all = "snake_case")]
pub enum TargetValue {
    Section(ArmedKind),
    Gate(bool),
}

impl TargetValue {
    fn describe(self) -> String {
        match self {
            Self::Section(kind) => kind.to_string(),
            Self::Gate(true) => "on".into(),
            Self::Gate(false) => "off".into(),
        }
    }
}

/// Everything needed to send the command again.
#[derive(Debug, Clone)]
pub(crate) enum RemoteRequest {
    Section {
        control: SectionControl,
        pin: SecretString,
        bypass: bool,
    },
    Gate {
        on: bool,
        pin: Option<SecretString>,
    },
}

/// An accepted command awaiting confirmation.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    pub entity_id: EntityId,
    pub kind: CommandKind,
    pub target: TargetValue,
    pub issued_at: Instant,
    /// 1 for the original send, +1 per automatic re-send.
    pub attempt_count: u32,
    /// When the cloud last accepted a send of this command.
    pub(crate) last_sent_at: Instant,
    /// A re-send has been scheduled but not yet accepted.
    pub(crate) resend_in_flight: bool,
    pub(crate) request: RemoteRequest,
}

impl PendingCommand {
    pub(crate) fn new(
        entity_id: EntityId,
        kind: CommandKind,
        target: TargetValue,
        request: RemoteRequest,
        now: Instant,
    ) -> Self {
        Self {
            entity_id,
            kind,
            target,
            issued_at: now,
            attempt_count: 1,
            last_sent_at: now,
            resend_in_flight: false,
            request,
        }
    }

    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.issued_at) >= timeout
    }

    fn outcome(&self, status: OutcomeStatus) -> CommandOutcome {
        CommandOutcome {
            entity_id: self.entity_id.clone(),
            kind: self.kind,
            status,
        }
    }
}

/// A contradicted command to send again, outside the reconcile pass.
#[derive(Debug, Clone)]
pub(crate) struct Reissue {
    pub entity_id: EntityId,
    pub kind: CommandKind,
    pub issued_at: Instant,
    pub attempt: u32,
    pub request: RemoteRequest,
}

impl Reissue {
    /// Whether `pending` is still the command this re-send belongs to.
    pub fn matches(&self, pending: &PendingCommand) -> bool {
        pending.issued_at == self.issued_at && pending.attempt_count == self.attempt
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ReconcilePolicy {
    pub confirmation_timeout: Duration,
    pub max_auto_retries: u32,
    pub distinguishes_partial_arm: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Reconciliation {
    pub outcomes: Vec<CommandOutcome>,
    pub reissues: Vec<Reissue>,
}

/// At most one outstanding command per entity.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    commands: HashMap<EntityId, PendingCommand>,
}

impl PendingSet {
    pub fn get(&self, entity_id: &str) -> Option<&PendingCommand> {
        self.commands.get(entity_id)
    }

    /// The command for `entity_id`, unless it has outlived `timeout`.
    pub fn active(&self, entity_id: &str, now: Instant, timeout: Duration) -> Option<&PendingCommand> {
        self.get(entity_id).filter(|cmd| !cmd.is_expired(now, timeout))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingCommand> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Install `cmd`, returning the command it supersedes.
    pub(crate) fn install(&mut self, cmd: PendingCommand) -> Option<PendingCommand> {
        self.commands.insert(cmd.entity_id.clone(), cmd)
    }

    pub(crate) fn remove(&mut self, entity_id: &str) -> Option<PendingCommand> {
        self.commands.remove(entity_id)
    }

    /// Record that the cloud accepted the re-send `reissue` stands for.
    /// Returns `false` if the command was settled or replaced meanwhile.
    pub(crate) fn mark_resent(&mut self, reissue: &Reissue, now: Instant) -> bool {
        match self.commands.get_mut(reissue.entity_id.as_str()) {
            Some(cmd) if reissue.matches(cmd) => {
                cmd.last_sent_at = now;
                cmd.resend_in_flight = false;
                true
            }
            _ => false,
        }
    }

    /// Drop every command older than `timeout`.
    pub(crate) fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<CommandOutcome> {
        let mut outcomes = Vec::new();
        self.commands.retain(|_, cmd| {
            if cmd.is_expired(now, timeout) {
                info!(entity = %cmd.entity_id, kind = %cmd.kind, "command expired unconfirmed");
                outcomes.push(cmd.outcome(OutcomeStatus::Expired));
                false
            } else {
                true
            }
        });
        outcomes
    }

    /// Compare every pending command against a fresh snapshot.
    ///
    /// `fetch_started` is when the poll that produced `snapshot` began;
    /// commands sent after that can't be reflected in it yet and are
    /// left alone, as are commands whose re-send hasn't been accepted.
    pub(crate) fn reconcile(
        &mut self,
        snapshot: &Snapshot,
        fetch_started: Instant,
        now: Instant,
        policy: ReconcilePolicy,
    ) -> Reconciliation {
        let mut result = Reconciliation::default();
        let max_attempts = policy.max_auto_retries.saturating_add(1);

        self.commands.retain(|id, cmd| {
            if cmd.is_expired(now, policy.confirmation_timeout) {
                info!(entity = %id, kind = %cmd.kind, "command expired unconfirmed");
                result.outcomes.push(cmd.outcome(OutcomeStatus::Expired));
                return false;
            }
            if cmd.resend_in_flight || cmd.last_sent_at > fetch_started {
                return true;
            }

            let Some(reported) = reported_value(snapshot, id, cmd.target, policy) else {
                // Nothing reported for the entity yet; wait for a later poll.
                return true;
            };

            if reported == cmd.target {
                debug!(entity = %id, kind = %cmd.kind, attempts = cmd.attempt_count, "command confirmed");
                result.outcomes.push(cmd.outcome(OutcomeStatus::Confirmed));
                return false;
            }

            if cmd.attempt_count < max_attempts {
                cmd.attempt_count += 1;
                cmd.resend_in_flight = true;
                warn!(
                    entity = %id,
                    expected = %cmd.target.describe(),
                    reported = %reported.describe(),
                    attempt = cmd.attempt_count,
                    "poll contradicts command, sending again"
                );
                result.outcomes.push(cmd.outcome(OutcomeStatus::Retrying {
                    attempt: cmd.attempt_count,
                }));
                result.reissues.push(Reissue {
                    entity_id: id.clone(),
                    kind: cmd.kind,
                    issued_at: cmd.issued_at,
                    attempt: cmd.attempt_count,
                    request: cmd.request.clone(),
                });
                return true;
            }

            warn!(
                entity = %id,
                expected = %cmd.target.describe(),
                reported = %reported.describe(),
                "poll contradicts command, giving up"
            );
            result.outcomes.push(cmd.outcome(OutcomeStatus::Diverged {
                reported: reported.describe(),
            }));
            false
        });

        result
    }
}

/// The snapshot's value for the entity `target` refers to, in the same
/// shape. `None` when the entity is missing or its state unknown.
fn reported_value(
    snapshot: &Snapshot,
    id: &EntityId,
    target: TargetValue,
    policy: ReconcilePolicy,
) -> Option<TargetValue> {
    match target {
        TargetValue::Section(_) => {
            let kind = snapshot.section(id.as_str())?.armed_kind;
            let kind = if policy.distinguishes_partial_arm {
                kind
            } else {
                kind.fold_partial()
            };
            (kind != ArmedKind::Unknown).then_some(TargetValue::Section(kind))
        }
        TargetValue::Gate(_) => snapshot
            .gate(id.as_str())?
            .value
            .as_bool()
            .map(TargetValue::Gate),
    }
}
