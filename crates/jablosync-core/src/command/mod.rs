// ── Command types ──
//
// User intents (arm, disarm, switch a gate) and the outcomes reported
// for them as polling confirms, contradicts, or times them out.

mod dispatcher;
mod pending;

use serde::Serialize;
use strum::Display;

use crate::model::EntityId;

pub use dispatcher::Dispatcher;
pub use pending::{PendingCommand, PendingSet, TargetValue};
pub(crate) use pending::{Reissue, RemoteRequest};

/// How far to arm a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArmMode {
    /// Every zone armed.
    Away,
    /// Partial arming; needs `partial_arm_enabled` on the section.
    Home,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommandKind {
    ArmAway,
    ArmHome,
    Disarm,
    SetGate,
}

impl From<ArmMode> for CommandKind {
    fn from(mode: ArmMode) -> Self {
        match mode {
            ArmMode::Away => Self::ArmAway,
            ArmMode::Home => Self::ArmHome,
        }
    }
}

/// What happened to a command after it left the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The cloud took the request; awaiting confirmation by polling.
    Accepted,
    /// Polling reported the requested state.
    Confirmed,
    /// Polling contradicted the request and it was sent again.
    Retrying { attempt: u32 },
    /// Polling kept contradicting the request; the reported state wins.
    Diverged { reported: String },
    /// No confirming poll arrived in time.
    Expired,
    /// A later command for the same entity replaced this one.
    Superseded,
    /// The cloud refused the request, or a re-send failed.
    Failed { reason: String },
}

impl OutcomeStatus {
    /// `true` once nothing more will be reported for the command.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Accepted | Self::Retrying { .. })
    }
}

/// Broadcast for every state change of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub entity_id: EntityId,
    pub kind: CommandKind,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}
