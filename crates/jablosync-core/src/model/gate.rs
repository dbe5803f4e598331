use serde::{Deserialize, Serialize};
use strum::Display;

use super::EntityId;

/// Reported output of a programmable gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GateValue {
    On,
    Off,
    Unknown,
}

impl GateValue {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::On => Some(true),
            Self::Off => Some(false),
            Self::Unknown => None,
        }
    }
}

impl From<bool> for GateValue {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

/// A programmable output (relay, siren, lock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateState {
    pub id: EntityId,
    pub name: String,
    pub section_id: Option<EntityId>,
    /// Controllable gates surface as switches; others as read-only sensors.
    pub is_controllable: bool,
    pub value: GateValue,
}
