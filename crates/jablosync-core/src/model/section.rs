// ── Alarm section domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::EntityId;

/// Arming state reported by the panel for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArmedKind {
    Disarmed,
    /// Fully armed ("away").
    Armed,
    /// Partially armed ("home").
    PartiallyArmed,
    Unknown,
}

impl ArmedKind {
    pub fn is_armed(self) -> bool {
        matches!(self, Self::Armed | Self::PartiallyArmed)
    }

    /// Collapse partial arming into full arming, for panels whose cloud
    /// reports both the same way.
    pub fn fold_partial(self) -> Self {
        match self {
            Self::PartiallyArmed => Self::Armed,
            other => other,
        }
    }
}

/// One arming zone of the alarm panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionState {
    pub id: EntityId,
    pub name: String,
    pub armed_kind: ArmedKind,
    /// Whether the panel lets an arm request bypass open zones.
    pub pg_bypassable: bool,
    pub partial_arm_enabled: bool,
    /// Whether the panel itself asks for a code for this section.
    pub requires_authorization: bool,
    pub can_control: bool,
}
