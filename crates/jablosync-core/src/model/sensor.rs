use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SensorKind {
    Temperature,
    Electricity,
}

/// A numeric reading. `value` is `None` when the device reported nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorState {
    pub id: EntityId,
    pub name: String,
    pub kind: SensorKind,
    pub value: Option<f64>,
    pub unit: String,
}
