// ── Cloud record to domain type conversions ──
//
// Bridges jablosync-api's flat records into canonical model types.
// Unrecognized state strings become `Unknown` rather than errors; the
// cloud adds states faster than clients learn them.

use chrono::{DateTime, Utc};
use jablosync_api::{RawGate, RawSection, RawSensor};
use tracing::warn;

use crate::model::{
    ArmedKind, EntityId, GateState, GateValue, SectionState, SensorKind, SensorState, Snapshot,
};

pub(crate) fn parse_armed_kind(state: Option<&str>) -> ArmedKind {
    match state {
        Some("ARM") => ArmedKind::Armed,
        Some("PARTIAL_ARM") => ArmedKind::PartiallyArmed,
        Some("DISARM") => ArmedKind::Disarmed,
        _ => ArmedKind::Unknown,
    }
}

pub(crate) fn parse_gate_value(state: Option<&str>) -> GateValue {
    match state {
        Some("ON") => GateValue::On,
        Some("OFF") => GateValue::Off,
        _ => GateValue::Unknown,
    }
}

impl From<RawSection> for SectionState {
    fn from(raw: RawSection) -> Self {
        Self {
            armed_kind: parse_armed_kind(raw.state.as_deref()),
            id: EntityId::from(raw.id),
            name: raw.name,
            pg_bypassable: raw.can_bypass,
            partial_arm_enabled: raw.partial_arm_enabled,
            requires_authorization: raw.need_authorization,
            can_control: raw.can_control,
        }
    }
}

impl From<RawGate> for GateState {
    fn from(raw: RawGate) -> Self {
        Self {
            value: parse_gate_value(raw.state.as_deref()),
            id: EntityId::from(raw.id),
            name: raw.name,
            section_id: raw.section_id.map(EntityId::from),
            is_controllable: raw.can_control,
        }
    }
}

/// Sensors of a kind this crate doesn't model are dropped.
pub(crate) fn sensor_from_raw(raw: RawSensor) -> Option<SensorState> {
    let Ok(kind) = raw.kind.parse::<SensorKind>() else {
        warn!(id = %raw.id, kind = %raw.kind, "ignoring sensor of unknown kind");
        return None;
    };
    Some(SensorState {
        id: EntityId::from(raw.id),
        name: raw.name,
        kind,
        value: raw.value,
        unit: raw.unit,
    })
}

/// Assemble one poll's records into a `Snapshot`.
pub(crate) fn build_snapshot(
    fetched_at: DateTime<Utc>,
    sections: Vec<RawSection>,
    gates: Vec<RawGate>,
    sensors: Vec<RawSensor>,
) -> Snapshot {
    Snapshot::new(
        fetched_at,
        sections.into_iter().map(SectionState::from),
        gates.into_iter().map(GateState::from),
        sensors.into_iter().filter_map(sensor_from_raw),
    )
}
