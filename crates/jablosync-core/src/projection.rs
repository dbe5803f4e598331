// ── Entity projections ──
//
// Host-facing views derived from the latest snapshot, the pending
// command set, and availability. Pure functions of their inputs: a
// pending command overrides the reported value until it settles, and a
// degraded store makes every view unavailable.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use strum::Display;
use tokio::time::Instant;

use crate::command::{PendingCommand, PendingSet, TargetValue};
use crate::model::{ArmedKind, EntityId, GateState, SectionState, SensorKind, Snapshot};
use crate::store::Availability;

/// What an alarm panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PanelState {
    Disarmed,
    ArmedAway,
    ArmedHome,
    /// Polled, but the section's state wasn't recognized.
    Unknown,
    /// No trustworthy data.
    Unavailable,
}

impl From<ArmedKind> for PanelState {
    fn from(kind: ArmedKind) -> Self {
        match kind {
            ArmedKind::Disarmed => Self::Disarmed,
            ArmedKind::Armed => Self::ArmedAway,
            ArmedKind::PartiallyArmed => Self::ArmedHome,
            ArmedKind::Unknown => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlarmPanelView {
    pub id: EntityId,
    pub name: String,
    pub state: PanelState,
    /// A command is in flight and `state` shows its target.
    pub pending: bool,
    pub supports_arm_home: bool,
    pub code_required: bool,
    /// Gates wired to this section. Where the cloud folds partial arming
    /// into `ArmedAway`, these are the only hint of which zones are set.
    pub gates: Vec<PanelGate>,
}

/// A gate's output as seen from the section it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelGate {
    pub id: EntityId,
    pub name: String,
    pub is_on: Option<bool>,
}

/// A programmable gate the user may switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchView {
    pub id: EntityId,
    pub name: String,
    /// `None` when unavailable or the gate reports no value.
    pub is_on: Option<bool>,
    pub pending: bool,
    pub available: bool,
}

/// A read-only programmable gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinaryGateView {
    pub id: EntityId,
    pub name: String,
    pub is_on: Option<bool>,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorView {
    pub id: EntityId,
    pub name: String,
    pub kind: SensorKind,
    pub value: Option<f64>,
    pub unit: String,
    pub available: bool,
}

/// Every view, grouped by kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityViews {
    pub alarm_panels: Vec<AlarmPanelView>,
    pub switches: Vec<SwitchView>,
    pub binary_gates: Vec<BinaryGateView>,
    pub sensors: Vec<SensorView>,
}

/// Inputs frozen at one instant.
///
/// Views exist only for entities a snapshot has reported. Before the
/// first successful poll every list is empty and every lookup `None`;
/// once a snapshot exists but polling is degraded, the views are still
/// listed and each one reports itself unavailable.
#[derive(Debug, Clone)]
pub struct Projections {
    snapshot: Option<Arc<Snapshot>>,
    pending: PendingSet,
    availability: Availability,
    now: Instant,
    confirmation_timeout: Duration,
    distinguishes_partial_arm: bool,
}

impl Projections {
    pub fn new(
        snapshot: Option<Arc<Snapshot>>,
        pending: PendingSet,
        availability: Availability,
        now: Instant,
        confirmation_timeout: Duration,
        distinguishes_partial_arm: bool,
    ) -> Self {
        Self {
            snapshot,
            pending,
            availability,
            now,
            confirmation_timeout,
            distinguishes_partial_arm,
        }
    }

    /// The snapshot, if its data may be shown.
    fn trusted(&self) -> Option<&Snapshot> {
        match self.availability {
            Availability::Degraded => None,
            Availability::Unknown | Availability::Available => self.snapshot.as_deref(),
        }
    }

    fn active(&self, id: &EntityId) -> Option<&PendingCommand> {
        self.pending
            .active(id.as_str(), self.now, self.confirmation_timeout)
    }

    // ── Alarm panels ─────────────────────────────────────────────────

    /// One panel per section the user may control.
    pub fn alarm_panels(&self) -> Vec<AlarmPanelView> {
        let Some(snapshot) = self.snapshot.as_deref() else {
            return Vec::new();
        };
        snapshot
            .sections()
            .filter(|s| s.can_control)
            .map(|s| self.panel_view(s))
            .collect()
    }

    pub fn panel(&self, id: &str) -> Option<AlarmPanelView> {
        let section = self.snapshot.as_deref()?.section(id)?;
        section.can_control.then(|| self.panel_view(section))
    }

    fn panel_view(&self, section: &SectionState) -> AlarmPanelView {
        let optimistic = self.active(&section.id).and_then(|cmd| match cmd.target {
            TargetValue::Section(kind) => Some(self.panel_state(kind)),
            TargetValue::Gate(_) => None,
        });

        let trusted = self.trusted();
        let state = match (trusted, optimistic) {
            (None, _) => PanelState::Unavailable,
            (Some(_), Some(target)) => target,
            (Some(_), None) => self.panel_state(section.armed_kind),
        };

        let gates = self
            .snapshot
            .as_deref()
            .into_iter()
            .flat_map(Snapshot::gates)
            .filter(|g| g.section_id.as_ref() == Some(&section.id))
            .map(|g| PanelGate {
                id: g.id.clone(),
                name: g.name.clone(),
                is_on: trusted.and_then(|_| g.value.as_bool()),
            })
            .collect();

        AlarmPanelView {
            id: section.id.clone(),
            name: section.name.clone(),
            state,
            pending: optimistic.is_some() && state != PanelState::Unavailable,
            supports_arm_home: section.partial_arm_enabled,
            code_required: section.requires_authorization,
            gates,
        }
    }

    fn panel_state(&self, kind: ArmedKind) -> PanelState {
        if self.distinguishes_partial_arm {
            kind.into()
        } else {
            kind.fold_partial().into()
        }
    }

    // ── Gates ────────────────────────────────────────────────────────

    pub fn switches(&self) -> Vec<SwitchView> {
        let Some(snapshot) = self.snapshot.as_deref() else {
            return Vec::new();
        };
        snapshot
            .gates()
            .filter(|g| g.is_controllable)
            .map(|g| self.switch_view(g))
            .collect()
    }

    pub fn switch(&self, id: &str) -> Option<SwitchView> {
        let gate = self.snapshot.as_deref()?.gate(id)?;
        gate.is_controllable.then(|| self.switch_view(gate))
    }

    fn switch_view(&self, gate: &GateState) -> SwitchView {
        let available = self.trusted().is_some();
        let optimistic = self.active(&gate.id).and_then(|cmd| match cmd.target {
            TargetValue::Gate(on) => Some(on),
            TargetValue::Section(_) => None,
        });
        let is_on = available
            .then(|| optimistic.or(gate.value.as_bool()))
            .flatten();

        SwitchView {
            id: gate.id.clone(),
            name: gate.name.clone(),
            is_on,
            pending: available && optimistic.is_some(),
            available,
        }
    }

    pub fn binary_gates(&self) -> Vec<BinaryGateView> {
        let Some(snapshot) = self.snapshot.as_deref() else {
            return Vec::new();
        };
        let available = self.trusted().is_some();
        snapshot
            .gates()
            .filter(|g| !g.is_controllable)
            .map(|g| BinaryGateView {
                id: g.id.clone(),
                name: g.name.clone(),
                is_on: available.then(|| g.value.as_bool()).flatten(),
                available,
            })
            .collect()
    }

    // ── Sensors ──────────────────────────────────────────────────────

    pub fn sensors(&self) -> Vec<SensorView> {
        let Some(snapshot) = self.snapshot.as_deref() else {
            return Vec::new();
        };
        let available = self.trusted().is_some();
        snapshot
            .sensors()
            .map(|s| SensorView {
                id: s.id.clone(),
                name: s.name.clone(),
                kind: s.kind,
                value: if available { s.value } else { None },
                unit: s.unit.clone(),
                available,
            })
            .collect()
    }

    pub fn all(&self) -> EntityViews {
        EntityViews {
            alarm_panels: self.alarm_panels(),
            switches: self.switches(),
            binary_gates: self.binary_gates(),
            sensors: self.sensors(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use crate::model::{GateValue, SensorState};

    const TIMEOUT: Duration = Duration::from_secs(90);

    fn section(id: &str, kind: ArmedKind, can_control: bool) -> SectionState {
        SectionState {
            id: id.into(),
            name: format!("Section {id}"),
            armed_kind: kind,
            pg_bypassable: true,
            partial_arm_enabled: true,
            requires_authorization: true,
            can_control,
        }
    }

    fn gate(id: &str, value: GateValue, is_controllable: bool) -> GateState {
        GateState {
            id: id.into(),
            name: format!("Gate {id}"),
            section_id: None,
            is_controllable,
            value,
        }
    }

    fn snapshot() -> Arc<Snapshot> {
        Arc::new(Snapshot::new(
            Utc::now(),
            [
                section("1:S1", ArmedKind::Disarmed, true),
                section("1:S2", ArmedKind::PartiallyArmed, true),
                section("1:S3", ArmedKind::Armed, false),
            ],
            [
                gate("1:PG1", GateValue::On, true),
                gate("1:PG2", GateValue::Off, false),
            ],
            [SensorState {
                id: "1:T1".into(),
                name: "Hall".into(),
                kind: SensorKind::Temperature,
                value: Some(21.5),
                unit: "°C".into(),
            }],
        ))
    }

    fn projections(availability: Availability, pending: PendingSet) -> Projections {
        Projections::new(
            Some(snapshot()),
            pending,
            availability,
            Instant::now(),
            TIMEOUT,
            true,
        )
    }

    #[test]
    fn panels_only_for_controllable_sections() {
        let p = projections(Availability::Available, PendingSet::default());
        let panels = p.alarm_panels();

        assert_eq!(panels.len(), 2);
        assert_eq!(panels[0].state, PanelState::Disarmed);
        assert_eq!(panels[1].state, PanelState::ArmedHome);
        assert!(!panels[0].pending);
        assert!(panels[0].code_required);
        assert!(p.panel("1:S3").is_none());
    }

    #[test]
    fn gates_split_by_controllability() {
        let p = projections(Availability::Available, PendingSet::default());

        let switches = p.switches();
        assert_eq!(switches.len(), 1);
        assert_eq!(switches[0].is_on, Some(true));

        let binary = p.binary_gates();
        assert_eq!(binary.len(), 1);
        assert_eq!(binary[0].is_on, Some(false));
    }

    #[test]
    fn degraded_makes_everything_unavailable() {
        let p = projections(Availability::Degraded, PendingSet::default());
        let all = p.all();

        assert!(all.alarm_panels.iter().all(|v| v.state == PanelState::Unavailable));
        assert!(all.switches.iter().all(|v| !v.available && v.is_on.is_none()));
        assert!(all.binary_gates.iter().all(|v| !v.available && v.is_on.is_none()));
        assert!(all.sensors.iter().all(|v| !v.available && v.value.is_none()));
    }

    #[test]
    fn no_snapshot_means_no_views() {
        let p = Projections::new(
            None,
            PendingSet::default(),
            Availability::Unknown,
            Instant::now(),
            TIMEOUT,
            true,
        );
        let all = p.all();
        assert!(all.alarm_panels.is_empty());
        assert!(all.switches.is_empty());
        assert!(p.panel("1:S1").is_none());
    }

    #[test]
    fn sensor_view_carries_reading() {
        let p = projections(Availability::Available, PendingSet::default());
        let sensors = p.sensors();
        assert_eq!(sensors[0].value, Some(21.5));
        assert_eq!(sensors[0].unit, "°C");
    }

    #[test]
    fn panel_lists_gates_of_its_section() {
        let mut wired = gate("1:PG3", GateValue::On, false);
        wired.section_id = Some("1:S1".into());
        let snap = Arc::new(Snapshot::new(
            Utc::now(),
            [section("1:S1", ArmedKind::PartiallyArmed, true)],
            [wired, gate("1:PG4", GateValue::On, false)],
            [],
        ));

        let p = Projections::new(
            Some(Arc::clone(&snap)),
            PendingSet::default(),
            Availability::Available,
            Instant::now(),
            TIMEOUT,
            false,
        );
        let panel = p.panel("1:S1").unwrap();
        assert_eq!(panel.state, PanelState::ArmedAway);
        assert_eq!(
            panel.gates,
            vec![PanelGate {
                id: "1:PG3".into(),
                name: "Gate 1:PG3".into(),
                is_on: Some(true),
            }]
        );

        let degraded = Projections::new(
            Some(snap),
            PendingSet::default(),
            Availability::Degraded,
            Instant::now(),
            TIMEOUT,
            false,
        );
        assert_eq!(degraded.panel("1:S1").unwrap().gates[0].is_on, None);
    }

    #[test]
    fn unknown_state_is_not_unavailable() {
        let snap = Arc::new(Snapshot::new(
            Utc::now(),
            [section("1:S1", ArmedKind::Unknown, true)],
            [],
            [],
        ));
        let p = Projections::new(
            Some(snap),
            PendingSet::default(),
            Availability::Available,
            Instant::now(),
            TIMEOUT,
            true,
        );
        assert_eq!(p.panel("1:S1").unwrap().state, PanelState::Unknown);
    }
}
