// ── Snapshot ──
//
// Immutable result of one successful poll. Replaced wholesale, never
// patched, so readers holding an `Arc<Snapshot>` always see one
// consistent moment.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::warn;

use super::{EntityId, GateState, SectionState, SensorState};

/// Complete, immutable view of remote state at `fetched_at`.
///
/// Entities iterate in the order the cloud reported them. Each id
/// appears at most once; on duplicates the first record wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    fetched_at: DateTime<Utc>,
    sections: IndexMap<EntityId, SectionState>,
    gates: IndexMap<EntityId, GateState>,
    sensors: IndexMap<EntityId, SensorState>,
}

impl Snapshot {
    pub fn new(
        fetched_at: DateTime<Utc>,
        sections: impl IntoIterator<Item = SectionState>,
        gates: impl IntoIterator<Item = GateState>,
        sensors: impl IntoIterator<Item = SensorState>,
    ) -> Self {
        Self {
            fetched_at,
            sections: index_by_id("section", sections, |s| &s.id),
            gates: index_by_id("gate", gates, |g| &g.id),
            sensors: index_by_id("sensor", sensors, |s| &s.id),
        }
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn section(&self, id: &str) -> Option<&SectionState> {
        self.sections.get(id)
    }

    pub fn gate(&self, id: &str) -> Option<&GateState> {
        self.gates.get(id)
    }

    pub fn sensor(&self, id: &str) -> Option<&SensorState> {
        self.sensors.get(id)
    }

    pub fn sections(&self) -> impl Iterator<Item = &SectionState> {
        self.sections.values()
    }

    pub fn gates(&self) -> impl Iterator<Item = &GateState> {
        self.gates.values()
    }

    pub fn sensors(&self) -> impl Iterator<Item = &SensorState> {
        self.sensors.values()
    }

    pub fn len(&self) -> usize {
        self.sections.len() + self.gates.len() + self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn index_by_id<T>(
    kind: &'static str,
    items: impl IntoIterator<Item = T>,
    id_of: impl Fn(&T) -> &EntityId,
) -> IndexMap<EntityId, T> {
    let mut map = IndexMap::new();
    for item in items {
        match map.entry(id_of(&item).clone()) {
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
            Entry::Occupied(slot) => {
                warn!(kind, id = %slot.key(), "duplicate id in poll result, keeping first");
            }
        }
    }
    map
}
