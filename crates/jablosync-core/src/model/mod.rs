// ── Domain model ──
//
// Canonical types produced from cloud records. Everything here is plain
// data; behavior lives in the coordinator, dispatcher, and projections.

mod entity_id;
mod gate;
mod section;
mod sensor;
mod snapshot;

pub use entity_id::EntityId;
pub use gate::{GateState, GateValue};
pub use section::{ArmedKind, SectionState};
pub use sensor::{SensorKind, SensorState};
pub use snapshot::Snapshot;
