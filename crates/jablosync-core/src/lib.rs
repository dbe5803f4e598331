// jablosync-core: Polling sync layer between jablosync-api and consumers (CLI, home automation hosts).

pub mod command;
pub mod config;
pub mod controller;
mod convert;
pub mod error;
pub mod model;
pub mod projection;
pub mod store;
pub mod stream;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{ArmMode, CommandKind, CommandOutcome, OutcomeStatus, PendingCommand, PendingSet, TargetValue};
pub use config::SyncConfig;
pub use controller::Controller;
pub use error::CoreError;
pub use projection::{
    AlarmPanelView, BinaryGateView, EntityViews, PanelGate, PanelState, Projections, SensorView,
    SwitchView,
};
pub use store::{Availability, SnapshotStore};
pub use stream::SnapshotStream;
pub use sync::{RefreshTicket, SyncStatus};

pub use model::{
    ArmedKind, EntityId, GateState, GateValue, SectionState, SensorKind, SensorState, Snapshot,
};
