// The remote boundary consumed by jablosync-core.
//
// `CloudClient` is the production implementation; tests substitute an
// in-memory double. Fetches return flat records; commands return an
// `Ack` so a refusal is distinguishable from a transport failure.

use std::future::Future;
use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::{RawGate, RawSection, RawSensor};

/// Arming action sent to a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionControl {
    Arm,
    PartialArm,
    Disarm,
}

impl SectionControl {
    /// Value of the `CONTROL-ACTION` field on the wire.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Arm => "ARM",
            Self::PartialArm => "PARTIAL_ARM",
            Self::Disarm => "DISARM",
        }
    }
}

/// Immediate answer to a command.
///
/// `Accepted` only means the cloud took the request; the state change is
/// confirmed later by polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Accepted,
    Rejected { reason: String },
}

impl Ack {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Everything the synchronization layer needs from the alarm cloud.
pub trait RemoteClient: Send + Sync + 'static {
    fn fetch_sections(&self) -> impl Future<Output = Result<Vec<RawSection>, Error>> + Send;

    fn fetch_gates(&self) -> impl Future<Output = Result<Vec<RawGate>, Error>> + Send;

    fn fetch_sensors(&self) -> impl Future<Output = Result<Vec<RawSensor>, Error>> + Send;

    /// Arm, partially arm, or disarm one section.
    ///
    /// `bypass` forces arming over open zones where the panel allows it.
    fn send_arm(
        &self,
        section_id: &str,
        control: SectionControl,
        pin: &SecretString,
        bypass: bool,
    ) -> impl Future<Output = Result<Ack, Error>> + Send;

    /// Switch a programmable gate. Installations that guard gates with a
    /// code take `pin`; others ignore it.
    fn send_gate(
        &self,
        gate_id: &str,
        on: bool,
        pin: Option<&SecretString>,
    ) -> impl Future<Output = Result<Ack, Error>> + Send;
}

impl<T: RemoteClient> RemoteClient for Arc<T> {
    fn fetch_sections(&self) -> impl Future<Output = Result<Vec<RawSection>, Error>> + Send {
        (**self).fetch_sections()
    }

    fn fetch_gates(&self) -> impl Future<Output = Result<Vec<RawGate>, Error>> + Send {
        (**self).fetch_gates()
    }

    fn fetch_sensors(&self) -> impl Future<Output = Result<Vec<RawSensor>, Error>> + Send {
        (**self).fetch_sensors()
    }

    fn send_arm(
        &self,
        section_id: &str,
        control: SectionControl,
        pin: &SecretString,
        bypass: bool,
    ) -> impl Future<Output = Result<Ack, Error>> + Send {
        (**self).send_arm(section_id, control, pin, bypass)
    }

    fn send_gate(
        &self,
        gate_id: &str,
        on: bool,
        pin: Option<&SecretString>,
    ) -> impl Future<Output = Result<Ack, Error>> + Send {
        (**self).send_gate(gate_id, on, pin)
    }
}
