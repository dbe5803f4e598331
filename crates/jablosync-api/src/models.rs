// Cloud API wire models
//
// Every endpoint wraps its payload in the `{ "http-code", "data" }`
// envelope. Component payloads are split into a definition list and a
// separate `states` list keyed by `cloud-component-id`; the fetch layer
// joins the two into the flat `Raw*` records handed to callers.

use serde::{Deserialize, Serialize};

// ── Response Envelope ────────────────────────────────────────────────

/// Standard cloud response envelope.
///
/// ```json
/// { "http-code": 200, "data": { ... } }
/// { "http-code": 400, "error-status": "INCORRECT_PIN_CODE", "error-message": "..." }
/// ```
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "http-code", default)]
    pub http_code: Option<u16>,
    pub data: Option<T>,
    #[serde(rename = "error-status", default)]
    pub error_status: Option<String>,
    #[serde(rename = "error-message", default)]
    pub error_message: Option<String>,
}

impl<T> Envelope<T> {
    /// Best human-readable description of a failed envelope.
    pub fn failure_reason(&self) -> String {
        match (&self.error_status, &self.error_message) {
            (Some(status), Some(message)) => format!("{status}: {message}"),
            (Some(text), None) | (None, Some(text)) => text.clone(),
            (None, None) => format!("http-code {}", self.http_code.unwrap_or_default()),
        }
    }
}

// ── Services ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ServiceList {
    #[serde(default)]
    pub services: Vec<Service>,
}

/// One alarm installation reachable from the account.
#[derive(Debug, Clone, Deserialize)]
pub struct Service {
    #[serde(rename = "service-id")]
    pub service_id: u64,
    #[serde(rename = "service-type")]
    pub service_type: String,
    #[serde(default)]
    pub name: String,
}

// ── Component payloads ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentState {
    #[serde(rename = "cloud-component-id")]
    pub component_id: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SectionsPayload {
    #[serde(default)]
    pub sections: Vec<SectionDef>,
    #[serde(default)]
    pub states: Vec<ComponentState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionDef {
    #[serde(rename = "cloud-component-id")]
    pub component_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "can-control", default)]
    pub can_control: bool,
    #[serde(rename = "partial-arm-enabled", default)]
    pub partial_arm_enabled: bool,
    #[serde(rename = "need-authorization", default)]
    pub need_authorization: bool,
    /// Absent on older panels, which always accept a forced arm.
    #[serde(rename = "can-bypass", default = "default_true")]
    pub can_bypass: bool,
}

#[derive(Debug, Deserialize)]
pub struct GatesPayload {
    #[serde(rename = "programmableGates", default)]
    pub gates: Vec<GateDef>,
    #[serde(default)]
    pub states: Vec<ComponentState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GateDef {
    #[serde(rename = "cloud-component-id")]
    pub component_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "can-control", default)]
    pub can_control: bool,
    #[serde(rename = "section-id", default)]
    pub section_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThermoPayload {
    #[serde(rename = "thermo-devices", default)]
    pub devices: Vec<ThermoDevice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThermoDevice {
    #[serde(rename = "object-device-id")]
    pub device_id: String,
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ControlPayload {
    #[serde(rename = "control-errors", default)]
    pub control_errors: Vec<ControlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlError {
    #[serde(rename = "component-id", default)]
    pub component_id: Option<String>,
    #[serde(rename = "error-status", default)]
    pub error_status: Option<String>,
}

fn default_true() -> bool {
    true
}

// ── Flattened records ────────────────────────────────────────────────

/// Alarm section as reported by one poll.
///
/// `id` is namespaced as `{service_id}:{cloud-component-id}` so ids stay
/// unique across installations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSection {
    pub id: String,
    pub name: String,
    /// `ARM`, `PARTIAL_ARM`, `DISARM`, or anything else the panel reports.
    pub state: Option<String>,
    pub can_control: bool,
    pub partial_arm_enabled: bool,
    pub need_authorization: bool,
    pub can_bypass: bool,
}

/// Programmable gate as reported by one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGate {
    pub id: String,
    pub name: String,
    /// Owning section, already namespaced, when the panel reports one.
    pub section_id: Option<String>,
    pub can_control: bool,
    /// `ON`, `OFF`, or `None` when unreported.
    pub state: Option<String>,
}

/// Numeric sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSensor {
    pub id: String,
    pub name: String,
    /// `TEMPERATURE` or `ELECTRICITY`.
    pub kind: String,
    pub value: Option<f64>,
    pub unit: String,
}
