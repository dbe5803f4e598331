// Control endpoints: section arming and programmable gate switching.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{CloudClient, Reply};
use crate::client::{Ack, SectionControl};
use crate::error::Error;
use crate::models::ControlPayload;

fn control_body(
    service_id: u64,
    component: &str,
    value: &str,
    pin: Option<&SecretString>,
) -> Value {
    let mut body = json!({
        "service-id": service_id,
        "control-components": [{
            "actions": { "action": "CONTROL-ACTION", "value": value },
            "component-id": component,
        }],
    });
    if let Some(pin) = pin {
        body["authorization"] = json!({ "authorization-code": pin.expose_secret() });
    }
    body
}

/// Classify a control reply.
///
/// 4xx answers and per-component `control-errors` are refusals; only
/// 5xx answers are errors.
fn into_ack(reply: Reply<ControlPayload>) -> Result<Ack, Error> {
    let status = reply.status;
    if status.is_client_error() {
        return Ok(Ack::Rejected {
            reason: reply.envelope.failure_reason(),
        });
    }
    if !status.is_success() {
        return Err(Error::Api {
            status: status.as_u16(),
            message: reply.envelope.failure_reason(),
        });
    }

    let payload = reply.envelope.data.unwrap_or_default();
    if payload.control_errors.is_empty() {
        return Ok(Ack::Accepted);
    }

    let reason = payload
        .control_errors
        .iter()
        .map(|e| match (&e.component_id, &e.error_status) {
            (Some(component), Some(status)) => format!("{component}: {status}"),
            (None, Some(status)) => status.clone(),
            (Some(component), None) => format!("{component}: refused"),
            (None, None) => "refused".to_owned(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    Ok(Ack::Rejected { reason })
}

impl CloudClient {
    /// Send an arming action to one section.
    pub async fn control_section(
        &self,
        section_id: &str,
        control: SectionControl,
        pin: &SecretString,
        bypass: bool,
    ) -> Result<Ack, Error> {
        let (service, component) = self.locate(section_id).await?;
        let path = format!("{}/controlSections.json", service.service_type);

        let mut body = control_body(service.service_id, component, control.as_wire(), Some(pin));
        body["force"] = Value::Bool(bypass);

        debug!(section = %section_id, action = control.as_wire(), bypass, "controlling section");
        let ack = into_ack(self.call(&path, &body).await?)?;
        if let Ack::Rejected { ref reason } = ack {
            warn!(section = %section_id, %reason, "section control refused");
        }
        Ok(ack)
    }

    /// Switch one programmable gate on or off.
    pub async fn control_gate(
        &self,
        gate_id: &str,
        on: bool,
        pin: Option<&SecretString>,
    ) -> Result<Ack, Error> {
        let (service, component) = self.locate(gate_id).await?;
        let path = format!("{}/controlProgrammableGates.json", service.service_type);
        let value = if on { "ON" } else { "OFF" };

        let body = control_body(service.service_id, component, value, pin);

        debug!(gate = %gate_id, value, "controlling programmable gate");
        let ack = into_ack(self.call(&path, &body).await?)?;
        if let Ack::Rejected { ref reason } = ack {
            warn!(gate = %gate_id, %reason, "gate control refused");
        }
        Ok(ack)
    }
}
