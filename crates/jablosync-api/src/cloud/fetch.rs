// Read endpoints: sections, programmable gates, thermo devices.
//
// Each is queried per service and flattened into namespaced records.
// Definitions and states arrive as separate lists and are joined here.

use std::collections::HashMap;

use serde_json::json;
use tracing::debug;

use super::{CloudClient, component_id};
use crate::error::Error;
use crate::models::{
    ComponentState, GatesPayload, RawGate, RawSection, RawSensor, SectionsPayload, ThermoPayload,
};

const CELSIUS: &str = "°C";

fn states_by_id(states: Vec<ComponentState>) -> HashMap<String, Option<String>> {
    states
        .into_iter()
        .map(|s| (s.component_id, s.state))
        .collect()
}

impl CloudClient {
    /// All alarm sections across every supported service.
    pub async fn sections(&self) -> Result<Vec<RawSection>, Error> {
        let services = self.services().await?;
        let mut out = Vec::new();

        for service in services.iter() {
            let path = format!("{}/sectionsGet.json", service.service_type);
            let body = json!({ "service-id": service.service_id, "connect-device": true });
            let payload: SectionsPayload = self.call(&path, &body).await?.into_data()?;
            let mut states = states_by_id(payload.states);

            debug!(
                service_id = service.service_id,
                count = payload.sections.len(),
                "fetched sections"
            );
            out.extend(payload.sections.into_iter().map(|def| RawSection {
                id: component_id(service, &def.component_id),
                state: states.remove(&def.component_id).flatten(),
                name: def.name,
                can_control: def.can_control,
                partial_arm_enabled: def.partial_arm_enabled,
                need_authorization: def.need_authorization,
                can_bypass: def.can_bypass,
            }));
        }

        Ok(out)
    }

    /// All programmable gates across every supported service.
    pub async fn gates(&self) -> Result<Vec<RawGate>, Error> {
        let services = self.services().await?;
        let mut out = Vec::new();

        for service in services.iter() {
            let path = format!("{}/programmableGatesGet.json", service.service_type);
            let body = json!({ "service-id": service.service_id, "connect-device": true });
            let payload: GatesPayload = self.call(&path, &body).await?.into_data()?;
            let mut states = states_by_id(payload.states);

            out.extend(payload.gates.into_iter().map(|def| RawGate {
                id: component_id(service, &def.component_id),
                state: states.remove(&def.component_id).flatten(),
                section_id: def.section_id.map(|s| component_id(service, &s)),
                name: def.name,
                can_control: def.can_control,
            }));
        }

        Ok(out)
    }

    /// Temperature readings from thermo devices across every service.
    pub async fn thermo_sensors(&self) -> Result<Vec<RawSensor>, Error> {
        let services = self.services().await?;
        let mut out = Vec::new();

        for service in services.iter() {
            let path = format!("{}/thermoDevicesGet.json", service.service_type);
            let body = json!({ "service-id": service.service_id });
            let payload: ThermoPayload = self.call(&path, &body).await?.into_data()?;

            out.extend(payload.devices.into_iter().map(|device| RawSensor {
                id: component_id(service, &device.device_id),
                name: device.device_id,
                kind: "TEMPERATURE".into(),
                value: device.temperature,
                unit: CELSIUS.into(),
            }));
        }

        Ok(out)
    }
}
