//! `status`: one poll, then every entity view.

use std::fmt::Write as _;

use jablosync_api::CloudClient;
use jablosync_core::{
    AlarmPanelView, BinaryGateView, Controller, EntityViews, SensorView, SwitchView, SyncConfig,
};
use tabled::Tabled;

use crate::cli::{EntityKind, GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output;

// ── Table rows ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct PanelRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Home")]
    home: &'static str,
    #[tabled(rename = "Code")]
    code: &'static str,
    #[tabled(rename = "Outputs on")]
    outputs: String,
}

#[derive(Tabled)]
struct SwitchRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
}

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

pub(crate) fn panel_row(v: &AlarmPanelView, color: bool) -> PanelRow {
    let mut state = output::panel_state(v.state, color);
    if v.pending {
        state.push_str(" (pending)");
    }
    PanelRow {
        id: v.id.to_string(),
        name: v.name.clone(),
        state,
        home: yes_no(v.supports_arm_home),
        code: yes_no(v.code_required),
        outputs: outputs_on(v),
    }
}

/// Names of the section's gates that are on.
fn outputs_on(v: &AlarmPanelView) -> String {
    let on: Vec<&str> = v
        .gates
        .iter()
        .filter(|g| g.is_on == Some(true))
        .map(|g| g.name.as_str())
        .collect();
    if on.is_empty() { "-".into() } else { on.join(", ") }
}

fn switch_row(v: &SwitchView) -> SwitchRow {
    let mut state = output::on_off(v.is_on);
    if v.pending {
        state.push_str(" (pending)");
    }
    SwitchRow {
        id: v.id.to_string(),
        name: v.name.clone(),
        state,
    }
}

fn gate_row(v: &BinaryGateView) -> SwitchRow {
    SwitchRow {
        id: v.id.to_string(),
        name: v.name.clone(),
        state: output::on_off(v.is_on),
    }
}

fn sensor_row(v: &SensorView) -> SensorRow {
    SensorRow {
        id: v.id.to_string(),
        name: v.name.clone(),
        kind: v.kind.to_string(),
        value: v
            .value
            .map_or_else(|| "-".into(), |value| format!("{value:.1} {}", v.unit)),
    }
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(
    client: CloudClient,
    config: SyncConfig,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let views =
        Controller::oneshot(client, config, |ctl| async move { Ok(ctl.entities()) }).await?;
    let color = output::should_color(&global.color);
    let fmt = &global.output;

    let out = match args.kind {
        Some(EntityKind::Sections) => output::render_list(
            fmt,
            &views.alarm_panels,
            |v| panel_row(v, color),
            |v| v.id.to_string(),
        ),
        Some(EntityKind::Switches) => {
            output::render_list(fmt, &views.switches, switch_row, |v| v.id.to_string())
        }
        Some(EntityKind::Gates) => {
            output::render_list(fmt, &views.binary_gates, gate_row, |v| v.id.to_string())
        }
        Some(EntityKind::Sensors) => {
            output::render_list(fmt, &views.sensors, sensor_row, |v| v.id.to_string())
        }
        None => output::render_single(fmt, &views, |v| overview(v, color), all_ids),
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

fn overview(views: &EntityViews, color: bool) -> String {
    let mut out = String::new();
    let mut section = |title: &str, table: String, empty: bool| {
        if empty {
            return;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "{title}");
        out.push_str(&table);
        out.push('\n');
    };

    section(
        "Sections",
        output::render_table(
            &views
                .alarm_panels
                .iter()
                .map(|v| panel_row(v, color))
                .collect::<Vec<_>>(),
        ),
        views.alarm_panels.is_empty(),
    );
    section(
        "Switches",
        output::render_table(&views.switches.iter().map(switch_row).collect::<Vec<_>>()),
        views.switches.is_empty(),
    );
    section(
        "Gates",
        output::render_table(&views.binary_gates.iter().map(gate_row).collect::<Vec<_>>()),
        views.binary_gates.is_empty(),
    );
    section(
        "Sensors",
        output::render_table(&views.sensors.iter().map(sensor_row).collect::<Vec<_>>()),
        views.sensors.is_empty(),
    );

    if out.is_empty() {
        out.push_str("No entities reported.");
    }
    out.trim_end().to_owned()
}

fn all_ids(views: &EntityViews) -> String {
    views
        .alarm_panels
        .iter()
        .map(|v| &v.id)
        .chain(views.switches.iter().map(|v| &v.id))
        .chain(views.binary_gates.iter().map(|v| &v.id))
        .chain(views.sensors.iter().map(|v| &v.id))
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
