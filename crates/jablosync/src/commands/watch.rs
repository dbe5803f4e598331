//! `watch`: keep polling and print state changes until interrupted.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Local;
use jablosync_api::CloudClient;
use jablosync_core::config::MIN_POLL_INTERVAL;
use jablosync_core::{Availability, Controller, EntityViews, SyncConfig};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

/// Last printed state per entity id.
#[derive(Default)]
struct Seen(HashMap<String, String>);

impl Seen {
    /// Every entity whose display state differs from the last print.
    fn diff(&mut self, views: &EntityViews, color: bool) -> Vec<String> {
        let current = views
            .alarm_panels
            .iter()
            .map(|v| {
                let mut state = output::panel_state(v.state, color);
                if v.pending {
                    state.push_str(" (pending)");
                }
                (v.id.to_string(), v.name.clone(), state)
            })
            .chain(
                views
                    .switches
                    .iter()
                    .map(|v| (v.id.to_string(), v.name.clone(), output::on_off(v.is_on))),
            )
            .chain(
                views
                    .binary_gates
                    .iter()
                    .map(|v| (v.id.to_string(), v.name.clone(), output::on_off(v.is_on))),
            )
            .chain(views.sensors.iter().map(|v| {
                let value = v
                    .value
                    .map_or_else(|| "-".into(), |value| format!("{value:.1} {}", v.unit));
                (v.id.to_string(), v.name.clone(), value)
            }));

        let mut lines = Vec::new();
        for (id, name, state) in current {
            if self.0.get(&id) == Some(&state) {
                continue;
            }
            lines.push(format!("{id} {name}: {state}"));
            self.0.insert(id, state);
        }
        lines
    }
}

fn stamp(line: &str) -> String {
    format!("{} {line}", Local::now().format("%H:%M:%S"))
}

pub async fn handle(
    client: CloudClient,
    mut config: SyncConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(secs) = args.interval {
        let interval = Duration::from_secs(secs);
        if interval < MIN_POLL_INTERVAL {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: format!("must be at least {}s", MIN_POLL_INTERVAL.as_secs()),
            });
        }
        config.poll_interval = interval;
    }

    let controller = Controller::new(client, config);
    let color = output::should_color(&global.color);
    let structured = !matches!(global.output, OutputFormat::Table | OutputFormat::Plain);

    let mut snapshots = controller.subscribe();
    let mut availability = controller.availability_changes();
    let mut outcomes = controller.outcomes();
    let mut status = controller.subscribe_status();
    let mut seen = Seen::default();

    controller.start();
    if !global.quiet {
        eprintln!(
            "Polling every {}. Press Ctrl-C to stop.",
            humantime::format_duration(controller.config().poll_interval)
        );
    }

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            snapshot = snapshots.changed() => {
                if snapshot.is_none() {
                    break;
                }
                let views = controller.entities();
                if structured {
                    if let Ok(line) = serde_json::to_string(&views) {
                        output::print_output(&line, global.quiet);
                    }
                } else {
                    for line in seen.diff(&views, color) {
                        output::print_output(&stamp(&line), global.quiet);
                    }
                }
            }
            changed = availability.changed() => {
                if changed.is_err() {
                    break;
                }
                let now = *availability.borrow_and_update();
                if now == Availability::Degraded {
                    eprintln!("{}", stamp("cloud unreachable, entities unavailable"));
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                if let Some(ref err) = current.last_error {
                    if current.consecutive_failures > 0 {
                        eprintln!(
                            "{}",
                            stamp(&format!(
                                "poll failed ({err}), retrying in {}",
                                humantime::format_duration(current.next_delay)
                            ))
                        );
                    }
                }
            }
            outcome = outcomes.recv() => match outcome {
                Ok(outcome) => debug!(entity = %outcome.entity_id, status = ?outcome.status, "command outcome"),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.shutdown().await;
    Ok(())
}
