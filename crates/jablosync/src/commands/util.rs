//! Shared helpers for command handlers.

use std::time::Duration;

use jablosync_api::RemoteClient;
use jablosync_core::{CommandOutcome, Controller, EntityId, OutcomeStatus, Snapshot};
use secrecy::SecretString;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::cli::PinArgs;
use crate::error::CliError;

/// Resolve a section by id, panel-local id, or name (case-insensitive).
pub fn resolve_section(snapshot: &Snapshot, identifier: &str) -> Result<EntityId, CliError> {
    resolve(
        snapshot.sections().map(|s| (&s.id, s.name.as_str())),
        identifier,
        "section",
    )
}

/// Resolve a programmable gate the same way as sections.
pub fn resolve_gate(snapshot: &Snapshot, identifier: &str) -> Result<EntityId, CliError> {
    resolve(
        snapshot.gates().map(|g| (&g.id, g.name.as_str())),
        identifier,
        "gate",
    )
}

fn resolve<'a>(
    candidates: impl Iterator<Item = (&'a EntityId, &'a str)>,
    identifier: &str,
    resource_type: &str,
) -> Result<EntityId, CliError> {
    let mut by_name = Vec::new();
    for (id, name) in candidates {
        if id.as_str() == identifier || id.component() == identifier {
            return Ok(id.clone());
        }
        if name.eq_ignore_ascii_case(identifier) {
            by_name.push(id.clone());
        }
    }

    match by_name.len() {
        0 => Err(CliError::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
        }),
        1 => Ok(by_name.remove(0)),
        _ => Err(CliError::Validation {
            field: resource_type.into(),
            reason: format!(
                "'{identifier}' matches several: {}; use an id",
                by_name
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }),
    }
}

/// The code given on the command line or typed at a prompt.
pub fn read_pin(args: &PinArgs) -> Result<Option<SecretString>, CliError> {
    if let Some(ref pin) = args.pin {
        return Ok(Some(SecretString::from(pin.clone())));
    }
    if !args.ask_pin {
        return Ok(None);
    }
    let pin = dialoguer::Password::new()
        .with_prompt("Alarm code")
        .interact()
        .map_err(prompt_err)?;
    Ok(Some(SecretString::from(pin)))
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Poll until the command for `entity` settles.
///
/// `outcomes` must be subscribed before the command was issued.
pub async fn wait_for_confirmation<C: RemoteClient>(
    controller: &Controller<C>,
    entity: &EntityId,
    mut outcomes: broadcast::Receiver<CommandOutcome>,
) -> Result<(), CliError> {
    let config = controller.config();
    let limit: Duration = config.confirmation_timeout + config.poll_interval;

    eprintln!(
        "Waiting up to {} for the panel to confirm...",
        humantime::format_duration(limit)
    );
    controller.start();
    let settled = tokio::time::timeout(limit, async {
        loop {
            match outcomes.recv().await {
                Ok(outcome) if &outcome.entity_id == entity && outcome.status.is_final() => {
                    return Ok(outcome.status);
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => {
                    return Err(CliError::ConnectionFailed {
                        message: "controller shut down while waiting".into(),
                    });
                }
            }
        }
    })
    .await;
    controller.shutdown().await;

    match settled {
        Ok(Ok(OutcomeStatus::Confirmed)) => Ok(()),
        Ok(Ok(status)) => Err(CliError::Unconfirmed {
            entity: entity.to_string(),
            outcome: describe(&status),
        }),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(CliError::Timeout {
            seconds: limit.as_secs(),
        }),
    }
}

fn describe(status: &OutcomeStatus) -> String {
    match status {
        OutcomeStatus::Diverged { reported } => format!("panel still reports {reported}"),
        OutcomeStatus::Expired => "no confirming poll in time".into(),
        OutcomeStatus::Superseded => "replaced by a later command".into(),
        OutcomeStatus::Failed { reason } => format!("re-send failed: {reason}"),
        other => format!("{other:?}"),
    }
}
