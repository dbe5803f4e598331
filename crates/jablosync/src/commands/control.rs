//! `arm`, `disarm`, and `gate`: send one command, optionally wait for
//! polling to confirm it.

use jablosync_api::CloudClient;
use jablosync_core::{ArmMode, Controller, SyncConfig};

use crate::cli::{ArmArgs, DisarmArgs, GateArgs, GateSwitch, GlobalOpts};
use crate::commands::util;
use crate::error::CliError;

/// Fetch once so commands can be validated against current state.
async fn connect(
    client: CloudClient,
    config: SyncConfig,
) -> Result<Controller<CloudClient>, CliError> {
    let controller = Controller::new(client, config);
    controller.refresh_now().await?;
    Ok(controller)
}

fn report(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("✓ {message}");
    }
}

pub async fn arm(
    client: CloudClient,
    config: SyncConfig,
    args: ArmArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = connect(client, config).await?;
    let snapshot = controller.snapshot().ok_or(jablosync_core::CoreError::NoSnapshot)?;
    let section = util::resolve_section(&snapshot, &args.section)?;
    let pin = util::read_pin(&args.pin)?;
    let mode = if args.home { ArmMode::Home } else { ArmMode::Away };

    let outcomes = controller.outcomes();
    controller
        .arm(section.as_str(), mode, pin, args.bypass())
        .await?;
    report(global, &format!("Arm ({mode}) accepted for {section}"));

    if args.pin.wait {
        util::wait_for_confirmation(&controller, &section, outcomes).await?;
        report(global, &format!("{section} is armed"));
    }
    Ok(())
}

pub async fn disarm(
    client: CloudClient,
    config: SyncConfig,
    args: DisarmArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = connect(client, config).await?;
    let snapshot = controller.snapshot().ok_or(jablosync_core::CoreError::NoSnapshot)?;
    let section = util::resolve_section(&snapshot, &args.section)?;
    let pin = util::read_pin(&args.pin)?;

    let outcomes = controller.outcomes();
    controller.disarm(section.as_str(), pin).await?;
    report(global, &format!("Disarm accepted for {section}"));

    if args.pin.wait {
        util::wait_for_confirmation(&controller, &section, outcomes).await?;
        report(global, &format!("{section} is disarmed"));
    }
    Ok(())
}

pub async fn gate(
    client: CloudClient,
    config: SyncConfig,
    args: GateArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = connect(client, config).await?;
    let snapshot = controller.snapshot().ok_or(jablosync_core::CoreError::NoSnapshot)?;
    let gate = util::resolve_gate(&snapshot, &args.gate)?;
    let on = args.state == GateSwitch::On;
    let label = if on { "on" } else { "off" };

    let outcomes = controller.outcomes();
    controller.set_gate(gate.as_str(), on).await?;
    report(global, &format!("Switching {gate} {label} accepted"));

    if args.wait {
        util::wait_for_confirmation(&controller, &gate, outcomes).await?;
        report(global, &format!("{gate} is {label}"));
    }
    Ok(())
}
