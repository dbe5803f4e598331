mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use jablosync_api::{CloudClient, TransportConfig};
use jablosync_core::SyncConfig;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need the cloud
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "jablosync", &mut std::io::stdout());
            Ok(())
        }

        // Everything else talks to the cloud
        cmd => {
            let (client, sync_config) = build_client(&cli.global)?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, client, sync_config, &cli.global).await
        }
    }
}

/// Build the cloud client and sync settings from the active profile.
fn build_client(global: &GlobalOpts) -> Result<(CloudClient, SyncConfig), CliError> {
    let cfg = jablosync_config::load_config()?;
    let (profile_name, profile) = cfg.profile(global.profile.as_deref())?;

    let credentials = jablosync_config::resolve_credentials(profile, profile_name)?;
    let sync_config = jablosync_config::profile_to_sync_config(profile, profile_name)?;
    let base_url = jablosync_config::cloud_base_url(profile)?;

    let timeout = global.timeout.map_or_else(
        || jablosync_config::http_timeout(profile, &cfg.defaults),
        std::time::Duration::from_secs,
    );
    let transport = TransportConfig::default().with_timeout(timeout);

    let client = CloudClient::new(base_url, credentials, &transport)
        .map_err(jablosync_core::CoreError::from)?;
    Ok((client, sync_config))
}

