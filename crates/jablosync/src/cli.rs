//! Clap derive structures for the `jablosync` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// jablosync -- control Jablotron alarms through the Jablonet cloud
#[derive(Debug, Parser)]
#[command(
    name = "jablosync",
    version,
    about = "Monitor and control Jablotron alarm systems from the command line",
    long_about = "Polls the Jablonet cloud for section, programmable gate, and sensor\n\
        state, and sends arm, disarm, and gate commands. Every command is\n\
        confirmed by a later poll; the cloud has no push channel.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Installation profile to use
    #[arg(long, short = 'p', env = "JABLOSYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "JABLOSYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// HTTP request timeout in seconds (overrides profile)
    #[arg(long, env = "JABLOSYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show sections, gates, and sensors
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Poll continuously and print changes
    Watch(WatchArgs),

    /// Arm a section
    Arm(ArmArgs),

    /// Disarm a section
    Disarm(DisarmArgs),

    /// Switch a programmable gate
    #[command(alias = "pg")]
    Gate(GateArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STATUS / WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Only show this kind of entity
    #[arg(long, short = 'k')]
    pub kind: Option<EntityKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityKind {
    Sections,
    Switches,
    Gates,
    Sensors,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in seconds (overrides profile, minimum 20)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMMANDS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Code options shared by arm and disarm.
#[derive(Debug, Args)]
pub struct PinArgs {
    /// Alarm code (overrides the profile's default PIN)
    #[arg(long, env = "JABLOSYNC_COMMAND_PIN", hide_env_values = true, conflicts_with = "ask_pin")]
    pub pin: Option<String>,

    /// Prompt for the alarm code
    #[arg(long)]
    pub ask_pin: bool,

    /// Wait until a poll confirms the new state
    #[arg(long, short = 'w')]
    pub wait: bool,
}

#[derive(Debug, Args)]
pub struct ArmArgs {
    /// Section id or name
    pub section: String,

    /// Arm partially ("home") instead of fully
    #[arg(long)]
    pub home: bool,

    /// Arm over open zones where the section allows it
    #[arg(long, overrides_with = "no_bypass")]
    pub bypass: bool,

    /// Refuse to arm over open zones
    #[arg(long, overrides_with = "bypass")]
    pub no_bypass: bool,

    #[command(flatten)]
    pub pin: PinArgs,
}

impl ArmArgs {
    /// `None` defers to the profile default.
    pub fn bypass(&self) -> Option<bool> {
        match (self.bypass, self.no_bypass) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Debug, Args)]
pub struct DisarmArgs {
    /// Section id or name
    pub section: String,

    #[command(flatten)]
    pub pin: PinArgs,
}

#[derive(Debug, Args)]
pub struct GateArgs {
    /// Gate id or name
    pub gate: String,

    /// Desired state
    pub state: GateSwitch,

    /// Wait until a poll confirms the new state
    #[arg(long, short = 'w')]
    pub wait: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GateSwitch {
    On,
    Off,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a profile value
    Set {
        /// Profile key (e.g., "poll_interval_secs")
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the account password or default PIN in the system keyring
    SetSecret {
        /// Store the default alarm code instead of the password
        #[arg(long)]
        pin: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
