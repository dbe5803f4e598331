//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use jablosync_config::ConfigError;
use jablosync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 5;
    pub const UNSUPPORTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Jablonet cloud: {message}")]
    #[diagnostic(
        code(jablosync::connection_failed),
        help("Check your network connection. Run with -v for details.")
    )]
    ConnectionFailed { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(jablosync::auth_failed),
        help(
            "Verify the account username and password.\n\
             Run: jablosync config set-secret"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(jablosync::no_credentials),
        help(
            "Configure credentials with: jablosync config init\n\
             Or set JABLOSYNC_USERNAME and JABLOSYNC_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("No alarm code for section '{section}'")]
    #[diagnostic(
        code(jablosync::missing_pin),
        help(
            "Pass --pin or --ask-pin, or store a default code with:\n\
             jablosync config set-secret --pin"
        )
    )]
    MissingPin { section: String },

    #[error("The alarm refused the command for '{entity}': {reason}")]
    #[diagnostic(
        code(jablosync::rejected),
        help("A wrong code or an open zone without --bypass are the usual causes.")
    )]
    Rejected { entity: String, reason: String },

    #[error("'{entity}' is read-only")]
    #[diagnostic(code(jablosync::not_controllable))]
    NotControllable { entity: String },

    #[error("Operation '{operation}' is not supported: {reason}")]
    #[diagnostic(code(jablosync::unsupported))]
    Unsupported { operation: String, reason: String },

    #[error("Command for '{entity}' ended unconfirmed: {outcome}")]
    #[diagnostic(
        code(jablosync::unconfirmed),
        help("The panel did not report the requested state. Run: jablosync status")
    )]
    Unconfirmed { entity: String, outcome: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(jablosync::not_found),
        help("Run: jablosync status to see available ids and names")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(jablosync::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(jablosync::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: jablosync config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(jablosync::config))]
    Config(ConfigError),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Timed out after {seconds}s")]
    #[diagnostic(
        code(jablosync::timeout),
        help("Increase --timeout or check the cloud's responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } | Self::Unconfirmed { .. } => exit_code::REJECTED,
            Self::NotControllable { .. } | Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::MissingPin { .. } => exit_code::USAGE,
            Self::Config(ConfigError::NoCredentials { .. }) => exit_code::AUTH,
            Self::Config(ConfigError::Validation { .. }) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile(name) => CliError::ProfileNotFound {
                name,
                available: "(run: jablosync config profiles)".into(),
            },
            other => CliError::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport {
                message,
                auth: true,
            } => CliError::AuthFailed { message },

            CoreError::Transport { message, .. } => CliError::ConnectionFailed { message },

            CoreError::CommandRejected { entity_id, reason } => CliError::Rejected {
                entity: entity_id.to_string(),
                reason,
            },

            CoreError::MissingPin { section_id } => CliError::MissingPin {
                section: section_id.to_string(),
            },

            CoreError::NotControllable { entity_id } => CliError::NotControllable {
                entity: entity_id.to_string(),
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                resource_type: entity_type.into(),
                identifier,
            },

            CoreError::Unsupported { operation, reason } => {
                CliError::Unsupported { operation, reason }
            }

            CoreError::NoSnapshot => CliError::ConnectionFailed {
                message: "no data has been fetched yet".into(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}
