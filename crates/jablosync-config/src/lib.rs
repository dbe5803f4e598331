//! Configuration for the jablosync CLI and other hosts.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! validation of polling limits, and translation to
//! `jablosync_core::SyncConfig` and `jablosync_api::CloudCredentials`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use jablosync_api::{CloudCredentials, DEFAULT_BASE_URL};
use jablosync_core::SyncConfig;
use jablosync_core::config::{MIN_POLL_INTERVAL, MIN_POLL_TIMEOUT};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Service name under which secrets are stored in the system keyring.
pub const KEYRING_SERVICE: &str = "jablosync";

pub const PASSWORD_ENV: &str = "JABLOSYNC_PASSWORD";
pub const PIN_ENV: &str = "JABLOSYNC_PIN";
pub const USERNAME_ENV: &str = "JABLOSYNC_USERNAME";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{0}' not found")]
    UnknownProfile(String),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named installations.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownProfile(name.into()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// One alarm installation reachable through a cloud account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Cloud account login (usually an email address).
    pub username: Option<String>,

    /// Account password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    /// Default alarm code (plaintext; prefer keyring or env var).
    /// Empty means no default: every arm or disarm must carry a code.
    pub pin: Option<String>,

    /// Override of the cloud API base URL.
    pub base_url: Option<String>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Force arming over open zones when a section allows it.
    #[serde(default = "default_true")]
    pub default_bypass: bool,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    #[serde(default = "default_degraded_after")]
    pub degraded_after: u32,

    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,

    #[serde(default = "default_max_auto_retries")]
    pub max_auto_retries: u32,

    /// Whether the panel reports partial arming separately from full arming.
    #[serde(default = "default_true")]
    pub distinguishes_partial_arm: bool,

    /// Override the HTTP timeout.
    pub timeout: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            pin: None,
            base_url: None,
            poll_interval_secs: default_poll_interval(),
            poll_timeout_secs: default_poll_timeout(),
            default_bypass: true,
            max_backoff_secs: default_max_backoff(),
            degraded_after: default_degraded_after(),
            confirmation_timeout_secs: default_confirmation_timeout(),
            max_auto_retries: default_max_auto_retries(),
            distinguishes_partial_arm: true,
            timeout: None,
        }
    }
}

fn default_poll_interval() -> u64 {
    30
}
fn default_poll_timeout() -> u64 {
    15
}
fn default_true() -> bool {
    true
}
fn default_max_backoff() -> u64 {
    300
}
fn default_degraded_after() -> u32 {
    3
}
fn default_confirmation_timeout() -> u64 {
    90
}
fn default_max_auto_retries() -> u32 {
    1
}

// ── Validation ──────────────────────────────────────────────────────

/// Reject settings the cloud or the poll loop can't work with.
pub fn validate_profile(profile: &Profile) -> Result<(), ConfigError> {
    if Duration::from_secs(profile.poll_interval_secs) < MIN_POLL_INTERVAL {
        return Err(ConfigError::Validation {
            field: "poll_interval_secs".into(),
            reason: format!(
                "must be at least {}s, got {}s",
                MIN_POLL_INTERVAL.as_secs(),
                profile.poll_interval_secs
            ),
        });
    }
    if Duration::from_secs(profile.poll_timeout_secs) < MIN_POLL_TIMEOUT {
        return Err(ConfigError::Validation {
            field: "poll_timeout_secs".into(),
            reason: format!(
                "must be at least {}s, got {}s",
                MIN_POLL_TIMEOUT.as_secs(),
                profile.poll_timeout_secs
            ),
        });
    }
    if profile.degraded_after == 0 {
        return Err(ConfigError::Validation {
            field: "degraded_after".into(),
            reason: "must be at least 1".into(),
        });
    }
    if let Some(ref base) = profile.base_url {
        Url::parse(base).map_err(|e| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("{e}: {base}"),
        })?;
    }
    Ok(())
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "jablosync", "jablosync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("jablosync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing is fine) merged with `JABLOSYNC_*` env vars.
///
/// Nested keys use a double underscore, e.g.
/// `JABLOSYNC_PROFILES__HOME__POLL_INTERVAL_SECS=60`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("JABLOSYNC_").split("__"));

    let config: Config = figment.extract()?;
    for profile in config.profiles.values() {
        validate_profile(profile)?;
    }
    debug!(path = %path.display(), profiles = config.profiles.len(), "loaded config");
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Which secret of a profile to store or look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Password,
    Pin,
}

impl SecretKind {
    fn keyring_user(self, profile_name: &str) -> String {
        match self {
            Self::Password => format!("{profile_name}/password"),
            Self::Pin => format!("{profile_name}/pin"),
        }
    }
}

/// Store a secret in the system keyring.
pub fn store_secret(profile_name: &str, kind: SecretKind, value: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &kind.keyring_user(profile_name))?;
    entry.set_password(value)?;
    Ok(())
}

/// Env var, then keyring, then plaintext.
fn lookup_secret(
    env_name: &str,
    profile_name: &str,
    kind: SecretKind,
    plaintext: Option<&str>,
) -> Option<String> {
    // 1. Env var
    if let Ok(val) = std::env::var(env_name) {
        return Some(val);
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &kind.keyring_user(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Some(secret);
        }
    }

    // 3. Plaintext in config
    plaintext.map(str::to_owned)
}

/// Resolve the cloud account login.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<CloudCredentials, ConfigError> {
    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;

    let password = lookup_secret(
        PASSWORD_ENV,
        profile_name,
        SecretKind::Password,
        profile.password.as_deref(),
    )
    .ok_or_else(|| ConfigError::NoCredentials {
        profile: profile_name.into(),
    })?;

    Ok(CloudCredentials {
        username,
        password: SecretString::from(password),
    })
}

/// Resolve the default alarm code. `None` when unset or empty.
pub fn resolve_pin(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    lookup_secret(PIN_ENV, profile_name, SecretKind::Pin, profile.pin.as_deref())
        .and_then(non_empty_pin)
}

fn non_empty_pin(pin: String) -> Option<SecretString> {
    let trimmed = pin.trim();
    (!trimmed.is_empty()).then(|| SecretString::from(trimmed.to_owned()))
}

// ── Translation ─────────────────────────────────────────────────────

pub fn cloud_base_url(profile: &Profile) -> Result<Url, ConfigError> {
    let raw = profile.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
    Url::parse(raw).map_err(|e| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("{e}: {raw}"),
    })
}

/// HTTP timeout for the profile, falling back to the global default.
pub fn http_timeout(profile: &Profile, defaults: &Defaults) -> Duration {
    Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout))
}

/// Build a `SyncConfig` from a profile with an already resolved PIN.
pub fn sync_config(
    profile: &Profile,
    default_pin: Option<SecretString>,
) -> Result<SyncConfig, ConfigError> {
    validate_profile(profile)?;
    Ok(SyncConfig {
        default_pin,
        default_bypass: profile.default_bypass,
        poll_interval: Duration::from_secs(profile.poll_interval_secs),
        poll_timeout: Duration::from_secs(profile.poll_timeout_secs),
        max_backoff: Duration::from_secs(profile.max_backoff_secs),
        degraded_after: profile.degraded_after,
        confirmation_timeout: Duration::from_secs(profile.confirmation_timeout_secs),
        max_auto_retries: profile.max_auto_retries,
        distinguishes_partial_arm: profile.distinguishes_partial_arm,
    })
}

/// Build a `SyncConfig` from a profile, resolving the default PIN.
pub fn profile_to_sync_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<SyncConfig, ConfigError> {
    sync_config(profile, resolve_pin(profile, profile_name))
}
