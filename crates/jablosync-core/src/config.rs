// ── Runtime synchronization configuration ──
//
// These types describe *how* to poll and command an installation.
// They carry the default PIN and timing knobs, but never touch disk.
// The CLI builds a `SyncConfig` from its profile and hands it in.

use std::time::Duration;

use secrecy::SecretString;

/// Shortest poll interval the cloud tolerates without throttling.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Shortest allowed bound on a single poll cycle.
pub const MIN_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Tuning for the coordinator and dispatcher.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Code used when a command carries none. `None` means commands
    /// without an explicit PIN fail with `MissingPin`.
    pub default_pin: Option<SecretString>,
    /// Whether arming forces past open zones unless the caller says otherwise.
    pub default_bypass: bool,
    /// Delay between successful polls; also the base of the failure backoff.
    pub poll_interval: Duration,
    /// Upper bound on one fetch cycle; exceeding it counts as a failure.
    pub poll_timeout: Duration,
    /// Ceiling for the exponential failure backoff.
    pub max_backoff: Duration,
    /// Consecutive failed cycles before entities report unavailable.
    pub degraded_after: u32,
    /// How long an accepted command may stay unconfirmed by polling.
    pub confirmation_timeout: Duration,
    /// Re-sends allowed when polling contradicts an accepted command.
    pub max_auto_retries: u32,
    /// Whether the cloud reports partial arming distinctly from full
    /// arming. When `false`, a "home" arm is confirmed by either.
    pub distinguishes_partial_arm: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_pin: None,
            default_bypass: true,
            poll_interval: Duration::from_secs(30),
            poll_timeout: Duration::from_secs(15),
            max_backoff: Duration::from_secs(300),
            degraded_after: 3,
            confirmation_timeout: Duration::from_secs(90),
            max_auto_retries: 1,
            distinguishes_partial_arm: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_respect_minimums() {
        let config = SyncConfig::default();
        assert!(config.poll_interval >= MIN_POLL_INTERVAL);
        assert!(config.poll_timeout >= MIN_POLL_TIMEOUT);
        assert!(config.max_backoff >= config.poll_interval);
        assert!(config.default_bypass);
        assert!(config.default_pin.is_none());
    }
}
