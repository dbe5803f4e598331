use thiserror::Error;

/// Top-level error type for the `jablosync-api` crate.
///
/// Covers every failure mode of the cloud boundary: authentication,
/// transport, the `{ http-code, data }` envelope, and payload decoding.
/// `jablosync-core` folds these into its own taxonomy.
///
/// A command the cloud *refused* (wrong PIN, section fault) is not an
/// error at this level; see [`Ack::Rejected`](crate::Ack::Rejected).
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, account locked, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Session cookie expired or was revoked by the cloud.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Cloud API ───────────────────────────────────────────────────
    /// Non-success response outside of a control request.
    #[error("Cloud API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Component id not in the `{service_id}:{component_id}` form, or
    /// naming a service this session never discovered.
    #[error("Unknown component id: {0}")]
    UnknownComponent(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` for credential failures that retrying won't fix.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::SessionExpired => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
