// ── Core error types ──
//
// User-facing errors from jablosync-core. Consumers never see HTTP
// status codes or JSON parse failures directly; the
// `From<jablosync_api::Error>` impl folds them into `Transport`.

use thiserror::Error;

use crate::model::EntityId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote failures ──────────────────────────────────────────────
    /// The cloud could not be reached or would not authenticate us.
    #[error("Remote call failed: {message}")]
    Transport {
        message: String,
        /// `true` when credentials, not the network, are at fault.
        auth: bool,
    },

    /// The cloud answered but refused the command.
    #[error("Command for {entity_id} rejected: {reason}")]
    CommandRejected { entity_id: EntityId, reason: String },

    // ── Local validation ─────────────────────────────────────────────
    #[error("No PIN given for {section_id} and no default PIN configured")]
    MissingPin { section_id: EntityId },

    #[error("{entity_id} is read-only and cannot be controlled")]
    NotControllable { entity_id: EntityId },

    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    #[error("Operation not supported: {operation} ({reason})")]
    Unsupported { operation: String, reason: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("No data has been fetched yet")]
    NoSnapshot,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub fn not_found(entity_type: &'static str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            identifier: identifier.into(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Transport { auth: true, .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<jablosync_api::Error> for CoreError {
    fn from(err: jablosync_api::Error) -> Self {
        match err {
            jablosync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            jablosync_api::Error::UnknownComponent(id) => CoreError::not_found("component", id),
            other => CoreError::Transport {
                auth: other.is_auth_failure(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_keep_their_flag() {
        let err = CoreError::from(jablosync_api::Error::Authentication {
            message: "bad password".into(),
        });
        assert!(err.is_auth());
        assert!(matches!(err, CoreError::Transport { .. }));
    }

    #[test]
    fn unknown_component_is_not_found() {
        let err = CoreError::from(jablosync_api::Error::UnknownComponent("9:PG-1".into()));
        assert!(matches!(
            err,
            CoreError::NotFound { entity_type: "component", ref identifier } if identifier == "9:PG-1"
        ));
    }

    #[test]
    fn timeouts_are_transport() {
        let err = CoreError::from(jablosync_api::Error::Timeout { timeout_secs: 15 });
        assert!(!err.is_auth());
        assert!(err.to_string().contains("15s"));
    }
}
