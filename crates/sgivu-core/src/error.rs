// ── Core error types ──
//
// Domain errors from sgivu-core. Consumers never see raw reqwest errors or
// JSON parse failures directly: the `From<sgivu_api::Error>` impl translates
// transport-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Session rejected by backend")]
    Unauthorized,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Unexpected response: {message}")]
    Deserialization { message: String },

    // ── Filter errors ────────────────────────────────────────────────
    #[error("Invalid filters: {message}")]
    Filter { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sgivu_api::Error> for CoreError {
    fn from(err: sgivu_api::Error) -> Self {
        let status = err.status();
        let not_found = err.is_not_found();
        match err {
            sgivu_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else if not_found {
                    CoreError::NotFound {
                        entity_type: "resource".into(),
                        identifier: e.url().map(|u| u.path().to_string()).unwrap_or_default(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status,
                    }
                }
            }
            sgivu_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            sgivu_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            sgivu_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            sgivu_api::Error::Unauthorized => CoreError::Unauthorized,
            sgivu_api::Error::Http {
                status: 404,
                message,
            } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: message,
            },
            sgivu_api::Error::Http { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            sgivu_api::Error::Deserialization { message, body: _ } => {
                CoreError::Deserialization { message }
            }
            sgivu_api::Error::InvalidFilters(message) => CoreError::Filter { message },
        }
    }
}
