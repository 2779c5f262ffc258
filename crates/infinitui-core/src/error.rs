// ── Core error types ──
//
// User-facing errors from infinitui-core. Consumers never see raw HTTP
// or JSON failures directly; the `From<infinitui_api::Error>` impl
// translates transport-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach daemon at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Panel is not connected")]
    Disconnected,

    // ── Data errors ──────────────────────────────────────────────────
    /// A setpoint command arrived before any thermostat status did.
    #[error("No thermostat status received yet")]
    NoStatusYet,

    #[error("Zone {zone} is not present in the current thermostat status")]
    ZoneNotFound { zone: u8 },

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

impl From<infinitui_api::Error> for CoreError {
    fn from(err: infinitui_api::Error) -> Self {
        match err {
            infinitui_api::Error::Transport(ref e) => {
                if e.is_connect() || e.is_timeout() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            infinitui_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            infinitui_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            infinitui_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            infinitui_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("stream connection failed: {reason}"),
            },
            infinitui_api::Error::Parse { message, .. } => {
                CoreError::Internal(format!("Malformed stream frame: {message}"))
            }
        }
    }
}
