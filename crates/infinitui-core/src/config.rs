// ── Runtime connection configuration ──
//
// Describes *how* to reach an infinitive daemon. The TUI constructs a
// `PanelConfig` from its config file and CLI flags and hands it in;
// core never touches disk.

use std::time::Duration;

use url::Url;

use infinitui_api::stream::ReconnectConfig;

/// Configuration for connecting to a single daemon.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Daemon base URL (e.g., `http://192.168.1.4:8080`). The stream
    /// URL is derived from it: `ws(s)://<host>[:port]/api/ws`.
    pub url: Url,

    /// Request timeout for REST calls.
    pub timeout: Duration,

    /// Stream reconnection policy.
    pub reconnect: ReconnectConfig,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080"
                .parse()
                .expect("default URL is valid"),
            timeout: Duration::from_secs(10),
            reconnect: ReconnectConfig::default(),
        }
    }
}
