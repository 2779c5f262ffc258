// REST client for the daemon's /api resource.
//
// Wraps `reqwest::Client` with zone-scoped URL construction and
// status-code mapping. The daemon returns bare JSON bodies (no envelope),
// so GET responses deserialize directly into the wire types.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{TstatStatus, ZoneConfigUpdate};
use crate::transport::TransportConfig;

/// HTTP client for the infinitive daemon's REST API.
///
/// `base_url` is the daemon root (e.g. `http://thermostat.local:8080`);
/// all paths are constructed beneath `/api`.
pub struct PanelClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PanelClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The daemon base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an API path: `{base}/api/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/api/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path
        );
        Url::parse(&full).map_err(Error::InvalidUrl)
    }

    /// Derive the WebSocket stream URL from the daemon base URL
    /// (`http` → `ws`, `https` → `wss`, path `/api/ws`).
    pub fn stream_url(&self) -> Result<Url, Error> {
        let mut url = self.api_url("ws")?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        // set_scheme only rejects invalid transitions; ws/wss are fine here
        url.set_scheme(scheme)
            .map_err(|()| Error::WebSocketConnect(format!("cannot derive stream URL from {url}")))?;
        Ok(url)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/zone/{zone}/config`.
    ///
    /// Zone 0 is the all-zones view the panel uses for its refresh.
    pub async fn get_zone_config(&self, zone: u8) -> Result<TstatStatus, Error> {
        self.get(self.api_url(&format!("zone/{zone}/config"))?)
            .await
    }

    /// `PUT /api/zone/{zone}/config` with a partial-update body.
    ///
    /// The response body is not meaningful and is discarded; only the
    /// status code is checked.
    pub async fn put_zone_config(&self, zone: u8, update: &ZoneConfigUpdate) -> Result<(), Error> {
        self.put(self.api_url(&format!("zone/{zone}/config"))?, update)
            .await
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let resp = check_status(resp).await?;

        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    async fn put(&self, url: Url, body: &impl Serialize) -> Result<(), Error> {
        debug!("PUT {}", url);

        let resp = self
            .http
            .put(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        check_status(resp).await?;
        Ok(())
    }
}

/// Map a non-success status to `Error::Api`, capturing the body as the
/// message so failures are loggable with their cause.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let message = resp.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        message: if message.is_empty() {
            status.to_string()
        } else {
            message
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> PanelClient {
        PanelClient::with_client(reqwest::Client::new(), base.parse().unwrap())
    }

    #[test]
    fn api_url_joins_under_api() {
        let c = client("http://192.168.1.4:8080");
        assert_eq!(
            c.api_url("zone/0/config").unwrap().as_str(),
            "http://192.168.1.4:8080/api/zone/0/config"
        );
    }

    #[test]
    fn api_url_tolerates_trailing_slash() {
        let c = client("http://192.168.1.4:8080/");
        assert_eq!(
            c.api_url("ws").unwrap().as_str(),
            "http://192.168.1.4:8080/api/ws"
        );
    }

    #[test]
    fn stream_url_follows_page_scheme() {
        let c = client("http://thermostat.local:8080");
        assert_eq!(
            c.stream_url().unwrap().as_str(),
            "ws://thermostat.local:8080/api/ws"
        );

        let c = client("https://thermostat.local");
        assert_eq!(
            c.stream_url().unwrap().as_str(),
            "wss://thermostat.local/api/ws"
        );
    }
}
