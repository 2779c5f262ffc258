// Integration tests for `PanelClient` using wiremock.

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use infinitui_api::{Error, FanMode, OperatingMode, PanelClient, ZoneConfigUpdate};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, PanelClient) {
    let server = MockServer::start().await;
    let client = PanelClient::with_client(reqwest::Client::new(), server.uri().parse().unwrap());
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_get_zone_config() {
    let (server, client) = setup().await;

    let body = json!({
        "zones": [
            {
                "zoneNumber": 1,
                "currentTemp": 72,
                "currentHumidity": 38,
                "zoneName": "Downstairs",
                "fanMode": "auto",
                "hold": false,
                "preset": "home",
                "heatSetpoint": 68,
                "coolSetpoint": 74,
                "overrideDuration": "",
                "overrideDurationMins": 0
            },
            {
                "zoneNumber": 2,
                "currentTemp": 69,
                "currentHumidity": 41,
                "zoneName": "Upstairs",
                "fanMode": "low",
                "hold": true,
                "preset": "sleep",
                "heatSetpoint": 64,
                "coolSetpoint": 78
            }
        ],
        "outdoorTemp": 51,
        "mode": "heat",
        "stage": 1,
        "action": "heating",
        "rawMode": 0
    });

    Mock::given(method("GET"))
        .and(path("/api/zone/0/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let status = client.get_zone_config(0).await.unwrap();

    assert_eq!(status.zones.len(), 2);
    assert_eq!(status.mode, "heat");
    assert_eq!(status.outdoor_temp, 51);
    assert_eq!(status.zone(1).unwrap().zone_name, "Downstairs");
    assert_eq!(status.zone(2).unwrap().hold, Some(true));
    assert_eq!(status.zone(2).unwrap().cool_setpoint, 78);
}

#[tokio::test]
async fn test_put_fan_mode_sends_only_fan_mode() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/zone/2/config"))
        .and(body_json(json!({ "fanMode": "high" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .put_zone_config(2, &ZoneConfigUpdate::fan_mode(FanMode::High))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_put_mode_sends_only_mode() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/zone/1/config"))
        .and(body_json(json!({ "mode": "cool" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .put_zone_config(1, &ZoneConfigUpdate::mode(OperatingMode::Cool))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_put_setpoint_is_absolute_value() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/zone/1/config"))
        .and(body_json(json!({ "coolSetpoint": 70 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .put_zone_config(1, &ZoneConfigUpdate::cool_setpoint(70))
        .await
        .unwrap();
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_error_status_carries_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/zone/0/config"))
        .respond_with(ResponseTemplate::new(504).set_body_string("timed out waiting for response"))
        .mount(&server)
        .await;

    let result = client.get_zone_config(0).await;

    match result {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 504);
            assert_eq!(message, "timed out waiting for response");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_bad_body_is_deserialization() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/zone/0/config"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let result = client.get_zone_config(0).await;

    match result {
        Err(Error::Deserialization { body, .. }) => {
            assert_eq!(body, "<html>not json</html>");
        }
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_put_failure_is_reported() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/zone/1/config"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bind failed"))
        .mount(&server)
        .await;

    let result = client
        .put_zone_config(1, &ZoneConfigUpdate::hold(true))
        .await;

    assert!(
        matches!(result, Err(Error::Api { status: 400, .. })),
        "expected Api 400, got: {result:?}"
    );
}
