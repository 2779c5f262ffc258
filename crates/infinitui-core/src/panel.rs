// ── Panel abstraction ──
//
// Full lifecycle management for a daemon connection. Owns the REST
// client and the status stream, routes stream messages into the
// PanelState slots, and executes user commands off a channel so the
// UI never blocks on the network.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{PanelCommand, plan_put};
use crate::config::PanelConfig;
use crate::error::CoreError;
use crate::state::PanelState;

use infinitui_api::PanelClient;
use infinitui_api::stream::{StreamEvent, StreamHandle, StreamState};
use infinitui_api::transport::TransportConfig;

const COMMAND_CHANNEL_SIZE: usize = 64;

/// Zone queried for the all-zones status refresh.
const ALL_ZONES: u8 = 0;

// ── Panel ────────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<PanelInner>`. Manages the connection
/// lifecycle: the status stream (with its reconnect loop), command
/// routing, and reactive state in [`PanelState`].
#[derive(Clone)]
pub struct Panel {
    inner: Arc<PanelInner>,
}

struct PanelInner {
    config: PanelConfig,
    state: Arc<PanelState>,
    client: PanelClient,
    stream_state: watch::Sender<StreamState>,
    command_tx: mpsc::Sender<PanelCommand>,
    command_rx: Mutex<Option<mpsc::Receiver<PanelCommand>>>,
    stream: Mutex<Option<StreamHandle>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Panel {
    /// Create a new Panel from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to start the stream and
    /// background tasks.
    pub fn new(config: PanelConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
        };
        let client = PanelClient::new(config.url.clone(), &transport)?;

        let (stream_state, _) = watch::channel(StreamState::Disconnected);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(PanelInner {
                config,
                state: Arc::new(PanelState::new()),
                client,
                stream_state,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                stream: Mutex::new(None),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Access the panel configuration.
    pub fn config(&self) -> &PanelConfig {
        &self.inner.config
    }

    /// Access the reactive state.
    pub fn state(&self) -> &Arc<PanelState> {
        &self.inner.state
    }

    /// Subscribe to stream connection state changes.
    pub fn stream_state(&self) -> watch::Receiver<StreamState> {
        self.inner.stream_state.subscribe()
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Connect to the daemon.
    ///
    /// Starts the status stream (which owns its own reconnect loop),
    /// spawns the dispatcher and command processor tasks, and kicks off
    /// an initial REST refresh. A failed initial refresh is logged but
    /// not fatal; the stream delivers full state on every update anyway.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let ws_url = self.inner.client.stream_url()?;

        let handle = StreamHandle::connect(
            ws_url,
            self.inner.config.reconnect.clone(),
            self.inner.cancel.clone(),
        );

        let mut handles = self.inner.task_handles.lock().await;

        let events = handle.subscribe();
        let stream_states = handle.state();
        let panel = self.clone();
        handles.push(tokio::spawn(dispatcher_task(panel, events, stream_states)));

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let panel = self.clone();
            handles.push(tokio::spawn(command_processor_task(panel, rx)));
        }

        drop(handles);
        *self.inner.stream.lock().await = Some(handle);

        if let Err(e) = self.refresh_state().await {
            warn!(error = %e, "initial status refresh failed, waiting on stream");
        }

        info!(url = %self.inner.config.url, "panel connected");
        Ok(())
    }

    /// Disconnect from the daemon.
    ///
    /// Cancels background tasks, joins them, and resets the stream
    /// state to [`Disconnected`](StreamState::Disconnected).
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        if let Some(stream) = self.inner.stream.lock().await.take() {
            stream.shutdown();
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner
            .stream_state
            .send_replace(StreamState::Disconnected);
        debug!("panel disconnected");
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Submit a command for asynchronous execution.
    ///
    /// Never blocks; the command processor applies it and logs the
    /// outcome. Resulting state changes arrive back through the stream.
    pub fn submit(&self, cmd: PanelCommand) -> Result<(), CoreError> {
        self.inner
            .command_tx
            .try_send(cmd)
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    CoreError::Internal("command channel full".into())
                }
                mpsc::error::TrySendError::Closed(_) => CoreError::Disconnected,
            })
    }

    /// Re-fetch the all-zones thermostat status over REST and replace
    /// the `tstat` slot with the result.
    pub async fn refresh_state(&self) -> Result<(), CoreError> {
        let status = self.inner.client.get_zone_config(ALL_ZONES).await?;
        self.inner.state.set_tstat(status);
        debug!("status refresh complete");
        Ok(())
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Forward stream events into the PanelState slots and mirror the
/// stream's connection state into the panel's watch channel.
async fn dispatcher_task(
    panel: Panel,
    mut events: tokio::sync::broadcast::Receiver<Arc<StreamEvent>>,
    mut stream_states: watch::Receiver<StreamState>,
) {
    use tokio::sync::broadcast::error::RecvError;

    let cancel = panel.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = stream_states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = stream_states.borrow_and_update().clone();
                panel.inner.stream_state.send_replace(state);
            }
            event = events.recv() => {
                match event {
                    Ok(event) => apply_event(&panel.inner.state, &event),
                    Err(RecvError::Lagged(skipped)) => {
                        // Fine for full-state messages; the next one
                        // supersedes everything we missed.
                        warn!(skipped, "dispatcher lagged behind stream");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    debug!("dispatcher exiting");
}

/// Route one stream event into the state slots.
///
/// Known sources replace their slot wholesale. A payload that fails to
/// deserialize leaves the slot untouched and records a diagnostic, as
/// does a malformed frame. Unknown sources are dropped with a debug log.
fn apply_event(state: &PanelState, event: &StreamEvent) {
    match event {
        StreamEvent::Status(msg) => {
            match msg.source.as_str() {
                "tstat" => match serde_json::from_value(msg.data.clone()) {
                    Ok(status) => {
                        state.set_tstat(status);
                        state.touch_stream_update();
                    }
                    Err(e) => record_bad_payload(state, "tstat", &e),
                },
                "blower" => match serde_json::from_value(msg.data.clone()) {
                    Ok(status) => {
                        state.set_blower(status);
                        state.touch_stream_update();
                    }
                    Err(e) => record_bad_payload(state, "blower", &e),
                },
                "heatpump" => match serde_json::from_value(msg.data.clone()) {
                    Ok(status) => {
                        state.set_heatpump(status);
                        state.touch_stream_update();
                    }
                    Err(e) => record_bad_payload(state, "heatpump", &e),
                },
                other => {
                    debug!(source = other, "ignoring stream source");
                }
            }
        }
        StreamEvent::Malformed(e) => {
            state.record_parse_failure(e.to_string());
        }
    }
}

fn record_bad_payload(state: &PanelState, source: &str, err: &serde_json::Error) {
    warn!(source, error = %err, "undecodable stream payload");
    state.record_parse_failure(format!("{source}: {err}"));
}

/// Process commands from the mpsc channel, translating each into a
/// REST call. Execution is fire-and-forget; failures are logged and the
/// displayed state simply stays where the last stream message left it.
async fn command_processor_task(panel: Panel, mut rx: mpsc::Receiver<PanelCommand>) {
    let cancel = panel.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            cmd = rx.recv() => {
                let Some(cmd) = cmd else { break };
                if let Err(e) = run_command(&panel, &cmd).await {
                    warn!(?cmd, error = %e, "command failed");
                }
            }
        }
    }

    debug!("command processor exiting");
}

async fn run_command(panel: &Panel, cmd: &PanelCommand) -> Result<(), CoreError> {
    if matches!(cmd, PanelCommand::RefreshState) {
        return panel.refresh_state().await;
    }

    let tstat = panel.inner.state.tstat();
    let plan = plan_put(cmd, tstat.as_deref())?;

    panel
        .inner
        .client
        .put_zone_config(plan.zone, &plan.update)
        .await?;

    debug!(zone = plan.zone, ?cmd, "config write applied");
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use infinitui_api::stream::StatusMessage;

    use super::*;

    fn status_event(source: &str, data: serde_json::Value) -> StreamEvent {
        StreamEvent::Status(StatusMessage {
            source: source.into(),
            data,
        })
    }

    #[test]
    fn tstat_message_fills_tstat_slot_only() {
        let state = PanelState::new();

        apply_event(
            &state,
            &status_event("tstat", serde_json::json!({ "zones": [], "mode": "heat" })),
        );

        assert_eq!(state.tstat().expect("tstat set").mode, "heat");
        assert!(state.blower().is_none());
        assert!(state.heatpump().is_none());
        assert!(state.last_stream_update().is_some());
    }

    #[test]
    fn later_message_supersedes_earlier() {
        let state = PanelState::new();

        apply_event(
            &state,
            &status_event("blower", serde_json::json!({ "blowerRPM": 400 })),
        );
        apply_event(
            &state,
            &status_event("blower", serde_json::json!({ "blowerRPM": 900 })),
        );

        assert_eq!(state.blower().expect("blower set").blower_rpm, 900);
    }

    #[test]
    fn unknown_source_changes_nothing() {
        let state = PanelState::new();

        apply_event(
            &state,
            &status_event("damperpos", serde_json::json!({ "damperPosition": [10, 0] })),
        );

        assert!(state.tstat().is_none());
        assert!(state.blower().is_none());
        assert!(state.heatpump().is_none());
        assert_eq!(state.diagnostics().parse_failures, 0);
        assert!(state.last_stream_update().is_none());
    }

    #[test]
    fn undecodable_payload_leaves_slot_and_records_diagnostic() {
        let state = PanelState::new();

        apply_event(
            &state,
            &status_event("heatpump", serde_json::json!({ "coilTemp": 41.5 })),
        );
        // coilTemp must be a number; this payload must not clobber the slot
        apply_event(
            &state,
            &status_event("heatpump", serde_json::json!({ "coilTemp": "broken" })),
        );

        let heatpump = state.heatpump().expect("first payload kept");
        assert!((heatpump.coil_temp - 41.5).abs() < f32::EPSILON);

        let diag = state.diagnostics();
        assert_eq!(diag.parse_failures, 1);
        assert!(diag.last_parse_error.expect("recorded").contains("heatpump"));
    }

    #[test]
    fn malformed_frame_records_diagnostic() {
        let state = PanelState::new();

        apply_event(
            &state,
            &StreamEvent::Malformed(Arc::new(infinitui_api::Error::Parse {
                message: "missing field `source`".into(),
                frame: "{}".into(),
            })),
        );

        assert_eq!(state.diagnostics().parse_failures, 1);
    }

    #[test]
    fn dispatch_order_is_arrival_order() {
        let state = PanelState::new();

        apply_event(
            &state,
            &status_event("tstat", serde_json::json!({ "zones": [], "mode": "heat" })),
        );
        apply_event(
            &state,
            &status_event("blower", serde_json::json!({ "blowerRPM": 500 })),
        );
        apply_event(
            &state,
            &status_event("tstat", serde_json::json!({ "zones": [], "mode": "cool" })),
        );

        assert_eq!(state.tstat().expect("tstat set").mode, "cool");
        assert_eq!(state.blower().expect("blower set").blower_rpm, 500);
    }

    #[tokio::test]
    async fn refresh_replaces_tstat_slot_with_response_body() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/zone/0/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "zones": [{
                    "currentTemp": 71,
                    "currentHumidity": 44,
                    "fanMode": "auto",
                    "heatSetpoint": 64,
                    "coolSetpoint": 68
                }],
                "mode": "cool"
            })))
            .mount(&server)
            .await;

        let config = PanelConfig {
            url: server.uri().parse().expect("mock server URL"),
            ..PanelConfig::default()
        };
        let panel = Panel::new(config).expect("panel");

        panel.refresh_state().await.expect("refresh");

        let tstat = panel.state().tstat().expect("tstat set");
        assert_eq!(tstat.mode, "cool");
        assert_eq!(tstat.zone(1).expect("zone 1").cool_setpoint, 68);
    }

    #[tokio::test]
    async fn submit_is_nonblocking_and_queued() {
        let panel = Panel::new(PanelConfig::default()).expect("panel");

        // No processor running; commands queue until the channel fills.
        panel
            .submit(PanelCommand::RefreshState)
            .expect("queued");
    }
}
