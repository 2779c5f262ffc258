//! Data bridge — connects [`Panel`] reactive state to TUI actions.
//!
//! Runs as a background task: subscribes to the panel's state slots,
//! stream diagnostics, and connection state, forwarding every change as
//! an [`Action`] through the TUI's action channel.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use infinitui_core::Panel;

use crate::action::Action;

/// Spawn the data bridge connecting [`Panel`] reactive state to the TUI.
///
/// Connects the panel (starting its stream and background tasks), pushes
/// initial snapshots, then loops forwarding every slot change and stream
/// state transition as an [`Action`]. Shuts down cleanly on cancellation.
pub async fn spawn_data_bridge(
    panel: Panel,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    if let Err(e) = panel.connect().await {
        warn!(error = %e, "failed to connect panel");
        // The stream keeps retrying on its own; a failed initial REST
        // refresh is not fatal. Nothing to tear down here.
    }

    let state = panel.state().clone();
    let mut tstat = state.subscribe_tstat();
    let mut blower = state.subscribe_blower();
    let mut heatpump = state.subscribe_heatpump();
    let mut diagnostics = state.subscribe_diagnostics();
    let mut stream_state = panel.stream_state();

    // Push initial snapshots so the dashboard has data immediately
    if let Some(s) = state.tstat() {
        let _ = action_tx.send(Action::TstatUpdated(s));
    }
    if let Some(s) = state.blower() {
        let _ = action_tx.send(Action::BlowerUpdated(s));
    }
    if let Some(s) = state.heatpump() {
        let _ = action_tx.send(Action::HeatpumpUpdated(s));
    }
    let _ = action_tx.send(Action::StreamStateChanged(
        stream_state.borrow_and_update().clone(),
    ));

    // Stream loop — forward every change until cancelled
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Ok(()) = tstat.changed() => {
                if let Some(s) = tstat.borrow_and_update().clone() {
                    let _ = action_tx.send(Action::TstatUpdated(s));
                }
            }
            Ok(()) = blower.changed() => {
                if let Some(s) = blower.borrow_and_update().clone() {
                    let _ = action_tx.send(Action::BlowerUpdated(s));
                }
            }
            Ok(()) = heatpump.changed() => {
                if let Some(s) = heatpump.borrow_and_update().clone() {
                    let _ = action_tx.send(Action::HeatpumpUpdated(s));
                }
            }
            Ok(()) = diagnostics.changed() => {
                let d = diagnostics.borrow_and_update().clone();
                let _ = action_tx.send(Action::DiagnosticsUpdated(d));
            }
            Ok(()) = stream_state.changed() => {
                let s = stream_state.borrow_and_update().clone();
                let _ = action_tx.send(Action::StreamStateChanged(s));
            }
        }
    }

    panel.disconnect().await;
    debug!("data bridge shut down");
}
