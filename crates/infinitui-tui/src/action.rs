//! All possible UI actions. Actions are the sole mechanism for state
//! mutation.

use std::sync::Arc;

use infinitui_core::{BlowerStatus, HeatpumpStatus, StreamDiagnostics, StreamState, TstatStatus};

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ───────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Zone selection ──────────────────────────────────────────────
    SelectZone(u8),

    // ── Setpoint / config commands ──────────────────────────────────
    IncCool(i8),
    IncHeat(i8),
    CycleFan,
    CycleMode,
    ToggleHold,
    Refresh,

    // ── Data events (from the panel's reactive state) ───────────────
    TstatUpdated(Arc<TstatStatus>),
    BlowerUpdated(Arc<BlowerStatus>),
    HeatpumpUpdated(Arc<HeatpumpStatus>),
    DiagnosticsUpdated(StreamDiagnostics),
    StreamStateChanged(StreamState),

    // ── Help ────────────────────────────────────────────────────────
    ToggleHelp,
}
