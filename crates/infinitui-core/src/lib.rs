// infinitui-core: Reactive view-model layer between infinitui-api and the TUI.

pub mod command;
pub mod config;
pub mod error;
pub mod panel;
pub mod state;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::PanelCommand;
pub use config::PanelConfig;
pub use error::CoreError;
pub use panel::Panel;
pub use state::{PanelState, StreamDiagnostics};

// Re-export the wire types consumers render.
pub use infinitui_api::models::{
    BlowerStatus, FanMode, HeatpumpStatus, OperatingMode, TstatStatus, ZoneConfigUpdate,
    ZoneStatus,
};
pub use infinitui_api::stream::{ReconnectConfig, StreamState};
