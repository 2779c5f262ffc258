// infinitui-api: Async Rust client for the infinitive HVAC daemon

pub mod client;
pub mod error;
pub mod models;
pub mod stream;
pub mod transport;

pub use client::PanelClient;
pub use error::Error;
pub use models::{
    BlowerStatus, FanMode, HeatpumpStatus, OperatingMode, TstatStatus, ZoneConfigUpdate,
    ZoneStatus,
};
pub use stream::{ReconnectConfig, StatusMessage, StreamEvent, StreamHandle, StreamState};
