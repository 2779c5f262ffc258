//! Wire types for the daemon's REST and stream payloads.
//!
//! Field names mirror the JSON the daemon emits. Every status record
//! carries a `#[serde(flatten)] extra` bucket so fields this client does
//! not model survive deserialization instead of being silently dropped.

use serde::{Deserialize, Serialize};

// ── Mode enums ───────────────────────────────────────────────────────

/// Blower fan speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanMode {
    Auto,
    Low,
    Med,
    High,
}

impl FanMode {
    /// Wire string for this fan mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Low => "low",
            Self::Med => "med",
            Self::High => "high",
        }
    }

    /// Parse a wire string as reported in zone status.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(Self::Auto),
            "low" => Some(Self::Low),
            "med" => Some(Self::Med),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Next speed in the auto → low → med → high cycle (wraps).
    pub fn next(self) -> Self {
        match self {
            Self::Auto => Self::Low,
            Self::Low => Self::Med,
            Self::Med => Self::High,
            Self::High => Self::Auto,
        }
    }
}

/// Thermostat operating mode.
///
/// `Electric` and `Heatpump` are reported by some systems but are not
/// accepted as write targets; only the first four can be sent back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    Off,
    Auto,
    Heat,
    Cool,
    Electric,
    Heatpump,
    Unknown,
}

impl OperatingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Auto => "auto",
            Self::Heat => "heat",
            Self::Cool => "cool",
            Self::Electric => "electric",
            Self::Heatpump => "heatpump",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a wire string; unrecognized strings map to `Unknown`.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "off" => Self::Off,
            "auto" => Self::Auto,
            "heat" => Self::Heat,
            "cool" => Self::Cool,
            "electric" => Self::Electric,
            "heatpump" => Self::Heatpump,
            _ => Self::Unknown,
        }
    }

    /// Whether the daemon accepts this mode in a config write.
    pub fn is_settable(self) -> bool {
        matches!(self, Self::Off | Self::Auto | Self::Heat | Self::Cool)
    }

    /// Next settable mode in the off → auto → heat → cool cycle.
    /// Read-only modes re-enter the cycle at `Off`.
    pub fn next_settable(self) -> Self {
        match self {
            Self::Off => Self::Auto,
            Self::Auto => Self::Heat,
            Self::Heat => Self::Cool,
            _ => Self::Off,
        }
    }
}

// ── Status records ───────────────────────────────────────────────────

/// Per-zone thermostat state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStatus {
    #[serde(default)]
    pub zone_number: u8,

    // The daemon sends sparse zone objects on partial updates, so
    // every field has to tolerate being absent.
    #[serde(default)]
    pub current_temp: u8,
    #[serde(default)]
    pub current_humidity: u8,

    #[serde(default)]
    pub target_humidity: u8,

    #[serde(default)]
    pub zone_name: String,

    #[serde(default)]
    pub fan_mode: String,

    #[serde(default)]
    pub hold: Option<bool>,

    #[serde(default)]
    pub preset: String,

    #[serde(default)]
    pub heat_setpoint: u8,
    #[serde(default)]
    pub cool_setpoint: u8,

    #[serde(default)]
    pub override_duration: String,

    #[serde(default)]
    pub override_duration_mins: u16,

    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Thermostat status for all zones, the `"tstat"` stream source and the
/// body of `GET /api/zone/0/config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TstatStatus {
    #[serde(default)]
    pub zones: Vec<ZoneStatus>,

    #[serde(default)]
    pub outdoor_temp: u8,

    #[serde(default)]
    pub mode: String,

    #[serde(default)]
    pub stage: u8,

    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub raw_mode: u8,

    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl TstatStatus {
    /// Status of a 1-based zone, if the daemon has reported it.
    pub fn zone(&self, zone: u8) -> Option<&ZoneStatus> {
        self.zones.get(usize::from(zone.checked_sub(1)?))
    }
}

/// Air-handler state, the `"blower"` stream source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlowerStatus {
    #[serde(rename = "blowerRPM", default)]
    pub blower_rpm: u16,

    #[serde(rename = "airFlowCFM", default)]
    pub air_flow_cfm: u16,

    #[serde(default)]
    pub static_pressure: f32,

    #[serde(default)]
    pub heat_stage: u8,

    #[serde(default)]
    pub elec_heat: bool,

    #[serde(default)]
    pub action: String,

    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Heat-pump state, the `"heatpump"` stream source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatpumpStatus {
    #[serde(default)]
    pub coil_temp: f32,

    #[serde(default)]
    pub outside_temp: f32,

    #[serde(default)]
    pub stage: u8,

    #[serde(flatten)]
    pub extra: serde_json::Value,
}

// ── Config writes ────────────────────────────────────────────────────

/// Partial update body for `PUT /api/zone/{zone}/config`.
///
/// Only the fields that are `Some` are serialized; the daemon applies
/// exactly the fields present in the body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_mode: Option<FanMode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<OperatingMode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat_setpoint: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cool_setpoint: Option<u8>,
}

impl ZoneConfigUpdate {
    pub fn fan_mode(speed: FanMode) -> Self {
        Self {
            fan_mode: Some(speed),
            ..Self::default()
        }
    }

    pub fn mode(mode: OperatingMode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }

    pub fn hold(hold: bool) -> Self {
        Self {
            hold: Some(hold),
            ..Self::default()
        }
    }

    pub fn heat_setpoint(temp: u8) -> Self {
        Self {
            heat_setpoint: Some(temp),
            ..Self::default()
        }
    }

    pub fn cool_setpoint(temp: u8) -> Self {
        Self {
            cool_setpoint: Some(temp),
            ..Self::default()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
