// ── Panel commands ──
//
// Commands are submitted fire-and-forget over an mpsc channel and
// turned into config writes by the command processor. Planning is a
// pure function over the last observed thermostat status so it can be
// tested without a daemon.

use infinitui_api::models::{FanMode, OperatingMode, TstatStatus, ZoneConfigUpdate};

use crate::error::CoreError;

/// Operating mode is thermostat-wide; the daemon only honors it on a
/// zone 1 write.
pub const MODE_ZONE: u8 = 1;

/// A user-initiated panel action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    /// Re-fetch the all-zones status over REST.
    RefreshState,
    /// Set the blower speed for one zone.
    SetFanSpeed { zone: u8, speed: FanMode },
    /// Set the system operating mode.
    SetMode { mode: OperatingMode },
    /// Engage or release the setpoint hold for one zone.
    SetHold { zone: u8, hold: bool },
    /// Nudge the cooling setpoint relative to its displayed value.
    IncCoolSetpoint { zone: u8, delta: i8 },
    /// Nudge the heating setpoint relative to its displayed value.
    IncHeatSetpoint { zone: u8, delta: i8 },
}

/// A planned `PUT /api/zone/{zone}/config` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPlan {
    pub zone: u8,
    pub update: ZoneConfigUpdate,
}

/// Translate a command into the config write it implies.
///
/// Setpoint increments are resolved against `tstat` here, so the wire
/// carries an absolute value. Commands that need zone state fail with
/// [`CoreError::NoStatusYet`] until the first status arrives.
pub fn plan_put(cmd: &PanelCommand, tstat: Option<&TstatStatus>) -> Result<RequestPlan, CoreError> {
    match *cmd {
        PanelCommand::RefreshState => Err(CoreError::Internal(
            "refresh is not a config write".into(),
        )),
        PanelCommand::SetFanSpeed { zone, speed } => Ok(RequestPlan {
            zone,
            update: ZoneConfigUpdate::fan_mode(speed),
        }),
        PanelCommand::SetMode { mode } => Ok(RequestPlan {
            zone: MODE_ZONE,
            update: ZoneConfigUpdate::mode(mode),
        }),
        PanelCommand::SetHold { zone, hold } => Ok(RequestPlan {
            zone,
            update: ZoneConfigUpdate::hold(hold),
        }),
        PanelCommand::IncCoolSetpoint { zone, delta } => {
            let current = zone_status(tstat, zone)?.cool_setpoint;
            Ok(RequestPlan {
                zone,
                update: ZoneConfigUpdate::cool_setpoint(current.saturating_add_signed(delta)),
            })
        }
        PanelCommand::IncHeatSetpoint { zone, delta } => {
            let current = zone_status(tstat, zone)?.heat_setpoint;
            Ok(RequestPlan {
                zone,
                update: ZoneConfigUpdate::heat_setpoint(current.saturating_add_signed(delta)),
            })
        }
    }
}

fn zone_status(
    tstat: Option<&TstatStatus>,
    zone: u8,
) -> Result<&infinitui_api::models::ZoneStatus, CoreError> {
    let status = tstat.ok_or(CoreError::NoStatusYet)?;
    status.zone(zone).ok_or(CoreError::ZoneNotFound { zone })
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn tstat_with_zone(cool: u8, heat: u8) -> TstatStatus {
        serde_json::from_value(serde_json::json!({
            "zones": [{
                "currentTemp": 71,
                "currentHumidity": 45,
                "fanMode": "auto",
                "heatSetpoint": heat,
                "coolSetpoint": cool
            }],
            "mode": "auto"
        }))
        .expect("valid tstat")
    }

    #[test]
    fn inc_cool_resolves_to_absolute_setpoint() {
        let tstat = tstat_with_zone(68, 62);
        let plan = plan_put(
            &PanelCommand::IncCoolSetpoint { zone: 1, delta: 2 },
            Some(&tstat),
        )
        .expect("planned");

        assert_eq!(plan.zone, 1);
        assert_eq!(plan.update, ZoneConfigUpdate::cool_setpoint(70));
    }

    #[test]
    fn dec_heat_resolves_to_absolute_setpoint() {
        let tstat = tstat_with_zone(74, 66);
        let plan = plan_put(
            &PanelCommand::IncHeatSetpoint { zone: 1, delta: -1 },
            Some(&tstat),
        )
        .expect("planned");

        assert_eq!(plan.update, ZoneConfigUpdate::heat_setpoint(65));
    }

    #[test]
    fn setpoint_math_saturates() {
        let tstat = tstat_with_zone(255, 0);

        let plan = plan_put(
            &PanelCommand::IncCoolSetpoint { zone: 1, delta: 1 },
            Some(&tstat),
        )
        .expect("planned");
        assert_eq!(plan.update, ZoneConfigUpdate::cool_setpoint(255));

        let plan = plan_put(
            &PanelCommand::IncHeatSetpoint { zone: 1, delta: -1 },
            Some(&tstat),
        )
        .expect("planned");
        assert_eq!(plan.update, ZoneConfigUpdate::heat_setpoint(0));
    }

    #[test]
    fn mode_always_writes_through_zone_one() {
        let plan = plan_put(
            &PanelCommand::SetMode {
                mode: OperatingMode::Cool,
            },
            None,
        )
        .expect("planned");

        assert_eq!(plan.zone, MODE_ZONE);
        assert_eq!(plan.update, ZoneConfigUpdate::mode(OperatingMode::Cool));
    }

    #[test]
    fn fan_and_hold_need_no_status() {
        let plan = plan_put(
            &PanelCommand::SetFanSpeed {
                zone: 3,
                speed: FanMode::High,
            },
            None,
        )
        .expect("planned");
        assert_eq!(plan.zone, 3);
        assert_eq!(plan.update, ZoneConfigUpdate::fan_mode(FanMode::High));

        let plan = plan_put(&PanelCommand::SetHold { zone: 2, hold: true }, None).expect("planned");
        assert_eq!(plan.zone, 2);
        assert_eq!(plan.update, ZoneConfigUpdate::hold(true));
    }

    #[test]
    fn setpoint_before_first_status_is_rejected() {
        let err = plan_put(&PanelCommand::IncCoolSetpoint { zone: 1, delta: 1 }, None)
            .expect_err("no status");
        assert!(matches!(err, CoreError::NoStatusYet));
    }

    #[test]
    fn setpoint_for_missing_zone_is_rejected() {
        let tstat = tstat_with_zone(70, 64);
        let err = plan_put(
            &PanelCommand::IncHeatSetpoint { zone: 4, delta: 1 },
            Some(&tstat),
        )
        .expect_err("zone 4 absent");
        assert!(matches!(err, CoreError::ZoneNotFound { zone: 4 }));
    }
}
