//! Battery level and charge state
//!
//! Maps the filtered bus voltage to a charge percentage and decides, once per
//! supervisor tick, the system status and which rails should be up.
//!
//! # Percentage curve
//! Piecewise linear over the 3S pack's discharge curve, truncated to whole
//! percent:
//! ```text
//! >= 12.15 V            100 %
//! 11.55 V .. 12.15 V    70 % .. 100 %
//! 10.65 V .. 11.55 V    30 % .. 70 %
//!  9.60 V .. 10.65 V     0 % .. 30 %
//!  < 9.60 V               0 %
//! ```
//!
//! # Status rules
//! - Charger present: `Charged` at full voltage, `Charging` below. A robot
//!   that is off boots its main rail (head output stays off).
//! - No charger, voltage at or below the cutoff: `Shutdown`, whatever the
//!   user asked for.
//! - No charger, powered: `Running`, or `Warning` with a 10 % / 13 % band.
//! - No charger, off: rails held down.

use crate::system::config::{
    BATTERY_EMPTY_VOLTAGE, BATTERY_FULL_VOLTAGE, BATTERY_HIGH_BAND_VOLTAGE, BATTERY_LOW_BAND_VOLTAGE,
    SupervisorConfig, WARNING_ENTER_PERCENT, WARNING_EXIT_PERCENT,
};
use crate::system::power::PowerAction;
use crate::system::state::{RobotState, SystemStatus};

/// Charge percentage (0-100) for a bus voltage
pub fn battery_percentage(voltage: f32) -> u8 {
    let scaled = |low: f32, high: f32, range: f32| ((voltage - low) / (high - low) * range) as u8;

    let percent = if voltage >= BATTERY_FULL_VOLTAGE {
        100
    } else if voltage >= BATTERY_HIGH_BAND_VOLTAGE {
        70 + scaled(BATTERY_HIGH_BAND_VOLTAGE, BATTERY_FULL_VOLTAGE, 30.0)
    } else if voltage >= BATTERY_LOW_BAND_VOLTAGE {
        30 + scaled(BATTERY_LOW_BAND_VOLTAGE, BATTERY_HIGH_BAND_VOLTAGE, 40.0)
    } else if voltage >= BATTERY_EMPTY_VOLTAGE {
        scaled(BATTERY_EMPTY_VOLTAGE, BATTERY_LOW_BAND_VOLTAGE, 30.0)
    } else {
        0
    };
    percent.min(100)
}

/// Running/Warning with hysteresis, for a powered robot on battery
fn battery_status(current: SystemStatus, percent: u8) -> SystemStatus {
    let threshold = if current == SystemStatus::Warning {
        WARNING_EXIT_PERCENT
    } else {
        WARNING_ENTER_PERCENT
    };
    if percent <= threshold {
        SystemStatus::Warning
    } else {
        SystemStatus::Running
    }
}

/// Updates status and power intent for this tick and returns the rail change
///
/// Expects `state.voltage` and `state.battery_percent` to hold this tick's
/// filtered values.
pub fn evaluate_charge(state: &mut RobotState, charging: bool, config: &SupervisorConfig) -> PowerAction {
    let previous = state.system_status;
    let low_voltage = state.voltage <= config.low_voltage;
    state.charger_connected = charging;

    let action = if charging {
        if !state.power_on && low_voltage {
            state.system_status = SystemStatus::Shutdown;
            PowerAction::Shutdown
        } else {
            state.system_status = if state.voltage >= config.full_charge_voltage {
                SystemStatus::Charged
            } else {
                SystemStatus::Charging
            };
            if state.power_on {
                PowerAction::Hold
            } else {
                PowerAction::ChargeBoot
            }
        }
    } else if low_voltage {
        if state.power_on || previous != SystemStatus::Shutdown {
            error!("low voltage shutdown at {=f32} V", state.voltage);
        }
        state.power_on = false;
        state.system_status = SystemStatus::Shutdown;
        PowerAction::Shutdown
    } else if state.power_on {
        state.system_status = battery_status(previous, state.battery_percent);
        PowerAction::Hold
    } else {
        // charger pulled while off
        if matches!(previous, SystemStatus::Charging | SystemStatus::Charged) {
            state.system_status = SystemStatus::Shutdown;
        }
        PowerAction::IdleOff
    };

    if state.system_status != previous {
        info!("status {} -> {}", previous, state.system_status);
        if action == PowerAction::ChargeBoot {
            info!("charger connected while off, booting main rail");
        }
    }
    action
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_at(voltage: f32, power_on: bool, status: SystemStatus) -> RobotState {
        let mut state = RobotState::new();
        state.voltage = voltage;
        state.battery_percent = battery_percentage(voltage);
        state.power_on = power_on;
        state.system_status = status;
        state
    }

    #[test]
    fn band_edges_are_exact() {
        assert_eq!(battery_percentage(12.15), 100);
        assert_eq!(battery_percentage(11.55), 70);
        assert_eq!(battery_percentage(10.65), 30);
        assert_eq!(battery_percentage(9.60), 0);
    }

    #[test]
    fn saturates_outside_the_curve() {
        assert_eq!(battery_percentage(13.0), 100);
        assert_eq!(battery_percentage(9.0), 0);
        assert_eq!(battery_percentage(0.0), 0);
        assert_eq!(battery_percentage(-1.0), 0);
    }

    #[test]
    fn mid_band_truncates() {
        // 11.85 V is halfway through the top band: 70 + 15
        assert_eq!(battery_percentage(11.85), 85);
        // 11.1 V is halfway through the middle band: 30 + 20
        assert_eq!(battery_percentage(11.10), 50);
    }

    #[test]
    fn curve_is_monotonic() {
        let mut previous = 0;
        let mut millivolts = 9_000;
        while millivolts <= 12_500 {
            let percent = battery_percentage(millivolts as f32 / 1000.0);
            assert!(percent >= previous, "drop at {} mV", millivolts);
            assert!(percent <= 100);
            previous = percent;
            millivolts += 1;
        }
    }

    #[test]
    fn warning_band_has_hysteresis() {
        assert_eq!(battery_status(SystemStatus::Running, 11), SystemStatus::Running);
        assert_eq!(battery_status(SystemStatus::Running, 10), SystemStatus::Warning);
        assert_eq!(battery_status(SystemStatus::Warning, 12), SystemStatus::Warning);
        assert_eq!(battery_status(SystemStatus::Warning, 13), SystemStatus::Warning);
        assert_eq!(battery_status(SystemStatus::Warning, 14), SystemStatus::Running);
    }

    #[test]
    fn powered_on_battery_runs() {
        let config = SupervisorConfig::default();
        let mut state = state_at(11.6, true, SystemStatus::Running);
        assert_eq!(evaluate_charge(&mut state, false, &config), PowerAction::Hold);
        assert_eq!(state.system_status, SystemStatus::Running);
        assert!(state.power_on);
    }

    #[test]
    fn powered_on_low_battery_warns() {
        let config = SupervisorConfig::default();
        // 9.8 V is 5 %
        let mut state = state_at(9.8, true, SystemStatus::Running);
        assert_eq!(evaluate_charge(&mut state, false, &config), PowerAction::Hold);
        assert_eq!(state.system_status, SystemStatus::Warning);
    }

    #[test]
    fn charging_while_off_boots_main_rail_only() {
        let config = SupervisorConfig::default();
        let mut state = state_at(11.0, false, SystemStatus::Initial);
        assert_eq!(evaluate_charge(&mut state, true, &config), PowerAction::ChargeBoot);
        assert_eq!(state.system_status, SystemStatus::Charging);
        assert!(state.charger_connected);
        assert!(!state.power_on);
        assert_eq!(PowerAction::ChargeBoot.target().map(|r| r.output), Some(false));
    }

    #[test]
    fn full_pack_reports_charged() {
        let config = SupervisorConfig::default();
        let mut state = state_at(12.15, false, SystemStatus::Charging);
        assert_eq!(evaluate_charge(&mut state, true, &config), PowerAction::ChargeBoot);
        assert_eq!(state.system_status, SystemStatus::Charged);

        let mut state = state_at(12.2, true, SystemStatus::Running);
        assert_eq!(evaluate_charge(&mut state, true, &config), PowerAction::Hold);
        assert_eq!(state.system_status, SystemStatus::Charged);
    }

    #[test]
    fn low_voltage_overrides_user_power() {
        let config = SupervisorConfig::default();
        let mut state = state_at(9.30, true, SystemStatus::Running);
        assert_eq!(evaluate_charge(&mut state, false, &config), PowerAction::Shutdown);
        assert_eq!(state.system_status, SystemStatus::Shutdown);
        assert!(!state.power_on);
    }

    #[test]
    fn low_voltage_blocks_charge_boot() {
        let config = SupervisorConfig::default();
        let mut state = state_at(9.1, false, SystemStatus::Initial);
        assert_eq!(evaluate_charge(&mut state, true, &config), PowerAction::Shutdown);
        assert_eq!(state.system_status, SystemStatus::Shutdown);
        assert!(!state.power_on);
    }

    #[test]
    fn off_without_charger_holds_rails_down() {
        let config = SupervisorConfig::default();
        let mut state = state_at(11.0, false, SystemStatus::Initial);
        assert_eq!(evaluate_charge(&mut state, false, &config), PowerAction::IdleOff);
        assert_eq!(state.system_status, SystemStatus::Initial);

        // unplugging after a charge boot leaves the charging status behind
        let mut state = state_at(11.0, false, SystemStatus::Charging);
        assert_eq!(evaluate_charge(&mut state, false, &config), PowerAction::IdleOff);
        assert_eq!(state.system_status, SystemStatus::Shutdown);
        assert!(!state.charger_connected);
    }
}
