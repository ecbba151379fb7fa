//! Supervisor configuration
//!
//! Compile-time constants for every threshold, window and timing used by the
//! power board, plus [`SupervisorConfig`] for the values that differ from one
//! robot to the next (sensor offsets, wheel coefficients).
//!
//! Threshold groups carry `const` assertions so a mis-ordered edit fails the
//! build instead of producing a supervisor that oscillates.

// =============================================================================
// Timing
// =============================================================================

/// Supervisor loop period (ms)
pub const TICK_PERIOD_MS: u32 = 100;

/// Button hold time that counts as a long press (ms)
pub const LONG_PRESS_THRESHOLD_MS: u32 = 2000;

/// Time between the physical press that powers the board and the first poll
/// after boot (ms). The edge interrupt cannot see that part of the press.
pub const STARTUP_COMPENSATION_MS: u32 = 800;

/// Supervisor iterations before the voltage rate limiter engages (~5 s)
pub const WARM_UP_TICKS: u8 = 50;

const _: () = assert!(STARTUP_COMPENSATION_MS < LONG_PRESS_THRESHOLD_MS);

// =============================================================================
// Voltage thresholds
// =============================================================================

/// At or below this bus voltage the board refuses to run (V)
pub const LOW_VOLTAGE_CUTOFF: f32 = 9.30;

/// At or above this bus voltage a charging pack counts as full (V)
pub const FULL_CHARGE_VOLTAGE: f32 = 12.15;

/// Readings outside this window are dropped from the voltage filter (V)
pub const VOLTAGE_VALID_MIN: f32 = 4.0;
pub const VOLTAGE_VALID_MAX: f32 = 13.0;

/// Largest accepted change between two voltage samples once warmed up (V)
pub const VOLTAGE_RATE_LIMIT: f32 = 0.6;

/// Lower edge of each battery band, from empty to full (V)
pub const BATTERY_EMPTY_VOLTAGE: f32 = 9.60;
pub const BATTERY_LOW_BAND_VOLTAGE: f32 = 10.65;
pub const BATTERY_HIGH_BAND_VOLTAGE: f32 = 11.55;
pub const BATTERY_FULL_VOLTAGE: f32 = FULL_CHARGE_VOLTAGE;

const _: () = assert!(VOLTAGE_VALID_MIN < LOW_VOLTAGE_CUTOFF);
const _: () = assert!(LOW_VOLTAGE_CUTOFF < BATTERY_EMPTY_VOLTAGE);
const _: () = assert!(BATTERY_EMPTY_VOLTAGE < BATTERY_LOW_BAND_VOLTAGE);
const _: () = assert!(BATTERY_LOW_BAND_VOLTAGE < BATTERY_HIGH_BAND_VOLTAGE);
const _: () = assert!(BATTERY_HIGH_BAND_VOLTAGE < BATTERY_FULL_VOLTAGE);
const _: () = assert!(BATTERY_FULL_VOLTAGE < VOLTAGE_VALID_MAX);

// =============================================================================
// Battery status hysteresis
// =============================================================================

/// Running drops to Warning at or below this charge (%)
pub const WARNING_ENTER_PERCENT: u8 = 10;

/// Warning returns to Running only above this charge (%)
pub const WARNING_EXIT_PERCENT: u8 = 13;

const _: () = assert!(WARNING_ENTER_PERCENT < WARNING_EXIT_PERCENT);

// =============================================================================
// Indicator battery tiers
// =============================================================================

/// Green falls to Yellow below this charge (%)
pub const TIER_GREEN_EXIT_BELOW: u8 = 60;
/// Yellow climbs back to Green above this charge (%)
pub const TIER_GREEN_ENTER_ABOVE: u8 = 73;
/// Yellow falls to Red below this charge (%)
pub const TIER_RED_ENTER_BELOW: u8 = 20;
/// Red climbs back to Yellow above this charge (%)
pub const TIER_RED_EXIT_ABOVE: u8 = 33;

const _: () = assert!(TIER_RED_ENTER_BELOW < TIER_RED_EXIT_ABOVE);
const _: () = assert!(TIER_RED_EXIT_ABOVE < TIER_GREEN_EXIT_BELOW);
const _: () = assert!(TIER_GREEN_EXIT_BELOW < TIER_GREEN_ENTER_ABOVE);

// =============================================================================
// Indicator cadence
// =============================================================================

/// Nominal on-time of one indicator cycle (ms)
pub const INDICATOR_ON_TIME_MS: u32 = 500;

/// Fast blink phases last this fraction of the nominal on-time
pub const FAST_BLINK_NUMERATOR: u32 = 3;
pub const FAST_BLINK_DENOMINATOR: u32 = 10;

/// Self-test: on-time per color and the off-phase as a fraction of it
pub const SELF_TEST_ON_TIME_MS: u32 = 200;
pub const SELF_TEST_OFF_NUMERATOR: u32 = 1;
pub const SELF_TEST_OFF_DENOMINATOR: u32 = 2;

const _: () = assert!(FAST_BLINK_NUMERATOR < FAST_BLINK_DENOMINATOR);

// =============================================================================
// Filter windows
// =============================================================================

/// Sliding window for bus voltage, bus current and power
pub const VOLTAGE_WINDOW: usize = 10;
pub const CURRENT_WINDOW: usize = 10;
pub const POWER_WINDOW: usize = 10;

/// Sliding window for the motor current-sense channels
pub const MOTOR_CURRENT_WINDOW: usize = 20;

/// Sliding window for wheel RPM
pub const WHEEL_RPM_WINDOW: usize = 10;

/// ADC samples per channel per tick, reduced with a median
pub const ADC_BURST_SAMPLES: usize = 100;

// =============================================================================
// Motor current-sense front end
// =============================================================================

/// Full-scale code of the 12-bit ADC
pub const ADC_FULL_SCALE: f32 = 4095.0;

/// ADC reference voltage (V)
pub const ADC_REFERENCE_VOLTAGE: f32 = 3.3;

/// Current-sense amplifier gain
pub const CURRENT_SENSE_GAIN: f32 = 50.0;

/// Shunt resistance (Ohm)
pub const CURRENT_SENSE_SHUNT: f32 = 0.015;

/// Zero-current offset of each channel (ADC counts)
pub const LEFT_CURRENT_OFFSET: u16 = 114;
pub const RIGHT_CURRENT_OFFSET: u16 = 119;

/// Runtime configuration handed to the supervisor
///
/// Defaults come from the constants above. Per-robot calibration (current
/// offsets, wheel coefficients) is expected to override individual fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupervisorConfig {
    /// Low-voltage cutoff (V)
    pub low_voltage: f32,
    /// Full-charge voltage (V)
    pub full_charge_voltage: f32,
    /// Maximum accepted voltage step once warmed up (V)
    pub voltage_rate_limit: f32,
    /// Ticks before the rate limiter engages
    pub warm_up_ticks: u8,
    /// Zero-current ADC offsets, left then right (counts)
    pub current_offsets: [u16; 2],
    /// RPM coefficients: front-left, front-right, back-left, back-right
    pub wheel_coefficients: [f32; 4],
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            low_voltage: LOW_VOLTAGE_CUTOFF,
            full_charge_voltage: FULL_CHARGE_VOLTAGE,
            voltage_rate_limit: VOLTAGE_RATE_LIMIT,
            warm_up_ticks: WARM_UP_TICKS,
            current_offsets: [LEFT_CURRENT_OFFSET, RIGHT_CURRENT_OFFSET],
            wheel_coefficients: [1.0; 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_constants() {
        let config = SupervisorConfig::default();
        assert_eq!(config.low_voltage, LOW_VOLTAGE_CUTOFF);
        assert_eq!(config.warm_up_ticks, WARM_UP_TICKS);
        assert_eq!(config.current_offsets, [LEFT_CURRENT_OFFSET, RIGHT_CURRENT_OFFSET]);
    }

    #[test]
    fn fields_override_individually() {
        let config = SupervisorConfig {
            wheel_coefficients: [1.0, -1.0, 1.0, -1.0],
            ..SupervisorConfig::default()
        };
        assert_eq!(config.wheel_coefficients[1], -1.0);
        assert_eq!(config.full_charge_voltage, FULL_CHARGE_VOLTAGE);
    }
}
