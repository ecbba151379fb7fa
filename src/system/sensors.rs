//! Sensor capabilities
//!
//! The supervisor never touches a bus or ADC directly. It reads through:
//! - [`PowerSensor`]: bus current, bus voltage and power from the pack monitor
//! - [`CurrentSenseAdc`]: raw codes of the two motor current-sense amplifiers
//! - [`WheelRpmFeed`]: latest wheel speeds published by the drive subsystem

use core::sync::atomic::{AtomicI32, Ordering};

use crate::system::config::{
    ADC_FULL_SCALE, ADC_REFERENCE_VOLTAGE, CURRENT_SENSE_GAIN, CURRENT_SENSE_SHUNT,
};
use crate::Error;

/// Pack power monitor
///
/// Reads never fail from the caller's point of view: an implementation that
/// loses the bus returns its last good value.
pub trait PowerSensor {
    /// Probes and configures the device
    async fn init(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Bus current (A)
    async fn current(&mut self) -> f32;

    /// Bus voltage (V)
    async fn bus_voltage(&mut self) -> f32;

    /// Bus power (W)
    async fn power(&mut self) -> f32;
}

/// Motor side of a current-sense channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum MotorSide {
    Left,
    Right,
}

impl MotorSide {
    pub const BOTH: [MotorSide; 2] = [MotorSide::Left, MotorSide::Right];

    /// Index into `[left, right]` arrays
    pub const fn index(self) -> usize {
        match self {
            MotorSide::Left => 0,
            MotorSide::Right => 1,
        }
    }
}

/// Two-channel ADC wired to the motor current-sense amplifiers
pub trait CurrentSenseAdc {
    /// Enables both channels
    async fn enable(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// One raw 12-bit sample
    async fn read(&mut self, side: MotorSide) -> u16;
}

/// Motor current (A) from an averaged ADC code and the channel's zero offset
///
/// The amplifier output is centered on half the reference voltage, so
/// current can be negative when the motor regenerates.
pub fn motor_current(adc_counts: f32, offset: u16) -> f32 {
    let volts = (adc_counts - offset as f32) / ADC_FULL_SCALE * ADC_REFERENCE_VOLTAGE;
    (volts - ADC_REFERENCE_VOLTAGE / 2.0) / (CURRENT_SENSE_GAIN * CURRENT_SENSE_SHUNT)
}

/// Latest left/right wheel RPM, written by the drive subsystem
///
/// Single-word stores, so the writer may run in any context.
pub struct WheelRpmFeed {
    left: AtomicI32,
    right: AtomicI32,
}

impl WheelRpmFeed {
    pub const fn new() -> Self {
        Self {
            left: AtomicI32::new(0),
            right: AtomicI32::new(0),
        }
    }

    /// Publishes the latest measured speeds
    pub fn publish(&self, left: i32, right: i32) {
        self.left.store(left, Ordering::Relaxed);
        self.right.store(right, Ordering::Relaxed);
    }

    /// Latest speeds, left then right
    pub fn latest(&self) -> (i32, i32) {
        (self.left.load(Ordering::Relaxed), self.right.load(Ordering::Relaxed))
    }
}

impl Default for WheelRpmFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Spreads the filtered left/right speeds over four wheels
///
/// Result order: front-left, front-right, back-left, back-right.
pub fn fan_out_rpm(left: f32, right: f32, coefficients: &[f32; 4]) -> [f32; 4] {
    [
        left * coefficients[0],
        right * coefficients[1],
        left * coefficients[2],
        right * coefficients[3],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn mid_scale_is_zero_current() {
        // half of 4095 counts above the offset sits on the 1.65 V midpoint
        assert!(close(motor_current(2047.5 + 114.0, 114), 0.0));
    }

    #[test]
    fn current_scales_with_gain_and_shunt() {
        // +0.75 V above midpoint over 50 * 15 mOhm is 1 A
        let counts = (1.65 + 0.75) / 3.3 * 4095.0;
        assert!(close(motor_current(counts, 0), 1.0));
        let counts = (1.65 - 0.75) / 3.3 * 4095.0;
        assert!(close(motor_current(counts, 0), -1.0));
    }

    #[test]
    fn rpm_feed_keeps_latest() {
        let feed = WheelRpmFeed::new();
        assert_eq!(feed.latest(), (0, 0));
        feed.publish(120, -80);
        feed.publish(130, -75);
        assert_eq!(feed.latest(), (130, -75));
    }

    #[test]
    fn fan_out_order() {
        let wheels = fan_out_rpm(10.0, 20.0, &[1.0, 2.0, 3.0, -1.0]);
        assert_eq!(wheels, [10.0, 40.0, 30.0, -20.0]);
    }

    #[test]
    fn side_indices() {
        assert_eq!(MotorSide::BOTH.map(MotorSide::index), [0, 1]);
    }
}
