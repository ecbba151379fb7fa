//! Supervisor errors
//!
//! Only startup can fail. Once the supervisor is running, bad readings and
//! timing glitches are absorbed by the filters and hysteresis instead of
//! being reported.

use core::fmt;

/// Startup failures that stop the supervisor task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Error {
    /// The power monitor did not answer or reported a foreign manufacturer ID
    PowerSensorUnavailable,
    /// A bus transfer to the power monitor failed
    PowerSensorBus,
    /// The motor current-sense ADC channels could not be brought up
    CurrentSenseUnavailable,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PowerSensorUnavailable => f.write_str("power sensor not found"),
            Error::PowerSensorBus => f.write_str("power sensor bus error"),
            Error::CurrentSenseUnavailable => f.write_str("current-sense ADC unavailable"),
        }
    }
}

impl core::error::Error for Error {}
