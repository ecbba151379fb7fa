//! System Events
//!
//! Notifications exchanged through the `Signal`s in [`Shared`](crate::system::state::Shared).
//! Senders never block; the indicator task polls with `try_take` once per tick.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// IMU calibration progress, shown on the indicator's second segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum CalibrationEvent {
    /// Calibration started
    Started,
    /// Calibration finished
    Done,
}

/// Requests to the indicator task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum IndicatorCommand {
    /// Blank both LEDs before a shutdown sequence
    Clear,
}

/// Publishes a calibration event, replacing any unread one
pub fn send_calibration(signal: &Signal<CriticalSectionRawMutex, CalibrationEvent>, event: CalibrationEvent) {
    signal.signal(event);
}

/// Takes the pending calibration event, if any, without waiting
pub fn poll_calibration(signal: &Signal<CriticalSectionRawMutex, CalibrationEvent>) -> Option<CalibrationEvent> {
    signal.try_take()
}
