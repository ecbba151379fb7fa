//! Power button long-press detection
//!
//! Three contexts touch the button:
//! - **Edge path** ([`ButtonTimerState::on_edge`]): runs on every level change,
//!   records press/release timestamps and starts/stops the countdown timer.
//! - **Timer path** ([`ButtonTimerState::on_timeout`]): runs when the countdown
//!   expires. If the button is still held it marks the long press as confirmed
//!   by stamping the release time with "now".
//! - **Polling path** ([`ButtonTimerState::poll`]): runs once per supervisor
//!   tick and turns a confirmed long press into a [`PowerRequest`].
//!
//! The edge and timer paths only store single words, so they never block.
//! A release stamp older than the press stamp means "still held, not
//! confirmed". A half-updated pair therefore always reads as "still held".
//! Stamps are compared with wrapping arithmetic, so a press that spans the
//! `u32` millisecond wrap (about 49.7 days) still counts.
//!
//! # Boot
//!
//! The press that connects the battery happens before firmware runs, so no
//! edge is ever seen for it. The polling path notices the held pin while the
//! robot is off, fakes the press start and arms the timer with a shortened
//! threshold ([`STARTUP_COMPENSATION_MS`] less) to account for the boot time.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::system::config::{LONG_PRESS_THRESHOLD_MS, STARTUP_COMPENSATION_MS};
use crate::system::state::{RobotState, SystemStatus};

/// One-shot countdown used to confirm a long press
///
/// Methods take `&self` so the edge path can drive the timer without a lock.
pub trait CountdownTimer {
    /// Starts (or restarts) the countdown with the current duration
    fn start(&self);
    /// Cancels a running countdown
    fn stop(&self);
    /// Sets the duration used by the next `start`
    fn set_duration(&self, duration_ms: u32);
}

/// Observable button phase, derived from the stored timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum ButtonPhase {
    /// No press seen since boot
    Idle,
    /// Held, threshold not reached yet
    PressedWaitingThreshold,
    /// Held past the threshold, not yet acted on
    PressedConfirmedLongPress,
    /// Let go
    Released,
}

/// Power change requested by a long press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum PowerRequest {
    PowerOn,
    PowerOff,
}

/// Timestamps shared between the edge, timer and polling paths
///
/// Timestamps are millisecond ticks. 0 means "not set", so recorded ticks
/// are clamped to at least 1.
pub struct ButtonTimerState {
    press_start: AtomicU32,
    press_released: AtomicU32,
    pressed: AtomicBool,
    /// The confirmed long press of the current hold was turned into a request
    handled: AtomicBool,
    /// Last level seen on the pin, `true` = held
    pin_pressed: AtomicBool,
    long_press_ms: u32,
    startup_compensation_ms: u32,
}

impl ButtonTimerState {
    /// Button with the default thresholds
    pub const fn new() -> Self {
        Self::with_thresholds(LONG_PRESS_THRESHOLD_MS, STARTUP_COMPENSATION_MS)
    }

    /// Button with custom thresholds (ms)
    pub const fn with_thresholds(long_press_ms: u32, startup_compensation_ms: u32) -> Self {
        Self {
            press_start: AtomicU32::new(0),
            press_released: AtomicU32::new(0),
            pressed: AtomicBool::new(false),
            handled: AtomicBool::new(false),
            pin_pressed: AtomicBool::new(false),
            long_press_ms,
            startup_compensation_ms,
        }
    }

    /// Full long-press threshold, used for power-off and timer re-arming (ms)
    pub const fn long_press_ms(&self) -> u32 {
        self.long_press_ms
    }

    /// Power-on threshold, shortened by the boot time the edge path missed (ms)
    pub const fn power_on_threshold_ms(&self) -> u32 {
        self.long_press_ms.saturating_sub(self.startup_compensation_ms)
    }

    /// Records the pin level without treating it as an edge
    ///
    /// Called once at startup, before the edge path is live.
    pub fn sample_level(&self, pin_pressed: bool) {
        self.pin_pressed.store(pin_pressed, Ordering::Release);
    }

    /// Last recorded pin level, `true` = held
    pub fn pin_pressed(&self) -> bool {
        self.pin_pressed.load(Ordering::Acquire)
    }

    /// Edge path: the pin changed level
    pub fn on_edge(&self, pin_pressed: bool, now_ms: u32, timer: &impl CountdownTimer) {
        self.pin_pressed.store(pin_pressed, Ordering::Release);
        let pressed = self.pressed.load(Ordering::Acquire);

        if pin_pressed && !pressed {
            self.begin_press(now_ms);
            timer.start();
        } else if !pin_pressed && pressed {
            self.press_released.store(now_ms.max(1), Ordering::Release);
            self.pressed.store(false, Ordering::Release);
            // too short for a long press, the countdown must not fire later
            timer.stop();
        }
    }

    /// Timer path: the countdown expired
    pub fn on_timeout(&self, pin_pressed: bool, now_ms: u32, timer: &impl CountdownTimer) {
        if pin_pressed {
            self.pressed.store(true, Ordering::Release);
            self.press_released.store(now_ms.max(1), Ordering::Release);
        }
        // a boot press may have armed the shortened threshold
        timer.set_duration(self.long_press_ms);
    }

    /// Polling path: turns a confirmed long press into a power request
    ///
    /// A confirmed press is handled once, so holding on does not repeat the request.
    pub fn poll(&self, power_on: bool, now_ms: u32, timer: &impl CountdownTimer) -> Option<PowerRequest> {
        if self.pressed.load(Ordering::Acquire) {
            if self.handled.load(Ordering::Acquire) {
                return None;
            }
            let duration = self.confirmed_hold_ms()?;

            let request = if !power_on && duration >= self.power_on_threshold_ms() {
                PowerRequest::PowerOn
            } else if power_on && duration >= self.long_press_ms {
                PowerRequest::PowerOff
            } else {
                return None;
            };
            self.handled.store(true, Ordering::Release);
            Some(request)
        } else {
            if self.pin_pressed() && !power_on {
                debug!("button held at boot, arming shortened long-press timer");
                self.begin_press(now_ms);
                timer.set_duration(self.power_on_threshold_ms());
                timer.start();
            }
            None
        }
    }

    /// Current phase, for logging and inspection
    ///
    /// A handled long press keeps reporting `PressedConfirmedLongPress` until
    /// the button is let go.
    pub fn phase(&self) -> ButtonPhase {
        let pressed = self.pressed.load(Ordering::Acquire);
        let start = self.press_start.load(Ordering::Acquire);

        match (pressed, self.confirmed_hold_ms().is_some()) {
            (true, false) => ButtonPhase::PressedWaitingThreshold,
            (true, true) => ButtonPhase::PressedConfirmedLongPress,
            (false, _) if start == 0 => ButtonPhase::Idle,
            (false, _) => ButtonPhase::Released,
        }
    }

    /// Starts a new hold at `now_ms`
    ///
    /// The release stamp is cleared before the start stamp moves, so a reader
    /// in between still sees an unconfirmed press.
    fn begin_press(&self, now_ms: u32) {
        self.press_released.store(0, Ordering::Release);
        self.handled.store(false, Ordering::Release);
        self.press_start.store(now_ms.max(1), Ordering::Release);
        self.pressed.store(true, Ordering::Release);
    }

    /// Hold length confirmed by the timer path, `None` while still waiting
    ///
    /// A release stamp behind the start stamp wraps to more than half the
    /// `u32` range and reads as "not confirmed".
    fn confirmed_hold_ms(&self) -> Option<u32> {
        let start = self.press_start.load(Ordering::Acquire);
        let released = self.press_released.load(Ordering::Acquire);
        if released == 0 {
            return None;
        }
        let duration = released.wrapping_sub(start);
        if duration == 0 || duration > i32::MAX as u32 {
            return None;
        }
        Some(duration)
    }
}

impl Default for ButtonTimerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a power request after the low-voltage guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum PowerTransition {
    /// Robot switched on
    PoweredOn,
    /// Robot switched off on request
    PoweredOff,
    /// Power-on refused, battery at or below the cutoff
    LowVoltageShutdown,
}

/// Applies a power request to the state, guarding power-on against a flat battery
pub fn apply_power_request(state: &mut RobotState, request: PowerRequest, low_voltage: f32) -> PowerTransition {
    match request {
        PowerRequest::PowerOn if state.voltage <= low_voltage => {
            error!("power on refused, battery at {=f32} V", state.voltage);
            state.power_on = false;
            state.system_status = SystemStatus::Shutdown;
            PowerTransition::LowVoltageShutdown
        }
        PowerRequest::PowerOn => {
            info!("PWR ON");
            state.power_on = true;
            state.system_status = SystemStatus::Running;
            PowerTransition::PoweredOn
        }
        PowerRequest::PowerOff => {
            info!("PWR OFF");
            state.power_on = false;
            state.system_status = SystemStatus::Shutdown;
            PowerTransition::PoweredOff
        }
    }
}
