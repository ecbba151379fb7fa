//! Robot State Management
//!
//! Holds the robot's published power and telemetry state:
//! - Power intent (user asked for on/off) and the rails actually energized
//! - System status (running, warning, charging, charged, shutdown)
//! - Filtered bus voltage, current, power and battery percentage
//! - Wheel RPM and motor currents for telemetry consumers
//! - Lamp level and network status, written by the rest of the platform
//!
//! The state lives inside [`Shared`], one instance per firmware image, handed
//! to every task by reference. The supervisor task is the only writer of the
//! telemetry fields. Other readers should take the same lock when they need
//! fields that belong to one sampling instant.
//!
//! # State Access Pattern
//! ```text
//! let mut state = shared.state.lock().await;
//! // Read or modify state here
//! // Lock automatically released when state goes out of scope
//! ```

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex, signal::Signal};

use crate::system::button::ButtonTimerState;
use crate::system::event::{CalibrationEvent, IndicatorCommand};
use crate::system::sensors::WheelRpmFeed;

/// Discrete system status derived from power intent, charger and battery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum SystemStatus {
    /// Nothing decided yet (boot)
    Initial,
    /// Powered and battery above the warning level
    Running,
    /// Powered and battery low
    Warning,
    /// External power present, pack below full
    Charging,
    /// External power present, pack full
    Charged,
    /// Switched off, by the user or by the low-voltage guard
    Shutdown,
}

/// Cellular/network link state, reported by the communication subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum NetworkStatus {
    /// No report yet
    Unknown,
    /// Modem reports no SIM card
    NoSim,
    /// Registered modem, link not up yet
    Connecting,
    /// Link up
    Connected,
    /// Firmware update in progress
    OtaInProgress,
}

/// Headlamp request from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum LampLevel {
    /// Lamp under automatic control elsewhere, the power board keeps it dark
    Auto,
    /// Explicit brightness, 0 is off
    Level(u8),
}

impl LampLevel {
    /// Raw wire value used by the platform for "automatic"
    pub const AUTO_SENTINEL: u8 = 0xFF;

    /// Decodes the platform's raw lamp byte
    pub const fn from_raw(raw: u8) -> Self {
        if raw == Self::AUTO_SENTINEL {
            LampLevel::Auto
        } else {
            LampLevel::Level(raw)
        }
    }

    /// True when the lamp asks to be lit
    pub const fn is_lit(&self) -> bool {
        matches!(self, LampLevel::Level(level) if *level != 0)
    }
}

/// Which power rails are energized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct RailState {
    /// Main latch keeping the controller and drive electronics powered
    pub main: bool,
    /// Downstream head/peripheral output
    pub output: bool,
}

/// Published robot state
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct RobotState {
    /// User power intent, set by a long press and cleared by a long press or
    /// the low-voltage guard
    pub power_on: bool,
    /// Current system status
    pub system_status: SystemStatus,
    /// Battery charge (0-100 %)
    pub battery_percent: u8,
    /// Filtered bus voltage (V)
    pub voltage: f32,
    /// Filtered bus current (A)
    pub current: f32,
    /// Filtered bus power (W)
    pub power: f32,
    /// Filtered wheel speed: front-left, front-right, back-left, back-right (RPM)
    pub wheel_rpm: [f32; 4],
    /// Filtered motor current, left then right (A)
    pub motor_current: [f32; 2],
    /// Headlamp request
    pub lamp_level: LampLevel,
    /// Network link state
    pub network_status: NetworkStatus,
    /// External power seen on the last supervisor tick
    pub charger_connected: bool,
    /// Rails energized by the last power sequence
    pub rails: RailState,
}

impl RobotState {
    /// Boot state: off, nothing measured yet
    pub const fn new() -> Self {
        Self {
            power_on: false,
            system_status: SystemStatus::Initial,
            battery_percent: 0,
            voltage: 0.0,
            current: 0.0,
            power: 0.0,
            wheel_rpm: [0.0; 4],
            motor_current: [0.0; 2],
            lamp_level: LampLevel::Level(0),
            network_status: NetworkStatus::Unknown,
            charger_connected: false,
            rails: RailState {
                main: false,
                output: false,
            },
        }
    }

    /// True while external power is present
    pub const fn is_charging(&self) -> bool {
        matches!(
            self.system_status,
            SystemStatus::Charging | SystemStatus::Charged
        )
    }

    /// Lamp lit only while powered and an explicit non-zero level is requested
    pub const fn lamp_should_be_lit(&self) -> bool {
        self.power_on && self.lamp_level.is_lit()
    }
}

impl Default for RobotState {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the supervisor shares with interrupt-like contexts and other tasks
///
/// Create one `static` instance and pass `&'static Shared` to each task.
pub struct Shared {
    /// Published state, written by the supervisor under the lock
    pub state: Mutex<CriticalSectionRawMutex, RobotState>,
    /// Button timestamps, written lock-free from the edge and timer paths
    pub button: ButtonTimerState,
    /// Latest raw wheel RPM from the drive subsystem
    pub wheel_rpm: WheelRpmFeed,
    /// Calibration start/done notifications for the indicator
    pub calibration: Signal<CriticalSectionRawMutex, CalibrationEvent>,
    /// Requests from the supervisor to the indicator task
    pub indicator: Signal<CriticalSectionRawMutex, IndicatorCommand>,
}

impl Shared {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RobotState::new()),
            button: ButtonTimerState::new(),
            wheel_rpm: WheelRpmFeed::new(),
            calibration: Signal::new(),
            indicator: Signal::new(),
        }
    }

    /// Updates the network status shown on the indicator
    pub async fn set_network_status(&self, status: NetworkStatus) {
        self.state.lock().await.network_status = status;
    }

    /// Updates the headlamp request from the platform's raw byte
    pub async fn set_lamp_level(&self, raw: u8) {
        self.state.lock().await.lamp_level = LampLevel::from_raw(raw);
    }

    /// Copy of the current state, taken under the lock
    pub async fn snapshot(&self) -> RobotState {
        *self.state.lock().await
    }
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}
