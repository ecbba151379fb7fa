//! Power rail sequencing, charge detection and headlamp switching
//!
//! The power board latches its main rail with a data line (`latch`) that is
//! clocked in by a pulse on `clock`:
//!
//! ```text
//! latch  ──┐ set level ────────────────────────────
//!          │ 10 ms
//! clock  ──┴──── low 20 ms ──┐ high 20 ms ┌── low
//!                            └────────────┘
//! ```
//!
//! The downstream (head) output is a separate active-low enable. The
//! supervisor decides *what* the rails should be ([`PowerAction`]); this
//! module knows *how* to get there.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::system::state::RailState;

/// Settling time between setting the latch level and clocking it in (ms)
const LATCH_SETUP_MS: u32 = 10;

/// Duration of each clock phase (ms)
const CLOCK_PHASE_MS: u32 = 20;

/// Rail change decided by the supervisor for the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum PowerAction {
    /// Leave the rails as they are
    Hold,
    /// User power-on: main rail and head output on
    PowerOn,
    /// Charger plugged in while off: main rail on, head output kept off
    ChargeBoot,
    /// User power-off or low-voltage shutdown
    Shutdown,
    /// Off, no charger: keep everything de-energized
    IdleOff,
}

impl PowerAction {
    /// Rails this action leads to, `None` for [`PowerAction::Hold`]
    pub const fn target(self) -> Option<RailState> {
        match self {
            PowerAction::Hold => None,
            PowerAction::PowerOn => Some(RailState { main: true, output: true }),
            PowerAction::ChargeBoot => Some(RailState { main: true, output: false }),
            PowerAction::Shutdown | PowerAction::IdleOff => Some(RailState { main: false, output: false }),
        }
    }

    /// The status LED is blanked before the rails go down
    pub const fn clears_indicator(self) -> bool {
        matches!(self, PowerAction::Shutdown | PowerAction::IdleOff)
    }
}

/// Main/head power rails as seen by the supervisor
pub trait PowerControl {
    /// Rails reached by the last sequence
    fn rails(&self) -> RailState;

    /// Drives the rails to `target` and returns what was reached
    async fn apply(&mut self, target: RailState) -> RailState;
}

/// External power detection
pub trait ChargeInput {
    /// True while a charger is connected
    fn is_charging(&mut self) -> bool;
}

/// Headlamp outputs
pub trait LampSwitch {
    /// Switches every lamp together
    fn set(&mut self, on: bool);
}

/// Latch/clock main rail plus active-low head output
pub struct PowerRails<LATCH, CLOCK, OUT, D> {
    latch: LATCH,
    clock: CLOCK,
    output: OUT,
    delay: D,
    rails: RailState,
}

impl<LATCH, CLOCK, OUT, D> PowerRails<LATCH, CLOCK, OUT, D>
where
    LATCH: OutputPin,
    CLOCK: OutputPin,
    OUT: OutputPin,
    D: DelayNs,
{
    /// Takes the pins and drives the boot levels: latch high, clock low,
    /// head output enabled
    ///
    /// The board comes up powered through the button, so both rails start on.
    pub fn new(mut latch: LATCH, mut clock: CLOCK, mut output: OUT, delay: D) -> Self {
        let _ = latch.set_high();
        let _ = clock.set_low();
        let _ = output.set_low();
        Self {
            latch,
            clock,
            output,
            delay,
            rails: RailState { main: true, output: true },
        }
    }

    /// Latches the main rail on
    pub async fn main_on(&mut self) {
        let _ = self.latch.set_high();
        self.clock_in().await;
        self.rails.main = true;
    }

    /// Latches the main rail off
    pub async fn main_off(&mut self) {
        let _ = self.latch.set_low();
        self.clock_in().await;
        self.rails.main = false;
    }

    /// Enables the head output (active low)
    pub fn output_on(&mut self) {
        let _ = self.output.set_low();
        self.rails.output = true;
    }

    /// Disables the head output
    pub fn output_off(&mut self) {
        let _ = self.output.set_high();
        self.rails.output = false;
    }

    async fn clock_in(&mut self) {
        self.delay.delay_ms(LATCH_SETUP_MS).await;
        let _ = self.clock.set_low();
        self.delay.delay_ms(CLOCK_PHASE_MS).await;
        let _ = self.clock.set_high();
        self.delay.delay_ms(CLOCK_PHASE_MS).await;
        let _ = self.clock.set_low();
    }
}

impl<LATCH, CLOCK, OUT, D> PowerControl for PowerRails<LATCH, CLOCK, OUT, D>
where
    LATCH: OutputPin,
    CLOCK: OutputPin,
    OUT: OutputPin,
    D: DelayNs,
{
    fn rails(&self) -> RailState {
        self.rails
    }

    async fn apply(&mut self, target: RailState) -> RailState {
        if self.rails == target {
            return self.rails;
        }

        // main rail first, head output follows it
        if target.main != self.rails.main {
            if target.main {
                self.main_on().await;
            } else {
                self.main_off().await;
            }
        }
        if target.output {
            self.output_on();
        } else {
            self.output_off();
        }

        debug!("rails: main={=bool} output={=bool}", self.rails.main, self.rails.output);
        self.rails
    }
}

/// Charge-port detect and charger interrupt lines, either one high means
/// external power
pub struct ChargeDetect<PORT, INT> {
    port: PORT,
    charger: INT,
}

impl<PORT: InputPin, INT: InputPin> ChargeDetect<PORT, INT> {
    pub fn new(port: PORT, charger: INT) -> Self {
        Self { port, charger }
    }
}

impl<PORT: InputPin, INT: InputPin> ChargeInput for ChargeDetect<PORT, INT> {
    fn is_charging(&mut self) -> bool {
        self.port.is_high().unwrap_or(false) || self.charger.is_high().unwrap_or(false)
    }
}

/// A bank of headlamp outputs switched together
pub struct Lamps<P, const N: usize> {
    pins: [P; N],
    lit: bool,
}

impl<P: OutputPin, const N: usize> Lamps<P, N> {
    /// Takes the pins and switches them off
    pub fn new(mut pins: [P; N]) -> Self {
        for pin in pins.iter_mut() {
            let _ = pin.set_low();
        }
        Self { pins, lit: false }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}

impl<P: OutputPin, const N: usize> LampSwitch for Lamps<P, N> {
    fn set(&mut self, on: bool) {
        for pin in self.pins.iter_mut() {
            let _ = if on { pin.set_high() } else { pin.set_low() };
        }
        self.lit = on;
    }
}
