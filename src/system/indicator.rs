//! Status indicator
//!
//! Two WS2812 segments:
//! - **Segment A** shows the battery tier (green/yellow/red, with hysteresis).
//!   It blinks once per cycle while charging.
//! - **Segment B** shows network state, or IMU calibration while one runs.
//!
//! # Timing
//!
//! The indicator is a state machine driven by the caller's tick. Every call
//! to [`Indicator::update`] passes the current time and gets back a frame
//! only when the LEDs must change. A cycle is either one solid frame held for
//! the nominal on-time, or an on frame followed by an off frame:
//!
//! ```text
//! Unknown        red     ───────────────  (on)
//! NoSim          red     ────────┐_______  (on / on)
//! Connecting     green   ──┐__             (fast / fast)
//! Connected      green   ───────────────  (on)
//! OtaInProgress  blue    ──┐__             (fast / fast)
//! Calibrating    purple  ──┐__             (fast / fast)
//! ```
//!
//! Fast phases last 3/10 of the on-time, rounded down, at least 1 ms.
//!
//! While the robot is off segment B stays dark. Segment A stays dark too,
//! unless a charger is connected.

use crate::system::config::{
    FAST_BLINK_DENOMINATOR, FAST_BLINK_NUMERATOR, INDICATOR_ON_TIME_MS, SELF_TEST_OFF_DENOMINATOR,
    SELF_TEST_OFF_NUMERATOR, SELF_TEST_ON_TIME_MS, TIER_GREEN_ENTER_ABOVE, TIER_GREEN_EXIT_BELOW,
    TIER_RED_ENTER_BELOW, TIER_RED_EXIT_ABOVE,
};
use crate::system::event::CalibrationEvent;
use crate::system::state::{NetworkStatus, RobotState, SystemStatus};

/// Number of LEDs in the chain
pub const SEGMENTS: usize = 2;

/// One LED frame, segment A first
pub type Frame = [Color; SEGMENTS];

/// Indicator palette
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Color {
    Black,
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
    Cyan,
}

impl Color {
    /// Packed `0xRRGGBB` value
    pub const fn rgb(self) -> u32 {
        match self {
            Color::Black => 0x00_00_00,
            Color::Red => 0xFF_00_00,
            Color::Green => 0x00_FF_00,
            Color::Blue => 0x00_00_FF,
            Color::Yellow => 0xFF_7F_00,
            Color::Purple => 0x8F_00_FF,
            Color::Cyan => 0x00_FF_FF,
        }
    }

    /// Red, green and blue channels
    pub const fn channels(self) -> [u8; 3] {
        let rgb = self.rgb();
        [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8]
    }
}

/// Fast blink phase for a nominal on-time (ms)
pub const fn fast_blink_ms(on_time_ms: u32) -> u32 {
    let fast = on_time_ms * FAST_BLINK_NUMERATOR / FAST_BLINK_DENOMINATOR;
    if fast == 0 { 1 } else { fast }
}

/// Battery tier shown on segment A
///
/// Each tier is left only when the charge crosses the far side of its band,
/// so a reading hovering around 60 % or 20 % does not flicker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum BatteryTier {
    Green,
    Yellow,
    Red,
}

impl BatteryTier {
    /// Tier after seeing `percent`
    pub fn update(self, percent: u8) -> BatteryTier {
        match self {
            BatteryTier::Green if percent < TIER_RED_ENTER_BELOW => BatteryTier::Red,
            BatteryTier::Green if percent < TIER_GREEN_EXIT_BELOW => BatteryTier::Yellow,
            BatteryTier::Yellow if percent > TIER_GREEN_ENTER_ABOVE => BatteryTier::Green,
            BatteryTier::Yellow if percent < TIER_RED_ENTER_BELOW => BatteryTier::Red,
            BatteryTier::Red if percent > TIER_GREEN_ENTER_ABOVE => BatteryTier::Green,
            BatteryTier::Red if percent > TIER_RED_EXIT_ABOVE => BatteryTier::Yellow,
            tier => tier,
        }
    }

    pub const fn color(self) -> Color {
        match self {
            BatteryTier::Green => Color::Green,
            BatteryTier::Yellow => Color::Yellow,
            BatteryTier::Red => Color::Red,
        }
    }
}

/// What one indicator cycle shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    /// One frame for the whole cycle
    Solid { frame: Frame, hold_ms: u32 },
    /// `frame` for `phase_ms`, then segment B dark for `phase_ms`
    Blink { frame: Frame, phase_ms: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No cycle running, the next update starts one
    Idle,
    /// Showing the first frame of the cycle
    On { since: u32, pattern: Pattern },
    /// Showing the dark half of a blink
    Off { since: u32, phase_ms: u32 },
}

/// Tick-driven two-segment indicator
pub struct Indicator {
    on_time_ms: u32,
    tier: BatteryTier,
    /// Charge blink shows the tier color on this cycle
    charge_lit: bool,
    calibrating: bool,
    phase: Phase,
}

impl Indicator {
    /// Indicator with the nominal 500 ms on-time
    pub const fn new() -> Self {
        Self::with_on_time(INDICATOR_ON_TIME_MS)
    }

    pub const fn with_on_time(on_time_ms: u32) -> Self {
        Self {
            on_time_ms,
            tier: BatteryTier::Green,
            charge_lit: true,
            calibrating: false,
            phase: Phase::Idle,
        }
    }

    /// Battery tier currently remembered
    pub fn tier(&self) -> BatteryTier {
        self.tier
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrating
    }

    /// Drops the running cycle, the next update starts a fresh one
    ///
    /// Returns the dark frame to write.
    pub fn clear(&mut self) -> Frame {
        self.phase = Phase::Idle;
        [Color::Black; SEGMENTS]
    }

    /// Advances the indicator to `now_ms`
    ///
    /// `calibration` is the event taken from the calibration signal since the
    /// last call, if any. It takes effect on the next cycle. Returns the frame
    /// to write when the LEDs change.
    pub fn update(&mut self, now_ms: u32, state: &RobotState, calibration: Option<CalibrationEvent>) -> Option<Frame> {
        match calibration {
            Some(CalibrationEvent::Started) => {
                info!("IMU calibration started");
                self.calibrating = true;
            }
            Some(CalibrationEvent::Done) => {
                info!("IMU calibration done");
                self.calibrating = false;
            }
            None => {}
        }

        match self.phase {
            Phase::Idle => Some(self.start_cycle(now_ms, state)),
            Phase::On { since, pattern } => match pattern {
                Pattern::Solid { hold_ms, .. } if now_ms.wrapping_sub(since) >= hold_ms => {
                    Some(self.start_cycle(now_ms, state))
                }
                Pattern::Blink { frame, phase_ms } if now_ms.wrapping_sub(since) >= phase_ms => {
                    self.phase = Phase::Off { since: now_ms, phase_ms };
                    Some([frame[0], Color::Black])
                }
                _ => None,
            },
            Phase::Off { since, phase_ms } if now_ms.wrapping_sub(since) >= phase_ms => {
                Some(self.start_cycle(now_ms, state))
            }
            Phase::Off { .. } => None,
        }
    }

    fn start_cycle(&mut self, now_ms: u32, state: &RobotState) -> Frame {
        let pattern = self.pattern(state);
        self.phase = Phase::On { since: now_ms, pattern };
        match pattern {
            Pattern::Solid { frame, .. } | Pattern::Blink { frame, .. } => frame,
        }
    }

    /// Decides the next cycle's pattern and advances tier and charge blink
    fn pattern(&mut self, state: &RobotState) -> Pattern {
        let tier = self.tier.update(state.battery_percent);
        if tier != self.tier {
            debug!("battery tier {} -> {}", self.tier, tier);
            self.tier = tier;
        }

        let mut segment_a = tier.color();
        if state.system_status == SystemStatus::Charging {
            if !self.charge_lit {
                segment_a = Color::Black;
            }
            self.charge_lit = !self.charge_lit;
        }

        let on = self.on_time_ms;
        let fast = fast_blink_ms(on);

        if !state.power_on {
            // a charge-booted robot keeps power_on false, so segment A stays
            // lit while the charger is connected to show charge progress
            if !state.charger_connected {
                segment_a = Color::Black;
            }
            return Pattern::Solid {
                frame: [segment_a, Color::Black],
                hold_ms: on,
            };
        }

        if self.calibrating {
            return Pattern::Blink {
                frame: [segment_a, Color::Purple],
                phase_ms: fast,
            };
        }

        match state.network_status {
            NetworkStatus::Unknown => Pattern::Solid {
                frame: [segment_a, Color::Red],
                hold_ms: on,
            },
            NetworkStatus::NoSim => Pattern::Blink {
                frame: [segment_a, Color::Red],
                phase_ms: on,
            },
            NetworkStatus::Connecting => Pattern::Blink {
                frame: [segment_a, Color::Green],
                phase_ms: fast,
            },
            NetworkStatus::Connected => Pattern::Solid {
                frame: [segment_a, Color::Green],
                hold_ms: on,
            },
            NetworkStatus::OtaInProgress => Pattern::Blink {
                frame: [segment_a, Color::Blue],
                phase_ms: fast,
            },
        }
    }
}

impl Default for Indicator {
    fn default() -> Self {
        Self::new()
    }
}

/// Colors shown by the power-up self-test, in order
pub const SELF_TEST_PALETTE: [Color; 6] = [
    Color::Red,
    Color::Yellow,
    Color::Green,
    Color::Blue,
    Color::Cyan,
    Color::Purple,
];

/// LED check run once after boot while the robot is still off
///
/// Each palette color lights both segments for the on-time, then both go
/// dark for half of it. Powering on aborts the sequence.
pub struct SelfTest {
    on_ms: u32,
    off_ms: u32,
    index: usize,
    lit: bool,
    since: Option<u32>,
    finished: bool,
}

impl SelfTest {
    pub const fn new() -> Self {
        Self::with_on_time(SELF_TEST_ON_TIME_MS)
    }

    pub const fn with_on_time(on_ms: u32) -> Self {
        Self {
            on_ms,
            off_ms: on_ms * SELF_TEST_OFF_NUMERATOR / SELF_TEST_OFF_DENOMINATOR,
            index: 0,
            lit: false,
            since: None,
            finished: false,
        }
    }

    /// True once the sequence completed or was aborted
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advances the sequence, returns the frame to write when it changes
    pub fn update(&mut self, now_ms: u32, power_on: bool) -> Option<Frame> {
        if self.finished {
            return None;
        }
        if power_on {
            if self.since.is_some() {
                info!("LED self-test aborted, robot powered on");
            }
            self.finished = true;
            return None;
        }

        let Some(since) = self.since else {
            info!("LED self-test");
            self.since = Some(now_ms);
            self.lit = true;
            return Some([SELF_TEST_PALETTE[0]; SEGMENTS]);
        };

        let elapsed = now_ms.wrapping_sub(since);
        if self.lit {
            if elapsed < self.on_ms {
                return None;
            }
            self.lit = false;
            self.since = Some(now_ms);
            return Some([Color::Black; SEGMENTS]);
        }

        if elapsed < self.off_ms {
            return None;
        }
        self.index += 1;
        if self.index == SELF_TEST_PALETTE.len() {
            self.finished = true;
            return None;
        }
        self.lit = true;
        self.since = Some(now_ms);
        Some([SELF_TEST_PALETTE[self.index]; SEGMENTS])
    }
}

impl Default for SelfTest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    fn powered(network: NetworkStatus, percent: u8) -> RobotState {
        let mut state = RobotState::new();
        state.power_on = true;
        state.system_status = SystemStatus::Running;
        state.battery_percent = percent;
        state.network_status = network;
        state
    }

    /// Runs the indicator every 10 ms and collects (time, frame) changes
    fn run(indicator: &mut Indicator, state: &RobotState, until_ms: u32) -> Vec<(u32, Frame)> {
        let mut frames = Vec::new();
        let mut now = 0;
        while now < until_ms {
            if let Some(frame) = indicator.update(now, state, None) {
                frames.push((now, frame));
            }
            now += 10;
        }
        frames
    }

    #[test]
    fn packing_happens_per_channel() {
        assert_eq!(Color::Yellow.rgb(), 0xFF7F00);
        assert_eq!(Color::Yellow.channels(), [0xFF, 0x7F, 0x00]);
        assert_eq!(Color::Purple.channels(), [0x8F, 0x00, 0xFF]);
        assert_eq!(Color::Black.channels(), [0, 0, 0]);
    }

    #[test]
    fn fast_blink_rounding() {
        assert_eq!(fast_blink_ms(500), 150);
        assert_eq!(fast_blink_ms(10), 3);
        assert_eq!(fast_blink_ms(3), 1);
        assert_eq!(fast_blink_ms(1), 1);
        assert_eq!(fast_blink_ms(0), 1);
    }

    #[test]
    fn tier_hysteresis_walk() {
        let mut tier = BatteryTier::Green;
        tier = tier.update(65);
        assert_eq!(tier, BatteryTier::Green);
        tier = tier.update(61);
        assert_eq!(tier, BatteryTier::Green);
        tier = tier.update(59);
        assert_eq!(tier, BatteryTier::Yellow);
        tier = tier.update(65);
        assert_eq!(tier, BatteryTier::Yellow);
        tier = tier.update(73);
        assert_eq!(tier, BatteryTier::Yellow);
        tier = tier.update(74);
        assert_eq!(tier, BatteryTier::Green);
    }

    #[test]
    fn red_band_has_its_own_margin() {
        let mut tier = BatteryTier::Yellow;
        tier = tier.update(20);
        assert_eq!(tier, BatteryTier::Yellow);
        tier = tier.update(19);
        assert_eq!(tier, BatteryTier::Red);
        tier = tier.update(30);
        assert_eq!(tier, BatteryTier::Red);
        tier = tier.update(34);
        assert_eq!(tier, BatteryTier::Yellow);
    }

    #[test]
    fn boot_on_flat_battery_goes_straight_to_red() {
        assert_eq!(BatteryTier::Green.update(5), BatteryTier::Red);
        assert_eq!(BatteryTier::Red.update(90), BatteryTier::Green);
    }

    #[test]
    fn connected_is_solid_green() {
        let mut indicator = Indicator::new();
        let state = powered(NetworkStatus::Connected, 90);
        let frames = run(&mut indicator, &state, 1_200);
        // one frame per 500 ms cycle, nothing in between
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], (0, [Color::Green, Color::Green]));
        assert_eq!(frames[1].0, 500);
        assert_eq!(frames[2].0, 1_000);
    }

    #[test]
    fn unknown_network_is_solid_red() {
        let mut indicator = Indicator::new();
        let state = powered(NetworkStatus::Unknown, 45);
        let frames = run(&mut indicator, &state, 400);
        assert_eq!(frames, [(0, [Color::Yellow, Color::Red])]);
    }

    #[test]
    fn no_sim_is_slow_red_blink() {
        let mut indicator = Indicator::new();
        let state = powered(NetworkStatus::NoSim, 90);
        let frames = run(&mut indicator, &state, 1_100);
        assert_eq!(
            frames,
            [
                (0, [Color::Green, Color::Red]),
                (500, [Color::Green, Color::Black]),
                (1_000, [Color::Green, Color::Red]),
            ]
        );
    }

    #[test]
    fn connecting_is_fast_green_blink() {
        let mut indicator = Indicator::new();
        let state = powered(NetworkStatus::Connecting, 90);
        let frames = run(&mut indicator, &state, 400);
        assert_eq!(
            frames,
            [
                (0, [Color::Green, Color::Green]),
                (150, [Color::Green, Color::Black]),
                (300, [Color::Green, Color::Green]),
            ]
        );
    }

    #[test]
    fn ota_is_fast_blue_blink() {
        let mut indicator = Indicator::new();
        let state = powered(NetworkStatus::OtaInProgress, 90);
        let frames = run(&mut indicator, &state, 200);
        assert_eq!(
            frames,
            [(0, [Color::Green, Color::Blue]), (150, [Color::Green, Color::Black])]
        );
    }

    #[test]
    fn calibration_overrides_network_until_done() {
        let mut indicator = Indicator::new();
        let state = powered(NetworkStatus::Connected, 90);

        assert_eq!(
            indicator.update(0, &state, Some(CalibrationEvent::Started)),
            Some([Color::Green, Color::Purple])
        );
        assert!(indicator.is_calibrating());
        assert_eq!(indicator.update(150, &state, None), Some([Color::Green, Color::Black]));
        assert_eq!(indicator.update(300, &state, None), Some([Color::Green, Color::Purple]));

        // done mid-cycle: the running blink finishes first
        assert_eq!(indicator.update(310, &state, Some(CalibrationEvent::Done)), None);
        assert_eq!(indicator.update(450, &state, None), Some([Color::Green, Color::Black]));
        assert_eq!(indicator.update(600, &state, None), Some([Color::Green, Color::Green]));
    }

    #[test]
    fn charging_blinks_segment_a_each_cycle() {
        let mut indicator = Indicator::new();
        let mut state = powered(NetworkStatus::Connected, 90);
        state.system_status = SystemStatus::Charging;
        state.charger_connected = true;

        let frames = run(&mut indicator, &state, 1_600);
        let segment_a: Vec<Color> = frames.iter().map(|(_, frame)| frame[0]).collect();
        assert_eq!(segment_a, [Color::Green, Color::Black, Color::Green, Color::Black]);
    }

    #[test]
    fn charged_is_solid() {
        let mut indicator = Indicator::new();
        let mut state = powered(NetworkStatus::Connected, 100);
        state.system_status = SystemStatus::Charged;
        let frames = run(&mut indicator, &state, 1_100);
        assert!(frames.iter().all(|(_, frame)| frame[0] == Color::Green));
    }

    #[test]
    fn powered_off_is_dark() {
        let mut indicator = Indicator::new();
        let mut state = powered(NetworkStatus::Connected, 90);
        state.power_on = false;
        state.system_status = SystemStatus::Shutdown;
        let frames = run(&mut indicator, &state, 600);
        assert_eq!(
            frames,
            [(0, [Color::Black, Color::Black]), (500, [Color::Black, Color::Black])]
        );
    }

    #[test]
    fn powered_off_hides_calibration() {
        let mut indicator = Indicator::new();
        let mut state = powered(NetworkStatus::Connected, 90);
        state.power_on = false;
        assert_eq!(
            indicator.update(0, &state, Some(CalibrationEvent::Started)),
            Some([Color::Black, Color::Black])
        );
        // event still consumed
        assert!(indicator.is_calibrating());
    }

    #[test]
    fn off_while_charging_shows_battery_only() {
        let mut indicator = Indicator::new();
        let mut state = powered(NetworkStatus::Connected, 45);
        state.power_on = false;
        state.system_status = SystemStatus::Charging;
        state.charger_connected = true;
        let frames = run(&mut indicator, &state, 1_100);
        assert_eq!(
            frames,
            [
                (0, [Color::Yellow, Color::Black]),
                (500, [Color::Black, Color::Black]),
                (1_000, [Color::Yellow, Color::Black]),
            ]
        );
    }

    #[test]
    fn clear_restarts_the_cycle() {
        let mut indicator = Indicator::new();
        let state = powered(NetworkStatus::Connected, 90);
        assert!(indicator.update(0, &state, None).is_some());
        assert_eq!(indicator.clear(), [Color::Black, Color::Black]);
        assert_eq!(indicator.update(20, &state, None), Some([Color::Green, Color::Green]));
    }

    #[test]
    fn self_test_walks_the_palette() {
        let mut test = SelfTest::new();
        let mut frames = Vec::new();
        let mut now = 0;
        while !test.is_finished() && now < 5_000 {
            if let Some(frame) = test.update(now, false) {
                frames.push(frame);
            }
            now += 10;
        }
        assert!(test.is_finished());
        // lit and dark frame per color
        assert_eq!(frames.len(), SELF_TEST_PALETTE.len() * 2);
        for (i, color) in SELF_TEST_PALETTE.iter().enumerate() {
            assert_eq!(frames[i * 2], [*color; SEGMENTS]);
            assert_eq!(frames[i * 2 + 1], [Color::Black; SEGMENTS]);
        }
        // 6 * (200 + 100) ms
        assert_eq!(now, 1_810);
    }

    #[test]
    fn self_test_aborts_on_power_on() {
        let mut test = SelfTest::new();
        assert_eq!(test.update(0, false), Some([Color::Red; SEGMENTS]));
        assert_eq!(test.update(200, false), Some([Color::Black; SEGMENTS]));
        assert_eq!(test.update(210, true), None);
        assert!(test.is_finished());
        assert_eq!(test.update(400, false), None);
    }
}
