//! Status light task
//!
//! Drives the two WS2812 segments. After boot the LED self-test runs while
//! the robot is still off, then the [`Indicator`] takes over. A clear request
//! from the supervisor blanks both segments at once.

use defmt::info;
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::Pio;
use embassy_rp::pio_programs::ws2812::{Grb, PioWs2812, PioWs2812Program};
use embassy_time::{Duration, Ticker};
use power_supervisor::system::event::poll_calibration;
use power_supervisor::system::indicator::{Frame, Indicator, SelfTest, SEGMENTS};
use power_supervisor::system::state::Shared;
use smart_leds::RGB8;

use crate::resources::{Irqs, StatusLedResources};
use crate::task::now_ms;

/// Resolution of blink timing (ms)
const REFRESH_MS: u64 = 10;

fn to_rgb(frame: Frame) -> [RGB8; SEGMENTS] {
    frame.map(|color| {
        let [r, g, b] = color.channels();
        RGB8::new(r, g, b)
    })
}

/// Runs the self-test and then the status indicator
#[embassy_executor::task]
pub async fn indicate(shared: &'static Shared, r: StatusLedResources) {
    let Pio { mut common, sm0, .. } = Pio::new(r.pio, Irqs);
    let program = PioWs2812Program::new(&mut common);
    let mut leds: PioWs2812<'_, PIO0, 0, SEGMENTS, Grb> = PioWs2812::new(&mut common, sm0, r.dma, r.data_pin, &program);

    let mut self_test = SelfTest::new();
    let mut indicator = Indicator::new();
    let mut ticker = Ticker::every(Duration::from_millis(REFRESH_MS));

    loop {
        ticker.next().await;
        let now = now_ms();

        if shared.indicator.try_take().is_some() {
            info!("indicator cleared");
            leds.write(&to_rgb(indicator.clear())).await;
            continue;
        }

        let state = shared.snapshot().await;
        let frame = if self_test.is_finished() {
            indicator.update(now, &state, poll_calibration(&shared.calibration))
        } else {
            self_test.update(now, state.power_on)
        };

        if let Some(frame) = frame {
            leds.write(&to_rgb(frame)).await;
        }
    }
}
