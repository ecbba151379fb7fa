//! Power button edge and countdown handling
//!
//! Feeds [`ButtonTimerState`] from two sources: GPIO edges on the button pin
//! and expiry of the long-press countdown. The supervisor task polls the same
//! state once per tick.

use core::future::pending;
use core::sync::atomic::{AtomicU32, Ordering};

use defmt::debug;
use embassy_futures::select::{select3, Either3};
use embassy_rp::gpio::{Input, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use power_supervisor::system::button::CountdownTimer;
use power_supervisor::system::config::LONG_PRESS_THRESHOLD_MS;
use power_supervisor::system::state::Shared;

use crate::resources::PowerButtonResources;
use crate::task::now_ms;

enum TimerCommand {
    Start,
    Stop,
}

/// Long-press countdown run by the button task
///
/// `start` and `stop` only post a command, so any task may call them.
pub struct LongPressTimer {
    duration_ms: AtomicU32,
    command: Signal<CriticalSectionRawMutex, TimerCommand>,
}

impl LongPressTimer {
    pub const fn new() -> Self {
        Self {
            duration_ms: AtomicU32::new(LONG_PRESS_THRESHOLD_MS),
            command: Signal::new(),
        }
    }
}

impl CountdownTimer for LongPressTimer {
    fn start(&self) {
        self.command.signal(TimerCommand::Start);
    }

    fn stop(&self) {
        self.command.signal(TimerCommand::Stop);
    }

    fn set_duration(&self, duration_ms: u32) {
        self.duration_ms.store(duration_ms, Ordering::Relaxed);
    }
}

/// Watches the power button and runs the long-press countdown
#[embassy_executor::task]
pub async fn power_button(shared: &'static Shared, timer: &'static LongPressTimer, r: PowerButtonResources) {
    let mut button = Input::new(r.button_pin, Pull::Up);
    shared.button.sample_level(button.is_low());

    let mut deadline: Option<Instant> = None;

    loop {
        let expiry = async move {
            match deadline {
                Some(at) => Timer::at(at).await,
                None => pending::<()>().await,
            }
        };

        let event = select3(button.wait_for_any_edge(), timer.command.wait(), expiry).await;
        match event {
            Either3::First(()) => {
                shared.button.on_edge(button.is_low(), now_ms(), timer);
            }
            Either3::Second(TimerCommand::Start) => {
                let duration = timer.duration_ms.load(Ordering::Relaxed);
                deadline = Some(Instant::now() + Duration::from_millis(duration as u64));
                debug!("long-press countdown armed, {=u32} ms", duration);
            }
            Either3::Second(TimerCommand::Stop) => {
                deadline = None;
            }
            Either3::Third(()) => {
                deadline = None;
                shared.button.on_timeout(button.is_low(), now_ms(), timer);
            }
        }
    }
}
