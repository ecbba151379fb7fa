//! Power board firmware entry point
//!
//! Initializes the RP2350, hands each task its peripherals and spawns the
//! button, supervisor and status light tasks.

#![no_std]
#![no_main]

use crate::task::{
    indicate::indicate,
    power_button::{power_button, LongPressTimer},
    supervise::supervise,
};
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::config::Config;
use power_supervisor::system::state::Shared;
use resources::{
    AssignedResources, ChargeResources, CurrentSenseResources, LampResources, PowerButtonResources,
    PowerMonitorResources, PowerRailResources, StatusLedResources,
};
use {defmt_rtt as _, panic_probe as _};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// Peripheral allocation
mod resources;
/// Task implementations
mod task;

/// State shared by all tasks
static SHARED: Shared = Shared::new();

/// Countdown confirming a long press, run by the button task
static LONG_PRESS_TIMER: LongPressTimer = LongPressTimer::new();

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Config::default());

    let r = split_resources!(p);
    let i2c_bus = resources::init_i2c(r.power_monitor);

    // Button first so the boot press is seen by the first supervisor tick
    spawner
        .spawn(power_button(&SHARED, &LONG_PRESS_TIMER, r.power_button))
        .unwrap();
    spawner
        .spawn(supervise(
            &SHARED,
            &LONG_PRESS_TIMER,
            i2c_bus,
            r.power_rails,
            r.charge,
            r.lamps,
            r.current_sense,
        ))
        .unwrap();
    spawner.spawn(indicate(&SHARED, r.status_led)).unwrap();
}
