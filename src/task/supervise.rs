//! Supervisor task
//!
//! Builds the RP2350 side of [`SupervisorIo`] and runs one supervisor tick
//! every [`TICK_PERIOD_MS`]. If the pack monitor or the current-sense ADC
//! cannot be brought up the task logs the error and ends: the rails stay as
//! the boot latch left them.

use defmt::{error, info, warn};
use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice;
use embassy_rp::adc::{self, Adc, Channel};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_time::{Delay, Duration, Ticker};
use power_supervisor::system::config::{SupervisorConfig, TICK_PERIOD_MS};
use power_supervisor::system::ina226::Ina226;
use power_supervisor::system::power::{ChargeDetect, Lamps, PowerRails};
use power_supervisor::system::sensors::{CurrentSenseAdc, MotorSide};
use power_supervisor::system::state::Shared;
use power_supervisor::system::supervisor::{Supervisor, SupervisorIo};
use power_supervisor::Error;

use crate::resources::{
    ChargeResources, CurrentSenseResources, I2cBusShared, Irqs, LampResources, PowerRailResources,
};
use crate::task::now_ms;
use crate::task::power_button::LongPressTimer;

/// RP2350 ADC with one channel per motor
struct MotorCurrentAdc {
    adc: Adc<'static, adc::Async>,
    channels: [Channel<'static>; 2],
}

impl MotorCurrentAdc {
    fn new(r: CurrentSenseResources) -> Self {
        let adc = Adc::new(r.adc, Irqs, adc::Config::default());
        let channels = [
            Channel::new_pin(r.left_pin, Pull::None),
            Channel::new_pin(r.right_pin, Pull::None),
        ];
        Self { adc, channels }
    }
}

impl CurrentSenseAdc for MotorCurrentAdc {
    async fn enable(&mut self) -> Result<(), Error> {
        for side in MotorSide::BOTH {
            self.adc
                .read(&mut self.channels[side.index()])
                .await
                .map_err(|_| Error::CurrentSenseUnavailable)?;
        }
        Ok(())
    }

    async fn read(&mut self, side: MotorSide) -> u16 {
        match self.adc.read(&mut self.channels[side.index()]).await {
            Ok(raw) => raw,
            Err(_) => {
                warn!("current-sense read failed on {}", side);
                0
            }
        }
    }
}

/// Runs the power and telemetry supervisor
#[embassy_executor::task]
pub async fn supervise(
    shared: &'static Shared,
    timer: &'static LongPressTimer,
    i2c_bus: &'static I2cBusShared,
    rails: PowerRailResources,
    charge: ChargeResources,
    lamps: LampResources,
    current_sense: CurrentSenseResources,
) {
    let io = SupervisorIo {
        sensor: Ina226::new(I2cDevice::new(i2c_bus)),
        adc: MotorCurrentAdc::new(current_sense),
        rails: PowerRails::new(
            Output::new(rails.latch_pin, Level::High),
            Output::new(rails.clock_pin, Level::Low),
            Output::new(rails.output_enable_pin, Level::Low),
            Delay,
        ),
        charge: ChargeDetect::new(
            Input::new(charge.port_detect_pin, Pull::Down),
            Input::new(charge.charger_int_pin, Pull::Down),
        ),
        lamps: Lamps::new([
            Output::new(lamps.lamp1_pin, Level::Low),
            Output::new(lamps.lamp2_pin, Level::Low),
            Output::new(lamps.lamp3_pin, Level::Low),
            Output::new(lamps.lamp4_pin, Level::Low),
        ]),
    };

    let mut supervisor = Supervisor::new(shared, timer, io, SupervisorConfig::default());
    if let Err(e) = supervisor.init().await {
        error!("supervisor startup failed: {}", e);
        return;
    }

    info!("supervisor running every {=u32} ms", TICK_PERIOD_MS);
    let mut ticker = Ticker::every(Duration::from_millis(TICK_PERIOD_MS as u64));
    loop {
        supervisor.tick(now_ms()).await;
        ticker.next().await;
    }
}
