//! Hardware Resource Management
//!
//! Splits the RP2350 peripherals between the firmware tasks. Each task owns
//! its group outright. The I2C bus is the only shared peripheral and sits
//! behind an async mutex so more devices can join the pack monitor later.
//!
//! # Resource Groups
//! - Power button: momentary switch, active low
//! - Power rails: main latch data and clock, head output enable
//! - Charge detect: charge-port sense and charger interrupt lines
//! - Lamps: four headlamp drivers switched together
//! - Current sense: ADC and both motor current-sense inputs
//! - Power monitor: I2C0 to the INA226
//! - Status LED: two WS2812 segments on PIO0

use assign_resources::assign_resources;
use embassy_rp::adc::InterruptHandler as AdcInterruptHandler;
use embassy_rp::bind_interrupts;
use embassy_rp::i2c::{Async, Config, I2c, InterruptHandler as I2cInterruptHandler};
use embassy_rp::peripherals::{self, I2C0, PIO0};
use embassy_rp::pio::InterruptHandler as PioInterruptHandler;
use embassy_rp::Peri;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use static_cell::StaticCell;

/// I2C0 bus shared between device drivers
pub type I2cBusShared = Mutex<CriticalSectionRawMutex, I2c<'static, I2C0, Async>>;

static I2C_BUS: StaticCell<I2cBusShared> = StaticCell::new();

/// Fast-mode bus clock (Hz)
const I2C_FREQUENCY: u32 = 400_000;

/// Initializes I2C0 and hands out the shared bus
///
/// Call once from `main`, before spawning the tasks that use it.
pub fn init_i2c(r: PowerMonitorResources) -> &'static I2cBusShared {
    let mut config = Config::default();
    config.frequency = I2C_FREQUENCY;
    let i2c = I2c::new_async(r.i2c, r.scl, r.sda, Irqs, config);
    I2C_BUS.init(Mutex::new(i2c))
}

assign_resources! {
    /// Momentary power button, pulled up, pressed = low
    power_button: PowerButtonResources {
        button_pin: PIN_2,
    },
    /// Main rail latch (data + clock) and active-low head output enable
    power_rails: PowerRailResources {
        latch_pin: PIN_3,
        clock_pin: PIN_4,
        output_enable_pin: PIN_5,
    },
    /// External power sense lines, high = charger present
    charge: ChargeResources {
        port_detect_pin: PIN_6,
        charger_int_pin: PIN_7,
    },
    /// Headlamp drivers
    lamps: LampResources {
        lamp1_pin: PIN_10,
        lamp2_pin: PIN_11,
        lamp3_pin: PIN_12,
        lamp4_pin: PIN_13,
    },
    /// Motor current-sense amplifier outputs
    current_sense: CurrentSenseResources {
        adc: ADC,
        left_pin: PIN_26,
        right_pin: PIN_27,
    },
    /// INA226 pack power monitor
    power_monitor: PowerMonitorResources {
        i2c: I2C0,
        scl: PIN_17,
        sda: PIN_16,
    },
    /// Two-segment WS2812 status light
    status_led: StatusLedResources {
        pio: PIO0,
        dma: DMA_CH0,
        data_pin: PIN_15,
    },
}

bind_interrupts!(pub struct Irqs {
    ADC_IRQ_FIFO => AdcInterruptHandler;
    I2C0_IRQ => I2cInterruptHandler<I2C0>;
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});
