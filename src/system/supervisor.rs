//! Supervisor loop
//!
//! One [`Supervisor::tick`] per 100 ms period. Each tick:
//! 1. Gates the headlamps on power and lamp level
//! 2. Polls the power button and applies a confirmed long press
//! 3. Samples both motor current-sense channels (burst, median, sliding average)
//! 4. Reads the pack monitor. Voltage is range checked, rate limited once
//!    warmed up, then averaged. Current and power are averaged.
//! 5. Smooths the wheel RPM feed and fans it out to four wheels
//! 6. Publishes everything under the state lock and evaluates charge state
//! 7. Drives the rails to whatever the button or charge logic decided
//!
//! Hardware comes in through [`SupervisorIo`], so the whole loop runs against
//! fakes on the host.

use crate::system::battery::{battery_percentage, evaluate_charge};
use crate::system::button::{apply_power_request, CountdownTimer, PowerTransition};
use crate::system::config::{
    SupervisorConfig, ADC_BURST_SAMPLES, CURRENT_WINDOW, MOTOR_CURRENT_WINDOW, POWER_WINDOW,
    VOLTAGE_VALID_MAX, VOLTAGE_VALID_MIN, VOLTAGE_WINDOW, WHEEL_RPM_WINDOW,
};
use crate::system::event::IndicatorCommand;
use crate::system::filter::{median, rate_limit, SlidingFilter};
use crate::system::power::{ChargeInput, LampSwitch, PowerAction, PowerControl};
use crate::system::sensors::{fan_out_rpm, motor_current, CurrentSenseAdc, MotorSide, PowerSensor};
use crate::system::state::Shared;
use crate::Error;

/// Hardware the supervisor drives
pub struct SupervisorIo<S, A, P, C, L> {
    /// Pack power monitor
    pub sensor: S,
    /// Motor current-sense ADC
    pub adc: A,
    /// Main and head power rails
    pub rails: P,
    /// Charger detection
    pub charge: C,
    /// Headlamps
    pub lamps: L,
}

impl From<PowerTransition> for PowerAction {
    fn from(transition: PowerTransition) -> Self {
        match transition {
            PowerTransition::PoweredOn => PowerAction::PowerOn,
            PowerTransition::PoweredOff | PowerTransition::LowVoltageShutdown => PowerAction::Shutdown,
        }
    }
}

/// Periodic power and telemetry supervisor
pub struct Supervisor<'a, S, A, P, C, L, T> {
    shared: &'a Shared,
    timer: &'a T,
    io: SupervisorIo<S, A, P, C, L>,
    config: SupervisorConfig,
    warm_up: u8,
    /// Last accepted filtered voltage, also the rate limiter's reference
    voltage: f32,
    voltage_filter: SlidingFilter<VOLTAGE_WINDOW>,
    current_filter: SlidingFilter<CURRENT_WINDOW>,
    power_filter: SlidingFilter<POWER_WINDOW>,
    motor_filters: [SlidingFilter<MOTOR_CURRENT_WINDOW>; 2],
    rpm_filters: [SlidingFilter<WHEEL_RPM_WINDOW>; 2],
    burst: [u16; ADC_BURST_SAMPLES],
}

impl<'a, S, A, P, C, L, T> Supervisor<'a, S, A, P, C, L, T>
where
    S: PowerSensor,
    A: CurrentSenseAdc,
    P: PowerControl,
    C: ChargeInput,
    L: LampSwitch,
    T: CountdownTimer,
{
    pub fn new(shared: &'a Shared, timer: &'a T, io: SupervisorIo<S, A, P, C, L>, config: SupervisorConfig) -> Self {
        Self {
            shared,
            timer,
            io,
            config,
            warm_up: 0,
            voltage: 0.0,
            voltage_filter: SlidingFilter::new(),
            current_filter: SlidingFilter::new(),
            power_filter: SlidingFilter::new(),
            motor_filters: [SlidingFilter::new(), SlidingFilter::new()],
            rpm_filters: [SlidingFilter::new(), SlidingFilter::new()],
            burst: [0; ADC_BURST_SAMPLES],
        }
    }

    /// Brings up the sensors and publishes the boot rail state
    ///
    /// A failure here is fatal: the supervisor must not run without telemetry.
    pub async fn init(&mut self) -> Result<(), Error> {
        self.io.sensor.init().await?;
        self.io.adc.enable().await?;
        self.shared.state.lock().await.rails = self.io.rails.rails();
        info!("supervisor initialized");
        Ok(())
    }

    /// Current rate-limit warm-up count
    pub fn warm_up(&self) -> u8 {
        self.warm_up
    }

    /// Runs one supervisor iteration at `now_ms`
    pub async fn tick(&mut self, now_ms: u32) {
        let power_on = {
            let state = self.shared.state.lock().await;
            self.io.lamps.set(state.lamp_should_be_lit());
            state.power_on
        };

        if let Some(request) = self.shared.button.poll(power_on, now_ms, self.timer) {
            let transition = {
                let mut state = self.shared.state.lock().await;
                apply_power_request(&mut state, request, self.config.low_voltage)
            };
            self.execute(transition.into()).await;
        }

        let motor_current = self.sample_motor_currents().await;

        if self.warm_up < self.config.warm_up_ticks {
            self.warm_up += 1;
            if self.warm_up == self.config.warm_up_ticks {
                info!("voltage filter warmed up, rate limiting on");
            }
        }
        let rate_limited = self.warm_up >= self.config.warm_up_ticks;

        let current = self.io.sensor.current().await;
        let voltage = self.io.sensor.bus_voltage().await;
        let power = self.io.sensor.power().await;

        let current = self.current_filter.add_sample(current);
        if (VOLTAGE_VALID_MIN..=VOLTAGE_VALID_MAX).contains(&voltage) {
            // the first accepted reading becomes the reference
            let sample = if rate_limited && self.voltage_filter.average().is_some() {
                rate_limit(voltage, self.voltage, self.config.voltage_rate_limit)
            } else {
                voltage
            };
            self.voltage = self.voltage_filter.add_sample(sample);
        } else {
            debug!("voltage {=f32} V out of range, dropped", voltage);
        }
        let power = self.power_filter.add_sample(power);

        let (left, right) = self.shared.wheel_rpm.latest();
        let left = self.rpm_filters[0].add_sample(left as f32);
        let right = self.rpm_filters[1].add_sample(right as f32);
        let wheel_rpm = fan_out_rpm(left, right, &self.config.wheel_coefficients);

        let action = {
            let mut state = self.shared.state.lock().await;
            state.current = current;
            state.voltage = self.voltage;
            state.power = power;
            state.motor_current = motor_current;
            state.wheel_rpm = wheel_rpm;
            state.battery_percent = battery_percentage(self.voltage);

            let charging = self.io.charge.is_charging();
            evaluate_charge(&mut state, charging, &self.config)
        };
        self.execute(action).await;
    }

    /// Burst-samples each current-sense channel and converts to amps,
    /// left then right
    async fn sample_motor_currents(&mut self) -> [f32; 2] {
        let mut currents = [0.0; 2];
        for side in MotorSide::BOTH {
            for sample in self.burst.iter_mut() {
                *sample = self.io.adc.read(side).await;
            }
            let Some(raw) = median(&mut self.burst) else {
                continue;
            };
            let index = side.index();
            let filtered = self.motor_filters[index].add_sample(raw as f32);
            currents[index] = motor_current(filtered, self.config.current_offsets[index]);
        }
        currents
    }

    /// Drives the rails for `action` and publishes the result
    async fn execute(&mut self, action: PowerAction) {
        let Some(target) = action.target() else {
            return;
        };
        if target == self.io.rails.rails() {
            return;
        }

        if action.clears_indicator() {
            self.shared.indicator.signal(IndicatorCommand::Clear);
        }
        let reached = self.io.rails.apply(target).await;
        self.shared.state.lock().await.rails = reached;
    }
}
