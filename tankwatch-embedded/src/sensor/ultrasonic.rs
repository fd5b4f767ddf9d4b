use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::types::SensorReading;

use super::EchoTimer;

/// Round-trip microseconds per centimeter at the speed of sound in air.
pub const US_PER_CM: f32 = 58.0;

const TRIGGER_SETTLE_US: u32 = 2;
const TRIGGER_PULSE_US: u32 = 10;

/// HC-SR04 style sampler: a trigger output and a timed echo input.
pub struct DistanceSampler<Trigger, Echo>
where
    Trigger: OutputPin,
    Echo: EchoTimer,
{
    trigger: Trigger,
    echo: Echo,
    timeout_us: u32,
}

impl<Trigger, Echo> DistanceSampler<Trigger, Echo>
where
    Trigger: OutputPin,
    Echo: EchoTimer,
{
    pub fn new(trigger: Trigger, echo: Echo, timeout_us: u32) -> Self {
        Self {
            trigger,
            echo,
            timeout_us,
        }
    }

    /// Fires one trigger pulse and times the echo. A missing echo yields an
    /// invalid reading; the caller decides what to do with it.
    pub fn sample<D: DelayNs>(&mut self, delay: &mut D) -> SensorReading {
        self.trigger.set_low().ok();
        delay.delay_us(TRIGGER_SETTLE_US);
        self.trigger.set_high().ok();
        delay.delay_us(TRIGGER_PULSE_US);
        self.trigger.set_low().ok();

        match self.echo.pulse_width_us(self.timeout_us) {
            Some(pulse_us) if pulse_us > 0 => SensorReading::valid(pulse_us as f32 / US_PER_CM),
            _ => {
                log::warn!("No echo within {} us", self.timeout_us);
                SensorReading::invalid()
            }
        }
    }
}

/// Busy-waiting echo timer on a GPIO input, timed with the embassy clock.
pub struct GpioEcho<P: InputPin> {
    pin: P,
}

impl<P: InputPin> GpioEcho<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    fn wait_while(&mut self, level_high: bool, start: Instant, timeout: Duration) -> Option<()> {
        while self.pin.is_high().ok()? == level_high {
            if start.elapsed() > timeout {
                return None;
            }
        }
        Some(())
    }
}

impl<P: InputPin> EchoTimer for GpioEcho<P> {
    fn pulse_width_us(&mut self, timeout_us: u32) -> Option<u32> {
        let timeout = Duration::from_micros(u64::from(timeout_us));
        let start = Instant::now();

        // A pulse already in progress is not ours; let it finish first.
        self.wait_while(true, start, timeout)?;
        self.wait_while(false, start, timeout)?;
        let rise = Instant::now();
        self.wait_while(true, start, timeout)?;

        u32::try_from(rise.elapsed().as_micros()).ok()
    }
}
