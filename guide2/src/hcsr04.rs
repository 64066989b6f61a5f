//! HC-SR04 ultrasonic distance sensor.
//!
//! A 10 us pulse on the trigger pin starts a measurement. The sensor then
//! raises the echo pin for as long as the sound took to come back: every
//! 58 us of echo is one centimetre of distance (the sound travels there and
//! back at about 343 m/s).

use defmt::debug;
use embassy_futures::yield_now;
use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::{InputPin, OutputPin};
use sampler::{error::SensorFault, tasks::Sensor};

/// Length of the trigger pulse.
pub const TRIGGER_PULSE: Duration = Duration::from_micros(10);

/// How long to wait for the echo pulse to start, and then to end. Anything
/// further than about 5 m never answers in time.
pub const ECHO_TIMEOUT: Duration = Duration::from_millis(30);

/// Echo time for one centimetre of distance.
pub const MICROS_PER_CM: u64 = 58;

/// Converts the length of the echo pulse to centimetres.
pub fn echo_to_cm(echo: Duration) -> u16 {
    (echo.as_micros() / MICROS_PER_CM).min(u16::MAX as u64) as u16
}

pub struct Hcsr04<T: OutputPin, E: InputPin> {
    trigger: T,
    echo: E,
}

impl<T: OutputPin, E: InputPin> Hcsr04<T, E> {
    pub fn new(trigger: T, echo: E) -> Self {
        Hcsr04 { trigger, echo }
    }

    /// Measures the distance in centimetres.
    ///
    /// Pin errors are reported as [`SensorFault::Timeout`], the sensor did
    /// not answer.
    pub async fn measure(&mut self) -> Result<u16, SensorFault> {
        self.trigger.set_low().map_err(|_| SensorFault::Timeout)?;
        Timer::after_micros(2).await;
        self.trigger.set_high().map_err(|_| SensorFault::Timeout)?;
        Timer::after(TRIGGER_PULSE).await;
        self.trigger.set_low().map_err(|_| SensorFault::Timeout)?;

        let pulse_start = self.wait_for_echo(true).await?;
        let pulse_end = self.wait_for_echo(false).await?;

        let echo = pulse_end - pulse_start;
        debug!("echo lasted {} us", echo.as_micros());
        Ok(echo_to_cm(echo))
    }

    /// Waits for the echo pin to reach `high` and returns when it did.
    async fn wait_for_echo(&mut self, high: bool) -> Result<Instant, SensorFault> {
        let started = Instant::now();
        loop {
            if self.echo.is_high().map_err(|_| SensorFault::Timeout)? == high {
                return Ok(Instant::now());
            }
            if started.elapsed() > ECHO_TIMEOUT {
                return Err(SensorFault::Timeout);
            }
            yield_now().await;
        }
    }
}

impl<T: OutputPin, E: InputPin> Sensor for Hcsr04<T, E> {
    async fn acquire(&mut self) -> Result<u16, SensorFault> {
        self.measure().await
    }
}
