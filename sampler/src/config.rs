//! Sampling presets.

use core::ops::RangeInclusive;

use embassy_time::Duration;

use crate::dispatcher::TickDispatcher;
use crate::error::ConfigError;

/// Tick period and the readings the sampler accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    pub period: Duration,
    pub accepted: RangeInclusive<u16>,
}

impl SamplerConfig {
    /// Ultrasonic distance in centimetres, once a second. The sensor
    /// cannot see closer than 2 cm or further than 4 m.
    pub const DISTANCE: SamplerConfig = SamplerConfig {
        period: Duration::from_secs(1),
        accepted: 2..=400,
    };

    /// 12-bit ADC counts at 500 Hz.
    pub const ANALOG: SamplerConfig = SamplerConfig {
        period: Duration::from_millis(2),
        accepted: 0..=4095,
    };

    /// Sets the dispatcher's tick period to this preset's period.
    pub fn apply<const N: usize>(&self, dispatcher: &TickDispatcher<N>) -> Result<(), ConfigError> {
        dispatcher.configure(self.period)
    }
}
