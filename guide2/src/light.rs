//! Light sensor read through ADC1.

use embassy_stm32::{
    Peri,
    adc::{Adc, Resolution},
    peripherals::{ADC1, PA0},
};
use sampler::{error::SensorFault, tasks::Sensor};

/// Photoresistor on A0 (PA0), read as a 12 bit value (0 to 4095).
pub struct LightSensor {
    adc: Adc<'static, ADC1>,
    pin: Peri<'static, PA0>,
}

impl LightSensor {
    pub fn new(adc1: Peri<'static, ADC1>, pin: Peri<'static, PA0>) -> Self {
        let mut adc = Adc::new(adc1);
        // 12 bits, so the readings go from 0 to 4095
        adc.set_resolution(Resolution::BITS12);
        LightSensor { adc, pin }
    }
}

impl Sensor for LightSensor {
    async fn acquire(&mut self) -> Result<u16, SensorFault> {
        // A single conversion is a few microseconds, so it is read
        // blocking.
        Ok(self.adc.blocking_read(&mut self.pin))
    }
}
