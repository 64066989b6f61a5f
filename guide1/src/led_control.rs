//! Turns one of the three board LEDs on, off, or blinks it.

use defmt::{Format, info, warn};
use embassy_stm32::gpio::Output;
use embassy_time::Timer;

/// The delay step used while waiting between toggles.
pub const BLINK_STEP_MS: u16 = 100;

#[derive(Clone, Copy, PartialEq, Eq, Format)]
pub enum LedMode {
    On,
    Off,
    /// Toggle the LED `cycles` times, waiting `period_ms` after each
    /// toggle.
    Toggle,
}

/// What to do with which LED.
#[derive(Clone, Copy, Format)]
pub struct LedControl {
    pub mode: LedMode,
    /// LED number, from 1 to 3.
    pub led: u8,
    pub cycles: u8,
    pub period_ms: u16,
}

impl LedControl {
    /// Applies the control to `leds` (LED 1 is `leds[0]`).
    ///
    /// The LEDs on the lab board are active LOW: they light up when the
    /// pin is LOW and turn off when the pin is HIGH.
    pub async fn apply(&self, leds: &mut [Output<'_>; 3]) {
        let Some(led) = (self.led as usize)
            .checked_sub(1)
            .and_then(|index| leds.get_mut(index))
        else {
            warn!("There is no LED {}", self.led);
            return;
        };

        match self.mode {
            LedMode::On => led.set_low(),
            LedMode::Off => led.set_high(),
            LedMode::Toggle => {
                for cycle in 0..self.cycles {
                    led.toggle();
                    info!("LED {} toggle {}/{}", self.led, cycle + 1, self.cycles);

                    // The period is waited in `BLINK_STEP_MS` steps, a
                    // period that is not a multiple of the step is rounded
                    // down.
                    for _ in 0..self.period_ms / BLINK_STEP_MS {
                        Timer::after_millis(BLINK_STEP_MS as u64).await;
                    }
                }
            }
        }
    }
}
