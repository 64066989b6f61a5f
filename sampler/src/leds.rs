//! LED bar and switch bank on plain GPIO pins.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::bands::BandPattern;
use crate::command::{Switch, SwitchMask};

/// Which level lights an LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    ActiveHigh,
    /// The LEDs on the lab board light up when the pin is LOW.
    ActiveLow,
}

/// Drives the indicator lines of a [`BandPattern`].
pub trait IndicatorOutputs {
    fn show(&mut self, pattern: BandPattern);
}

/// `N` LEDs, LED 0 shows band 1.
pub struct LedBar<P: OutputPin, const N: usize> {
    leds: [P; N],
    polarity: Polarity,
}

impl<P: OutputPin, const N: usize> LedBar<P, N> {
    pub fn new(leds: [P; N], polarity: Polarity) -> Self {
        LedBar { leds, polarity }
    }

    pub fn set_pattern(&mut self, pattern: BandPattern) -> Result<(), P::Error> {
        for (line, pin) in self.leds.iter_mut().enumerate() {
            let on = pattern.is_on(line);
            let high = match self.polarity {
                Polarity::ActiveHigh => on,
                Polarity::ActiveLow => !on,
            };
            if high {
                pin.set_high()?;
            } else {
                pin.set_low()?;
            }
        }
        Ok(())
    }

    pub fn off(&mut self) -> Result<(), P::Error> {
        self.set_pattern(BandPattern::OFF)
    }
}

impl<P: OutputPin, const N: usize> IndicatorOutputs for LedBar<P, N> {
    fn show(&mut self, pattern: BandPattern) {
        if self.set_pattern(pattern).is_err() {
            warn!("failed to drive the LEDs");
        }
    }
}

/// Two active-low switches: the pin reads LOW while the switch is pressed.
pub struct SwitchBank<P: InputPin> {
    switches: [P; 2],
}

impl<P: InputPin> SwitchBank<P> {
    /// `switches[0]` is switch 1, `switches[1]` is switch 2.
    pub fn new(switches: [P; 2]) -> Self {
        SwitchBank { switches }
    }

    /// The switches pressed right now.
    pub fn read(&mut self) -> Result<SwitchMask, P::Error> {
        let mut mask = SwitchMask::NONE;
        for (pin, switch) in self.switches.iter_mut().zip(Switch::ALL) {
            if pin.is_low()? {
                mask = mask.with(switch);
            }
        }
        Ok(mask)
    }
}
