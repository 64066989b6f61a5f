#![no_std]
#![no_main]

use defmt::info;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Level, Output, Speed};
use guide1::led_control::{LedControl, LedMode};
use panic_probe as _;

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let peripherals = embassy_stm32::init(Default::default());
    info!("Device started");

    // The LEDs on the lab board are active LOW: they light up when the pin is LOW
    // and turn off when the pin is HIGH. We set the initial value of the pin to HIGH
    // so that the LED are turned off when the pins are setup.
    let mut leds = [
        // LED 1 is connected to D8 (PC7).
        Output::new(peripherals.PC7, Level::High, Speed::Low),
        // LED 2 is connected to D9 (PC6).
        Output::new(peripherals.PC6, Level::High, Speed::Low),
        // LED 3 is connected to D10 (PC9).
        Output::new(peripherals.PC9, Level::High, Speed::Low),
    ];

    // Blink LED 2: 10 toggles (5 blinks), 500 ms apart.
    let control = LedControl {
        mode: LedMode::Toggle,
        led: 2,
        cycles: 10,
        period_ms: 500,
    };
    info!("Applying {}", control);
    control.apply(&mut leds).await;

    info!("Done");
}
