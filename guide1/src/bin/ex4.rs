#![no_std]
#![no_main]

use defmt::{info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_time::Timer;
use panic_probe as _;
use sampler::bcd::{BcdDisplay, to_bcd_digits};

/// The number shown on the display.
const NUMBER: u32 = 785;

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let peripherals = embassy_stm32::init(Default::default());
    info!("Device started");

    // The display has a BCD to 7 segment decoder for every digit. The
    // decoders share the 4 data lines and each one has its own latch line:
    // a digit stores the data lines when its latch line goes from HIGH to
    // LOW.
    //
    // The data lines b0..b3 are connected to PC0, PC1, PC2 and PC3.
    let data = [
        Output::new(peripherals.PC0, Level::Low, Speed::Low),
        Output::new(peripherals.PC1, Level::Low, Speed::Low),
        Output::new(peripherals.PC2, Level::Low, Speed::Low),
        Output::new(peripherals.PC3, Level::Low, Speed::Low),
    ];

    // The latch lines, from the most significant digit to the least
    // significant one, are connected to PC4, PC5 and PC8.
    let latches = [
        Output::new(peripherals.PC4, Level::Low, Speed::Low),
        Output::new(peripherals.PC5, Level::Low, Speed::Low),
        Output::new(peripherals.PC8, Level::Low, Speed::Low),
    ];

    let mut display: BcdDisplay<_, 3> = BcdDisplay::new(data, latches);

    // Display the digits that are sent to the display
    let mut digits = [0u8; 3];
    if to_bcd_digits(NUMBER, &mut digits).is_err() {
        warn!("{} does not fit on the display", NUMBER);
    }
    info!("{} is {} in BCD", NUMBER, digits);

    // Writing to the STM32 pins never fails (the error type is `Infallible`).
    display.show(NUMBER).unwrap();

    loop {
        Timer::after_secs(1).await;
    }
}
