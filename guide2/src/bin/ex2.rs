#![no_std]
#![no_main]

use async_debounce::Debouncer;
use defmt::info;
use defmt_rtt as _;
use embassy_executor::{Spawner, task};
use embassy_stm32::{
    exti::ExtiInput,
    gpio::{Input, Level, Output, Pull, Speed},
};
use embassy_time::Duration;
use embedded_hal_async::digital::Wait;
use guide2::hcsr04::Hcsr04;
use panic_probe as _;
use sampler::{
    bands::DISTANCE_BANDS,
    bcd::BcdDisplay,
    command::{CommandListener, CommandQueue, Switch},
    config::SamplerConfig,
    dispatcher::{StopSignal, TickDispatcher},
    leds::{LedBar, Polarity},
    state::MeasurementState,
    tasks::{Indicator, Reporter, Sampler},
};

type DistanceSensor = Hcsr04<Output<'static>, Input<'static>>;
type Leds = LedBar<Output<'static>, 3>;
type Display = BcdDisplay<Output<'static>, 3>;

/// Time a button has to be stable for a press to count.
const DEBOUNCE_STABLE_PERIOD: Duration = Duration::from_millis(100);

static STATE: MeasurementState = MeasurementState::new();

/// Releases the sampler, the indicator and the display once a second.
static DISPATCHER: TickDispatcher<3> = TickDispatcher::new(SamplerConfig::DISTANCE.period);

static COMMANDS: CommandQueue = CommandQueue::new();

/// One stop signal per task. Nothing raises them in this exercise.
static STOP: [StopSignal; 5] = [const { StopSignal::new() }; 5];

#[task]
async fn tick_source() {
    DISPATCHER.run(&STOP[0]).await;
}

#[task]
async fn measure(sampler: Sampler<'static, DistanceSensor>) {
    sampler.run(&STOP[1]).await;
}

#[task]
async fn indicate(indicator: Indicator<'static, Leds>) {
    indicator.run(&STOP[2]).await;
}

#[task]
async fn display(reporter: Reporter<'static, Display>) {
    reporter.run(&STOP[3]).await;
}

#[task]
async fn listen(listener: CommandListener<'static>) {
    listener.run(&STOP[4]).await;
}

/// Task that waits for a press of `button` and sends the command of
/// `switch`.
///
/// The same task function is used for both switches, so the pool has
/// two slots.
#[task(pool_size = 2)]
async fn switch_presses(mut button: Debouncer<ExtiInput<'static>>, switch: Switch) {
    loop {
        // Wait for a button press
        button.wait_for_falling_edge().await.ok();

        info!("Switch {} pressed", switch);
        COMMANDS.post(switch.command());
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let peripherals = embassy_stm32::init(Default::default());
    info!("Device started");

    // The buttons on the lab board have an external pull up resistor (soldered
    // on the lab board), so the internal pull resistor is not needed.
    // Pull Up means that:
    //    - the pin's value is HIGH when the button is release
    //    - the pin's value is LOW when the button is pressed
    //
    // Buttons have to be debounced, otherwise the electrical noise of a
    // single press looks like several presses, and every one of them would
    // toggle the flag again.
    //
    // Switch 1 (measurement on/off) is button S1 (PA8).
    let switch_1 = Debouncer::new(
        ExtiInput::new(peripherals.PA8, peripherals.EXTI8, Pull::None),
        DEBOUNCE_STABLE_PERIOD,
    );
    // Switch 2 (hold) is button S3 (PA7).
    let switch_2 = Debouncer::new(
        ExtiInput::new(peripherals.PA7, peripherals.EXTI7, Pull::None),
        DEBOUNCE_STABLE_PERIOD,
    );

    // The LEDs on the lab board are active LOW: they light up when the pin is LOW
    // and turn off when the pin is HIGH. We set the initial value of the pin to HIGH
    // so that the LED are turned off when the pins are setup.
    //
    // LED 1 is D8 (PC7), LED 2 is D9 (PC6) and LED 3 is D10 (PC9).
    let leds = LedBar::new(
        [
            Output::new(peripherals.PC7, Level::High, Speed::Low),
            Output::new(peripherals.PC6, Level::High, Speed::Low),
            Output::new(peripherals.PC9, Level::High, Speed::Low),
        ],
        Polarity::ActiveLow,
    );

    // The display's data lines b0..b3 are connected to PC0..PC3 and the
    // latch lines of the 3 digits to PC4, PC5 and PC8.
    let lcd = BcdDisplay::new(
        [
            Output::new(peripherals.PC0, Level::Low, Speed::Low),
            Output::new(peripherals.PC1, Level::Low, Speed::Low),
            Output::new(peripherals.PC2, Level::Low, Speed::Low),
            Output::new(peripherals.PC3, Level::Low, Speed::Low),
        ],
        [
            Output::new(peripherals.PC4, Level::Low, Speed::Low),
            Output::new(peripherals.PC5, Level::Low, Speed::Low),
            Output::new(peripherals.PC8, Level::Low, Speed::Low),
        ],
    );

    // The ultrasonic sensor's trigger is connected to D4 (PB5) and its echo
    // to D5 (PB4).
    let sensor = Hcsr04::new(
        Output::new(peripherals.PB5, Level::Low, Speed::Low),
        Input::new(peripherals.PB4, Pull::None),
    );

    let sampler = Sampler::new(
        DISPATCHER.subscribe().unwrap(),
        STATE.reader(),
        STATE.reading_writer().unwrap(),
        sensor,
        SamplerConfig::DISTANCE.accepted,
    );
    let indicator = Indicator::new(
        DISPATCHER.subscribe().unwrap(),
        STATE.reader(),
        DISTANCE_BANDS,
        leds,
    );
    let reporter = Reporter::new(DISPATCHER.subscribe().unwrap(), STATE.reader(), lcd);
    let listener = CommandListener::new(&COMMANDS, STATE.control_writer().unwrap());

    spawner.spawn(measure(sampler)).unwrap();
    spawner.spawn(indicate(indicator)).unwrap();
    spawner.spawn(display(reporter)).unwrap();
    spawner.spawn(listen(listener)).unwrap();
    spawner.spawn(switch_presses(switch_1, Switch::One)).unwrap();
    spawner.spawn(switch_presses(switch_2, Switch::Two)).unwrap();

    // The dispatcher's tick source plays the role of the hardware timer:
    // once a second it releases the three periodic tasks.
    DISPATCHER.start();
    spawner.spawn(tick_source()).unwrap();
}
