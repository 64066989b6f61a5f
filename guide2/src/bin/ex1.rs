#![no_std]
#![no_main]

use defmt::info;
use defmt_rtt as _;
use embassy_executor::{Spawner, task};
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use guide2::hcsr04::Hcsr04;
use panic_probe as _;
use sampler::{
    bands::DISTANCE_BANDS,
    bcd::BcdDisplay,
    command::{CommandListener, CommandQueue},
    config::SamplerConfig,
    dispatcher::{StopSignal, TickDispatcher, TickSubscription, Wake},
    leds::{LedBar, Polarity, SwitchBank},
    state::MeasurementState,
    tasks::{Indicator, Reporter, Sampler},
};

type DistanceSensor = Hcsr04<Output<'static>, Input<'static>>;
type Leds = LedBar<Output<'static>, 3>;
type Display = BcdDisplay<Output<'static>, 3>;

/// Latest distance and the measurement / hold flags.
static STATE: MeasurementState = MeasurementState::new();

/// Releases the sampler, the indicator, the display and the switch poller
/// once a second.
static DISPATCHER: TickDispatcher<4> = TickDispatcher::new(SamplerConfig::DISTANCE.period);

static COMMANDS: CommandQueue = CommandQueue::new();

/// One stop signal per task. Nothing raises them in this exercise, the
/// tasks run forever.
static STOP: [StopSignal; 6] = [const { StopSignal::new() }; 6];

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

/// Task that reads the switches once every period and sends the command of
/// every pressed switch.
///
/// A switch has to be held down when the tick arrives to be seen, and a
/// switch held down over several ticks is seen several times.
#[task]
async fn poll_switches(mut switches: SwitchBank<Input<'static>>, release: TickSubscription<'static>) {
    while release.wait(&STOP[5]).await == Wake::Release {
        if let Ok(pressed) = switches.read() {
            COMMANDS.post_switches(pressed);
        }
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
    // Switch 1 (measurement on/off) is button S1 (PA8).
    // Switch 2 (hold) is button S3 (PA7).
    let switches = SwitchBank::new([
        Input::new(peripherals.PA8, Pull::None),
        Input::new(peripherals.PA7, Pull::None),
    ]);

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
    let display_data = [
        Output::new(peripherals.PC0, Level::Low, Speed::Low),
        Output::new(peripherals.PC1, Level::Low, Speed::Low),
        Output::new(peripherals.PC2, Level::Low, Speed::Low),
        Output::new(peripherals.PC3, Level::Low, Speed::Low),
    ];
    let display_latches = [
        Output::new(peripherals.PC4, Level::Low, Speed::Low),
        Output::new(peripherals.PC5, Level::Low, Speed::Low),
        Output::new(peripherals.PC8, Level::Low, Speed::Low),
    ];
    let lcd = BcdDisplay::new(display_data, display_latches);

    // The ultrasonic sensor's trigger is connected to D4 (PB5) and its echo
    // to D5 (PB4).
    let sensor = Hcsr04::new(
        Output::new(peripherals.PB5, Level::Low, Speed::Low),
        Input::new(peripherals.PB4, Pull::None),
    );

    // Every task gets its own subscription to the dispatcher's ticks, and
    // the handle it needs to the shared state. Only the sampler can store a
    // distance, and only the listener can change the flags.
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
    spawner
        .spawn(poll_switches(switches, DISPATCHER.subscribe().unwrap()))
        .unwrap();

    DISPATCHER.start();
    spawner.spawn(tick_source()).unwrap();
}
