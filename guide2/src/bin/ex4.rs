#![no_std]
#![no_main]

use defmt::info;
use defmt_rtt as _;
use embassy_executor::{Spawner, task};
use embassy_stm32::{
    bind_interrupts,
    dac::{DacCh1, Value},
    mode::Async,
    peripherals,
    usart::{self, Uart, UartTx},
};
use guide2::light::LightSensor;
use panic_probe as _;
use sampler::{
    config::SamplerConfig,
    dispatcher::{StopSignal, TickDispatcher, Wake},
    report::{ReadingFormat, SerialReport},
    state::MeasurementState,
    tasks::{Reporter, Sampler},
    waveform::{SINE_50, Waveform},
};

type Serial = SerialReport<UartTx<'static, Async>>;

bind_interrupts!(struct Irqs {
    USART1 => usart::InterruptHandler<peripherals::USART1>;
});

/// Every sample is sent, so the serial link has to be fast enough to send a
/// line (at most 18 bytes) in less than a sampling period.
const BAUD_RATE: u32 = 115200;

static STATE: MeasurementState = MeasurementState::new();

/// Releases the sampler, the reporter and the waveform output every 2 ms
/// (500 Hz).
static DISPATCHER: TickDispatcher<3> = TickDispatcher::new(SamplerConfig::ANALOG.period);

/// One stop signal per task. Nothing raises them in this exercise.
static STOP: [StopSignal; 4] = [const { StopSignal::new() }; 4];

#[task]
async fn tick_source() {
    DISPATCHER.run(&STOP[0]).await;
}

#[task]
async fn sample(sampler: Sampler<'static, LightSensor>) {
    sampler.run(&STOP[1]).await;
}

#[task]
async fn report(reporter: Reporter<'static, Serial>) {
    reporter.run(&STOP[2]).await;
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let peripherals = embassy_stm32::init(Default::default());
    info!("Device started");

    // The light sensor is connected to A0 (PA0)
    let light = LightSensor::new(peripherals.ADC1, peripherals.PA0);

    // The ST-LINK's virtual serial port is connected to USART1:
    // - TX on PA9
    // - RX on PA10 (not used, this exercise only sends)
    let mut uart_config = usart::Config::default();
    uart_config.baudrate = BAUD_RATE;
    let uart = Uart::new(
        peripherals.USART1,
        peripherals.PA10,
        peripherals.PA9,
        Irqs,
        peripherals.GPDMA1_CH0,
        peripherals.GPDMA1_CH1,
        uart_config,
    )
    .unwrap();
    let (tx, _rx) = uart.split();

    // Samples are written as `>brightness:1234` lines, the format serial
    // plotters understand.
    let serial = SerialReport::new(tx, ReadingFormat::Plotter("brightness"));

    // DAC1 channel 1 outputs on PA4.
    let mut dac = DacCh1::new_blocking(peripherals.DAC1, peripherals.PA4);

    // There are no switches or serial commands in this exercise: sampling is
    // turned on once and stays on.
    let mut control = STATE.control_writer().unwrap();
    control.toggle_sampling();

    let sampler = Sampler::new(
        DISPATCHER.subscribe().unwrap(),
        STATE.reader(),
        STATE.reading_writer().unwrap(),
        light,
        SamplerConfig::ANALOG.accepted,
    );
    let reporter = Reporter::new(DISPATCHER.subscribe().unwrap(), STATE.reader(), serial);
    let release = DISPATCHER.subscribe().unwrap();

    spawner.spawn(sample(sampler)).unwrap();
    spawner.spawn(report(reporter)).unwrap();

    DISPATCHER.start();
    spawner.spawn(tick_source()).unwrap();

    // The main task plays the sine wave on the DAC, one sample per tick.
    // 50 samples at 500 Hz is a 10 Hz sine.
    let mut sine = Waveform::new(&SINE_50);
    while release.wait(&STOP[3]).await == Wake::Release {
        dac.set(Value::Bit12Right(sine.next_sample()));
    }
}
