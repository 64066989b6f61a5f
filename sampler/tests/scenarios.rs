//! End-to-end runs of the command listener and the three periodic tasks
//! against mock LEDs, a mock BCD display and a mock serial port.
//!
//! Most scenarios step the tasks in a fixed order, one period at a time (see
//! [`run`]). `concurrent_tasks_settle_on_the_last_reading` runs the real
//! `run` loops instead, with the readers polled ahead of the sampler.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;

use embassy_futures::{block_on, join::join5, yield_now};
use embedded_hal::digital::{ErrorType, OutputPin};
use sampler::bands::DISTANCE_BANDS;
use sampler::bcd::{BLANK, BcdDisplay};
use sampler::command::{CommandListener, CommandQueue, Switch, SwitchMask};
use sampler::config::SamplerConfig;
use sampler::dispatcher::{StopSignal, TickDispatcher};
use sampler::error::SensorFault;
use sampler::leds::{LedBar, Polarity};
use sampler::report::{ReadingFormat, SerialReport};
use sampler::state::MeasurementState;
use sampler::tasks::{Indicator, Reporter, Sampler, Sensor};

#[derive(Debug, Clone, Copy)]
enum Step {
    Byte(u8),
    Switches(SwitchMask),
    Tick,
}

use Step::{Byte, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shown {
    /// Nothing latched yet.
    Unset,
    Blank,
    Number(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Period {
    reading: u16,
    leds: [bool; 3],
    display: Shown,
}

struct Outcome {
    periods: Vec<Period>,
    serial: String,
    sensor_calls: usize,
    sensor_faults: u32,
}

struct ScriptedSensor<'a> {
    readings: VecDeque<u16>,
    calls: &'a Cell<usize>,
}

impl Sensor for ScriptedSensor<'_> {
    async fn acquire(&mut self) -> Result<u16, SensorFault> {
        self.calls.set(self.calls.get() + 1);
        self.readings.pop_front().ok_or(SensorFault::Timeout)
    }
}

/// Active-low LED line.
struct LedPin<'a> {
    line: usize,
    levels: &'a RefCell<[bool; 3]>,
}

impl ErrorType for LedPin<'_> {
    type Error = Infallible;
}

impl OutputPin for LedPin<'_> {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut()[self.line] = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut()[self.line] = true;
        Ok(())
    }
}

/// The display's data and latch lines, decoded the way the digit decoders
/// latch them.
#[derive(Default)]
struct Bus {
    data: [bool; 4],
    latch: [bool; 3],
    digits: [Option<u8>; 3],
}

impl Bus {
    fn shown(&self) -> Shown {
        match self.digits {
            [Some(BLANK), Some(BLANK), Some(BLANK)] => Shown::Blank,
            [Some(a), Some(b), Some(c)] if a <= 9 && b <= 9 && c <= 9 => {
                Shown::Number(a as u16 * 100 + b as u16 * 10 + c as u16)
            }
            _ => Shown::Unset,
        }
    }
}

enum Line {
    Data(usize),
    Latch(usize),
}

struct BusPin<'a> {
    line: Line,
    bus: &'a RefCell<Bus>,
}

impl BusPin<'_> {
    fn set(&mut self, level: bool) {
        let mut bus = self.bus.borrow_mut();
        match self.line {
            Line::Data(bit) => bus.data[bit] = level,
            Line::Latch(digit) => {
                if bus.latch[digit] && !level {
                    let nibble = bus
                        .data
                        .iter()
                        .enumerate()
                        .fold(0u8, |acc, (bit, &on)| acc | ((on as u8) << bit));
                    bus.digits[digit] = Some(nibble);
                }
                bus.latch[digit] = level;
            }
        }
    }
}

impl ErrorType for BusPin<'_> {
    type Error = Infallible;
}

impl OutputPin for BusPin<'_> {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.set(true);
        Ok(())
    }
}

struct Port<'a>(&'a RefCell<Vec<u8>>);

impl embedded_io_async::ErrorType for Port<'_> {
    type Error = Infallible;
}

impl embedded_io_async::Write for Port<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
}

fn scripted_sensor<'a>(readings: &[u16], calls: &'a Cell<usize>) -> ScriptedSensor<'a> {
    ScriptedSensor {
        readings: readings.iter().copied().collect(),
        calls,
    }
}

fn led_bar(levels: &RefCell<[bool; 3]>) -> LedBar<LedPin<'_>, 3> {
    LedBar::new(
        core::array::from_fn(|line| LedPin { line, levels }),
        Polarity::ActiveLow,
    )
}

fn bcd_display(bus: &RefCell<Bus>) -> BcdDisplay<BusPin<'_>, 3> {
    BcdDisplay::new(
        core::array::from_fn(|bit| BusPin {
            line: Line::Data(bit),
            bus,
        }),
        core::array::from_fn(|digit| BusPin {
            line: Line::Latch(digit),
            bus,
        }),
    )
}

/// LEDs that are lit, from the active-low pin levels.
fn lit(levels: &RefCell<[bool; 3]>) -> [bool; 3] {
    (*levels.borrow()).map(|level| !level)
}

/// LEDs lit for a mapped distance.
fn band_leds(reading: u16) -> [bool; 3] {
    let pattern = DISTANCE_BANDS.lookup(reading).unwrap();
    core::array::from_fn(|line| pattern.is_on(line))
}

/// Wires the distance-measurement exercise together and plays `steps`.
///
/// A `Tick` applies the queued commands, then runs one sampler step, one
/// indicator step and one reporter step, in that order. That order is the
/// barrier that makes a period's outputs show the reading stored in the
/// same period: the tasks running on their own do not promise it (see
/// `concurrent_tasks_settle_on_the_last_reading`).
fn run(readings: &[u16], steps: &[Step]) -> Outcome {
    let config = SamplerConfig::DISTANCE;
    let state = MeasurementState::new();
    let dispatcher: TickDispatcher<3> = TickDispatcher::new(config.period);
    let queue = CommandQueue::new();

    let calls = Cell::new(0);
    // HIGH is off for the board LEDs.
    let levels = RefCell::new([true; 3]);
    let bus = RefCell::new(Bus::default());
    let serial = RefCell::new(Vec::new());

    let mut listener = CommandListener::new(&queue, state.control_writer().unwrap());
    let mut sampler = Sampler::new(
        dispatcher.subscribe().unwrap(),
        state.reader(),
        state.reading_writer().unwrap(),
        scripted_sensor(readings, &calls),
        config.accepted,
    );
    let mut indicator = Indicator::new(
        dispatcher.subscribe().unwrap(),
        state.reader(),
        DISTANCE_BANDS,
        led_bar(&levels),
    );
    let mut reporter = Reporter::new(
        dispatcher.subscribe().unwrap(),
        state.reader(),
        (
            bcd_display(&bus),
            SerialReport::new(Port(&serial), ReadingFormat::Unit("cm")),
        ),
    );

    let mut periods = Vec::new();
    for step in steps {
        match *step {
            Step::Byte(byte) => queue.post_byte(byte),
            Step::Switches(mask) => queue.post_switches(mask),
            Step::Tick => {
                listener.drain();
                // Faults show up in the fault counter.
                let _ = block_on(sampler.step());
                indicator.step();
                block_on(reporter.step());
                periods.push(Period {
                    reading: state.reader().latest_reading(),
                    leds: lit(&levels),
                    display: bus.borrow().shown(),
                });
            }
        }
    }

    let serial = String::from_utf8(serial.borrow().clone()).unwrap();
    Outcome {
        periods,
        serial,
        sensor_calls: calls.get(),
        sensor_faults: state.reader().sensor_faults(),
    }
}

#[test]
fn readings_walk_through_the_bands() {
    let outcome = run(&[5, 15, 25, 35], &[Byte(b'O'), Tick, Tick, Tick, Tick]);

    let leds: Vec<[bool; 3]> = outcome.periods.iter().map(|p| p.leds).collect();
    assert_eq!(
        leds,
        [
            [false, false, false],
            [true, false, false],
            [true, true, false],
            [true, true, true],
        ]
    );
    let shown: Vec<Shown> = outcome.periods.iter().map(|p| p.display).collect();
    assert_eq!(
        shown,
        [
            Shown::Number(5),
            Shown::Number(15),
            Shown::Number(25),
            Shown::Number(35),
        ]
    );
    assert_eq!(outcome.serial, "5 cm\r\n15 cm\r\n25 cm\r\n35 cm\r\n");
}

#[test]
fn thirty_centimetres_keeps_the_previous_leds() {
    let outcome = run(&[25, 30, 31], &[Byte(b'O'), Tick, Tick, Tick]);

    assert_eq!(outcome.periods[0].leds, [true, true, false]);
    assert_eq!(outcome.periods[1].leds, [true, true, false]);
    assert_eq!(outcome.periods[1].display, Shown::Number(30));
    assert_eq!(outcome.periods[2].leds, [true, true, true]);
}

#[test]
fn toggling_measurement_off_blanks_everything() {
    let outcome = run(
        &[35, 12],
        &[Byte(b'O'), Tick, Byte(b'O'), Tick, Tick, Byte(b'O'), Tick],
    );

    assert_eq!(
        outcome.periods[0],
        Period {
            reading: 35,
            leds: [true, true, true],
            display: Shown::Number(35),
        }
    );
    for period in &outcome.periods[1..3] {
        assert_eq!(
            *period,
            Period {
                reading: 35,
                leds: [false, false, false],
                display: Shown::Blank,
            }
        );
    }
    assert_eq!(
        outcome.periods[3],
        Period {
            reading: 12,
            leds: [true, false, false],
            display: Shown::Number(12),
        }
    );
    assert_eq!(outcome.sensor_calls, 2);
    assert_eq!(outcome.serial, "35 cm\r\n12 cm\r\n");
}

#[test]
fn hold_freezes_the_display_but_not_the_leds() {
    let outcome = run(
        &[12, 25, 35, 5],
        &[Byte(b'O'), Tick, Byte(b'H'), Tick, Tick, Byte(b'H'), Tick],
    );

    let display: Vec<Shown> = outcome.periods.iter().map(|p| p.display).collect();
    assert_eq!(
        display,
        [
            Shown::Number(12),
            Shown::Number(12),
            Shown::Number(12),
            Shown::Number(5),
        ]
    );
    assert_eq!(outcome.periods[1].reading, 25);
    assert_eq!(outcome.periods[1].leds, [true, true, false]);
    assert_eq!(outcome.periods[2].reading, 35);
    assert_eq!(outcome.periods[2].leds, [true, true, true]);
    assert_eq!(outcome.serial, "12 cm\r\n5 cm\r\n");
}

#[test]
fn nothing_is_shown_while_measurement_is_off() {
    let outcome = run(&[5, 15], &[Tick, Tick, Byte(b'H'), Tick, Byte(b'x'), Tick]);

    for period in &outcome.periods {
        assert_eq!(period.display, Shown::Blank);
        assert_eq!(period.leds, [false, false, false]);
        assert_eq!(period.reading, 0);
    }
    assert_eq!(outcome.sensor_calls, 0);
    assert!(outcome.serial.is_empty());
}

#[test]
fn switches_and_serial_bytes_are_interchangeable() {
    let switch = run(
        &[15],
        &[Step::Switches(SwitchMask::NONE.with(Switch::One)), Tick],
    );
    let byte = run(&[15], &[Byte(b'O'), Tick]);
    assert_eq!(switch.periods, byte.periods);
    assert_eq!(switch.serial, byte.serial);

    // Both switches at once: measurement and hold both turn on, so the
    // display is never written.
    let both = run(
        &[15],
        &[
            Step::Switches(SwitchMask::NONE.with(Switch::One).with(Switch::Two)),
            Tick,
        ],
    );
    assert_eq!(
        both.periods[0],
        Period {
            reading: 15,
            leds: [true, false, false],
            display: Shown::Unset,
        }
    );
    assert!(both.serial.is_empty());
}

#[test]
fn faulty_readings_keep_the_last_good_one() {
    // 900 cm is out of range, then the sensor stops answering.
    let outcome = run(&[20, 900], &[Byte(b'O'), Tick, Tick, Tick]);

    for period in &outcome.periods {
        assert_eq!(period.reading, 20);
        assert_eq!(period.display, Shown::Number(20));
    }
    assert_eq!(outcome.sensor_calls, 3);
    assert_eq!(outcome.sensor_faults, 2);
    assert_eq!(outcome.serial, "20 cm\r\n20 cm\r\n20 cm\r\n");
}

#[test]
fn concurrent_tasks_settle_on_the_last_reading() {
    let readings = [5, 15, 25, 35];
    let config = SamplerConfig::DISTANCE;
    let state = MeasurementState::new();
    let dispatcher: TickDispatcher<3> = TickDispatcher::new(config.period);
    let queue = CommandQueue::new();
    let stop: [StopSignal; 4] = core::array::from_fn(|_| StopSignal::new());

    let calls = Cell::new(0);
    let levels = RefCell::new([true; 3]);
    let bus = RefCell::new(Bus::default());
    let serial = RefCell::new(Vec::new());

    let listener = CommandListener::new(&queue, state.control_writer().unwrap());
    let sampler = Sampler::new(
        dispatcher.subscribe().unwrap(),
        state.reader(),
        state.reading_writer().unwrap(),
        scripted_sensor(&readings, &calls),
        config.accepted,
    );
    let indicator = Indicator::new(
        dispatcher.subscribe().unwrap(),
        state.reader(),
        DISTANCE_BANDS,
        led_bar(&levels),
    );
    let reporter = Reporter::new(
        dispatcher.subscribe().unwrap(),
        state.reader(),
        (
            bcd_display(&bus),
            SerialReport::new(Port(&serial), ReadingFormat::Unit("cm")),
        ),
    );

    dispatcher.start();
    let mut periods = Vec::new();
    let driver = async {
        queue.post_byte(b'O');
        yield_now().await;
        // One period per reading, then one more once the sensor has
        // nothing left to give.
        for _ in 0..=readings.len() {
            dispatcher.tick();
            yield_now().await;
            periods.push((lit(&levels), bus.borrow().shown()));
        }
        for signal in &stop {
            signal.signal(());
        }
    };

    block_on(join5(
        reporter.run(&stop[0]),
        indicator.run(&stop[1]),
        sampler.run(&stop[2]),
        listener.run(&stop[3]),
        driver,
    ));

    // Within a period the indicator and the display may still show the
    // reading from the period before.
    for (period, &(leds, shown)) in periods.iter().take(readings.len()).enumerate() {
        let current = readings[period];
        let previous = period.checked_sub(1).map_or(0, |p| readings[p]);
        assert!(
            leds == band_leds(current) || leds == band_leds(previous),
            "period {period}: leds {leds:?}"
        );
        assert!(
            shown == Shown::Number(current) || shown == Shown::Number(previous),
            "period {period}: display {shown:?}"
        );
    }

    assert_eq!(periods.last(), Some(&([true, true, true], Shown::Number(35))));
    let serial = String::from_utf8(serial.borrow().clone()).unwrap();
    assert_eq!(serial.lines().count(), readings.len() + 1);
    assert!(serial.ends_with("35 cm\r\n"), "{serial:?}");
    assert_eq!(state.reader().latest_reading(), 35);
    assert_eq!(state.reader().sensor_faults(), 1);
    assert_eq!(calls.get(), readings.len() + 1);
    assert_eq!(dispatcher.missed_ticks(), 0);
    assert_eq!(dispatcher.ticks(), readings.len() as u32 + 1);
}
