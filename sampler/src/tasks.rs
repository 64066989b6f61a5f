//! The three periodic tasks.
//!
//! Each task waits for its tick release, does one iteration and goes back
//! to waiting. They are released by the same tick but run independently,
//! so in a given period the indicator and the reporter may see either the
//! reading the sampler just stored or the one from the period before.
//!
//! `step` runs one iteration without waiting, `run` is the task loop that
//! ends when its stop signal fires.

use core::ops::RangeInclusive;

use crate::bands::{BandPattern, BandTable, indicator_pattern};
use crate::dispatcher::{StopSignal, TickSubscription, Wake};
use crate::error::SensorFault;
use crate::leds::IndicatorOutputs;
use crate::report::{ReportAction, ReportSink, report_action};
use crate::state::{ReadingWriter, StateReader};

/// Something that produces one reading per call: the ultrasonic sensor
/// (centimetres) or an ADC channel (raw counts).
///
/// `acquire` may take a while (an ultrasonic round trip is tens of
/// milliseconds); only the sampler waits for it.
#[allow(async_fn_in_trait)]
pub trait Sensor {
    async fn acquire(&mut self) -> Result<u16, SensorFault>;
}

/// Stores a fresh reading once per release while sampling is enabled.
pub struct Sampler<'a, S: Sensor> {
    release: TickSubscription<'a>,
    reader: StateReader<'a>,
    writer: ReadingWriter<'a>,
    sensor: S,
    accepted: RangeInclusive<u16>,
}

impl<'a, S: Sensor> Sampler<'a, S> {
    pub fn new(
        release: TickSubscription<'a>,
        reader: StateReader<'a>,
        writer: ReadingWriter<'a>,
        sensor: S,
        accepted: RangeInclusive<u16>,
    ) -> Self {
        Sampler {
            release,
            reader,
            writer,
            sensor,
            accepted,
        }
    }

    /// One iteration: a single acquisition if sampling is enabled, none
    /// otherwise.
    ///
    /// Returns the stored reading, `Ok(None)` when sampling is disabled, or
    /// the fault that kept the previous reading in place.
    pub async fn step(&mut self) -> Result<Option<u16>, SensorFault> {
        if !self.reader.sampling_enabled() {
            return Ok(None);
        }

        let acquired = match self.sensor.acquire().await {
            Ok(reading) if self.accepted.contains(&reading) => Ok(reading),
            Ok(reading) => Err(SensorFault::OutOfRange(reading)),
            Err(fault) => Err(fault),
        };

        match acquired {
            Ok(reading) => {
                self.writer.store(reading);
                debug!("reading {}", reading);
                Ok(Some(reading))
            }
            Err(fault) => {
                self.writer.record_fault();
                warn!("sensor fault: {}, keeping the previous reading", fault);
                Err(fault)
            }
        }
    }

    pub async fn run(mut self, stop: &StopSignal) {
        while self.release.wait(stop).await == Wake::Release {
            // Faults are logged and counted by `step`.
            let _ = self.step().await;
        }
    }
}

/// Maps the latest reading to the indicator LEDs.
pub struct Indicator<'a, O: IndicatorOutputs> {
    release: TickSubscription<'a>,
    reader: StateReader<'a>,
    bands: BandTable<'a>,
    outputs: O,
}

impl<'a, O: IndicatorOutputs> Indicator<'a, O> {
    pub fn new(
        release: TickSubscription<'a>,
        reader: StateReader<'a>,
        bands: BandTable<'a>,
        outputs: O,
    ) -> Self {
        Indicator {
            release,
            reader,
            bands,
            outputs,
        }
    }

    /// One iteration. Returns the pattern shown, or `None` if the reading
    /// fell in an unmapped band and the outputs were left alone.
    pub fn step(&mut self) -> Option<BandPattern> {
        let pattern = indicator_pattern(
            &self.bands,
            self.reader.latest_reading(),
            self.reader.sampling_enabled(),
        );
        if let Some(pattern) = pattern {
            self.outputs.show(pattern);
        }
        pattern
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    pub async fn run(mut self, stop: &StopSignal) {
        while self.release.wait(stop).await == Wake::Release {
            self.step();
        }
    }
}

/// Sends the latest reading to the display and/or the serial port.
pub struct Reporter<'a, K: ReportSink> {
    release: TickSubscription<'a>,
    reader: StateReader<'a>,
    sink: K,
}

impl<'a, K: ReportSink> Reporter<'a, K> {
    pub fn new(release: TickSubscription<'a>, reader: StateReader<'a>, sink: K) -> Self {
        Reporter {
            release,
            reader,
            sink,
        }
    }

    pub async fn step(&mut self) -> ReportAction {
        let action = report_action(self.reader.sampling_enabled(), self.reader.hold_enabled());
        match action {
            ReportAction::Blank => self.sink.blank().await,
            ReportAction::Show => self.sink.report(self.reader.latest_reading()).await,
            ReportAction::Keep => {}
        }
        action
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub async fn run(mut self, stop: &StopSignal) {
        while self.release.wait(stop).await == Wake::Release {
            self.step().await;
        }
    }
}
