//! Where the reporter sends readings: the BCD display, the serial port, or
//! both.

use core::fmt::Write as _;

use embedded_hal::digital::OutputPin;
use embedded_io_async::Write;
use heapless::String;

use crate::bcd::BcdDisplay;

/// Longest serial line a reading is formatted into.
pub const LINE_CAPACITY: usize = 32;

/// What the reporter does with the latest reading in one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportAction {
    /// Sampling is off: switch the display off, send nothing.
    Blank,
    /// Sampling is on and not held: show the reading.
    Show,
    /// Sampling is on and held: leave the last value where it is.
    Keep,
}

pub fn report_action(sampling_enabled: bool, hold_enabled: bool) -> ReportAction {
    match (sampling_enabled, hold_enabled) {
        (false, _) => ReportAction::Blank,
        (true, false) => ReportAction::Show,
        (true, true) => ReportAction::Keep,
    }
}

/// A place readings are reported to.
///
/// Sinks handle their own write errors (they log them), a failed write only
/// affects the current iteration.
#[allow(async_fn_in_trait)]
pub trait ReportSink {
    async fn report(&mut self, reading: u16);

    async fn blank(&mut self);
}

impl<P: OutputPin, const D: usize> ReportSink for BcdDisplay<P, D> {
    async fn report(&mut self, reading: u16) {
        if self.show(reading as u32).is_err() {
            warn!("failed to write the display");
        }
    }

    async fn blank(&mut self) {
        if self.set_off().is_err() {
            warn!("failed to switch the display off");
        }
    }
}

/// Reports to both sinks, `A` first.
impl<A: ReportSink, B: ReportSink> ReportSink for (A, B) {
    async fn report(&mut self, reading: u16) {
        self.0.report(reading).await;
        self.1.report(reading).await;
    }

    async fn blank(&mut self) {
        self.0.blank().await;
        self.1.blank().await;
    }
}

/// How a reading is written on the serial port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadingFormat {
    /// `25 cm\r\n`
    Unit(&'static str),
    /// `>brightness:25\r\n`, the format serial plotters read.
    Plotter(&'static str),
}

/// Formats one serial line.
///
/// Returns `None` if the line does not fit in [`LINE_CAPACITY`] bytes.
pub fn format_line(format: ReadingFormat, reading: u16) -> Option<String<LINE_CAPACITY>> {
    let mut line = String::new();
    let written = match format {
        ReadingFormat::Unit(unit) => write!(line, "{} {}\r\n", reading, unit),
        ReadingFormat::Plotter(label) => write!(line, ">{}:{}\r\n", label, reading),
    };
    written.ok().map(|()| line)
}

/// Reports readings as text lines on a serial port.
///
/// Blanking sends nothing.
pub struct SerialReport<W: Write> {
    port: W,
    format: ReadingFormat,
}

impl<W: Write> SerialReport<W> {
    pub fn new(port: W, format: ReadingFormat) -> Self {
        SerialReport { port, format }
    }

    pub fn into_inner(self) -> W {
        self.port
    }
}

impl<W: Write> ReportSink for SerialReport<W> {
    async fn report(&mut self, reading: u16) {
        let Some(line) = format_line(self.format, reading) else {
            warn!("serial line too long for {}", reading);
            return;
        };
        if self.port.write_all(line.as_bytes()).await.is_err() {
            warn!("serial write failed");
        }
    }

    async fn blank(&mut self) {}
}
