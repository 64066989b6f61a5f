//! Shared measurement state.
//!
//! The state is a handful of atomics that live for the whole program,
//! usually in a `static`. Nobody touches the atomics directly: tasks get
//! typed handles instead.
//!
//! - [`StateReader`] can be copied freely and only loads values.
//! - [`ReadingWriter`] is the only way to store a reading. There is at most
//!   one, and it belongs to the sampler.
//! - [`ControlWriter`] is the only way to flip the control flags. There is
//!   at most one, and it belongs to the command listener.
//!
//! Every field has a single writer, so plain loads and stores are enough;
//! the flag toggles are a single `fetch_xor`, so two toggles arriving back
//! to back are never merged into one.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use crate::command::Command;

pub struct MeasurementState {
    latest_reading: AtomicU16,
    sampling_enabled: AtomicBool,
    hold_enabled: AtomicBool,
    sensor_faults: AtomicU32,
    reading_writer_taken: AtomicBool,
    control_writer_taken: AtomicBool,
}

/// A consistent-enough copy of the state.
///
/// Each field is loaded on its own, so a snapshot taken while a command is
/// being applied may mix the old and the new value of different fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Snapshot {
    pub latest_reading: u16,
    pub sampling_enabled: bool,
    pub hold_enabled: bool,
}

impl MeasurementState {
    /// Sampling and hold start disabled, the reading starts at 0.
    pub const fn new() -> Self {
        MeasurementState {
            latest_reading: AtomicU16::new(0),
            sampling_enabled: AtomicBool::new(false),
            hold_enabled: AtomicBool::new(false),
            sensor_faults: AtomicU32::new(0),
            reading_writer_taken: AtomicBool::new(false),
            control_writer_taken: AtomicBool::new(false),
        }
    }

    pub fn reader(&self) -> StateReader<'_> {
        StateReader { state: self }
    }

    /// Returns the reading writer the first time it is called, `None`
    /// afterwards.
    pub fn reading_writer(&self) -> Option<ReadingWriter<'_>> {
        if self.reading_writer_taken.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(ReadingWriter { state: self })
        }
    }

    /// Returns the control writer the first time it is called, `None`
    /// afterwards.
    pub fn control_writer(&self) -> Option<ControlWriter<'_>> {
        if self.control_writer_taken.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(ControlWriter { state: self })
        }
    }
}

impl Default for MeasurementState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
pub struct StateReader<'a> {
    state: &'a MeasurementState,
}

impl StateReader<'_> {
    /// The last stored reading. It is stale while sampling is disabled.
    pub fn latest_reading(&self) -> u16 {
        self.state.latest_reading.load(Ordering::Acquire)
    }

    pub fn sampling_enabled(&self) -> bool {
        self.state.sampling_enabled.load(Ordering::Acquire)
    }

    pub fn hold_enabled(&self) -> bool {
        self.state.hold_enabled.load(Ordering::Acquire)
    }

    /// Number of readings rejected since start-up.
    pub fn sensor_faults(&self) -> u32 {
        self.state.sensor_faults.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            latest_reading: self.latest_reading(),
            sampling_enabled: self.sampling_enabled(),
            hold_enabled: self.hold_enabled(),
        }
    }
}

pub struct ReadingWriter<'a> {
    state: &'a MeasurementState,
}

impl ReadingWriter<'_> {
    pub fn store(&mut self, reading: u16) {
        self.state.latest_reading.store(reading, Ordering::Release);
    }

    pub fn record_fault(&mut self) {
        self.state.sensor_faults.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct ControlWriter<'a> {
    state: &'a MeasurementState,
}

impl ControlWriter<'_> {
    /// Flips the sampling flag and returns its new value.
    pub fn toggle_sampling(&mut self) -> bool {
        !self.state.sampling_enabled.fetch_xor(true, Ordering::AcqRel)
    }

    /// Flips the hold flag and returns its new value.
    pub fn toggle_hold(&mut self) -> bool {
        !self.state.hold_enabled.fetch_xor(true, Ordering::AcqRel)
    }

    /// Applies a command and returns the new value of the flag it flipped.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::ToggleMeasurement => self.toggle_sampling(),
            Command::ToggleHold => self.toggle_hold(),
        }
    }
}
