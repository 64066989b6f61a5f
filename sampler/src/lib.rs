//! Periodic sampler core for the lab board exercises.
//!
//! A [`dispatcher::TickDispatcher`] releases three tasks once per period:
//!
//! - the [`tasks::Sampler`] reads a [`tasks::Sensor`] and stores the reading
//!   in the shared [`state::MeasurementState`],
//! - the [`tasks::Indicator`] maps the reading to LEDs through a
//!   [`bands::BandTable`],
//! - the [`tasks::Reporter`] shows it on a BCD display or sends it over a
//!   serial port.
//!
//! Switches and serial bytes become [`command::Command`]s; the
//! [`command::CommandListener`] is the only place the sampling and hold
//! flags change.
//!
//! Hardware is reached through `embedded-hal` and `embedded-io-async`
//! traits only. Enable the `defmt` feature to get log output.
#![cfg_attr(not(test), no_std)]

// Declared first so the other modules see its macros.
mod fmt;

pub mod bands;
pub mod bcd;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod leds;
pub mod report;
pub mod state;
pub mod tasks;
pub mod waveform;
