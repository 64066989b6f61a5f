use core::fmt;

/// A reading the sampler refused to store.
///
/// The previous reading is kept whenever one of these comes back from a
/// sampler iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorFault {
    /// The sensor did not answer in time (for the ultrasonic sensor, the
    /// echo pulse never started or never ended).
    Timeout,
    /// The sensor answered with a value outside the accepted range.
    OutOfRange(u16),
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorFault::Timeout => f.write_str("sensor timed out"),
            SensorFault::OutOfRange(value) => write!(f, "reading {} out of range", value),
        }
    }
}

impl core::error::Error for SensorFault {}

/// Rejected tick period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    ZeroPeriod,
    /// The period does not fit in 32 bits of microseconds (about 71 minutes).
    PeriodTooLong,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroPeriod => f.write_str("tick period must not be zero"),
            ConfigError::PeriodTooLong => f.write_str("tick period too long"),
        }
    }
}

impl core::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BcdError {
    /// The number has more decimal digits than the output holds. The
    /// low-order digits were still written.
    Overflow,
}

impl fmt::Display for BcdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BcdError::Overflow => f.write_str("number does not fit in the digits"),
        }
    }
}

impl core::error::Error for BcdError {}
