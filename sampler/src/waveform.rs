//! Sample tables for the DAC output.

/// One period of a sine wave in 50 samples, 12 bits, centred on 2047.
///
/// Stepped at 500 Hz this plays a 10 Hz sine.
pub static SINE_50: [u16; 50] = [
    2047, 2304, 2556, 2801, 3033, 3250, 3448, 3624, 3775, 3899, 3994, 4058, 4090, 4090, 4058,
    3994, 3899, 3775, 3624, 3448, 3250, 3033, 2801, 2556, 2304, 2047, 1790, 1538, 1293, 1061, 844,
    646, 470, 319, 195, 100, 36, 4, 4, 36, 100, 195, 319, 470, 646, 844, 1061, 1293, 1538, 1790,
];

/// Plays a sample table in a loop, one sample per call.
#[derive(Debug, Clone)]
pub struct Waveform<'a> {
    samples: &'a [u16],
    position: usize,
}

impl<'a> Waveform<'a> {
    /// # Panics
    ///
    /// If `samples` is empty.
    pub fn new(samples: &'a [u16]) -> Self {
        assert!(!samples.is_empty(), "a waveform needs at least one sample");
        Waveform {
            samples,
            position: 0,
        }
    }

    /// Returns the current sample and moves to the next one, going back to
    /// the first after the last.
    pub fn next_sample(&mut self) -> u16 {
        let sample = self.samples[self.position];
        self.position = (self.position + 1) % self.samples.len();
        sample
    }

    /// Samples per period.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
