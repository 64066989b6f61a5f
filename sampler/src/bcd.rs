//! Decimal to BCD conversion and a multi-digit BCD display driver.
//!
//! The display takes one BCD nibble on four data lines (b0..b3) shared by
//! all digits, and has one latch line per digit. Each digit's decoder
//! latches the data lines when its latch line goes high then low. Nibbles
//! above 9 blank the digit.

use embedded_hal::digital::OutputPin;

use crate::error::BcdError;

/// Nibble that blanks a digit.
pub const BLANK: u8 = 0x0f;

/// Splits `value` into decimal digits, most significant first, padded with
/// leading zeros to `digits.len()`.
///
/// If `value` has more decimal digits than fit, the low-order ones are
/// written and [`BcdError::Overflow`] is returned.
pub fn to_bcd_digits(value: u32, digits: &mut [u8]) -> Result<(), BcdError> {
    let mut rest = value;
    for digit in digits.iter_mut().rev() {
        *digit = (rest % 10) as u8;
        rest /= 10;
    }
    if rest == 0 {
        Ok(())
    } else {
        Err(BcdError::Overflow)
    }
}

/// BCD display with `D` digits, digit 0 being the most significant.
pub struct BcdDisplay<P: OutputPin, const D: usize> {
    data: [P; 4],
    latches: [P; D],
}

impl<P: OutputPin, const D: usize> BcdDisplay<P, D> {
    /// `data` is b0..b3, `latches` goes from the most significant digit to
    /// the least significant one.
    pub fn new(data: [P; 4], latches: [P; D]) -> Self {
        BcdDisplay { data, latches }
    }

    /// Shows `value`, zero padded.
    ///
    /// Numbers that do not fit are not shown; the display keeps what it had
    /// and the overflow is logged.
    pub fn show(&mut self, value: u32) -> Result<(), P::Error> {
        let mut digits = [0u8; D];
        if to_bcd_digits(value, &mut digits).is_err() {
            warn!("{} does not fit in {} digits", value, D);
            return Ok(());
        }
        self.write_digits(digits)
    }

    /// Blanks every digit.
    pub fn set_off(&mut self) -> Result<(), P::Error> {
        self.write_digits([BLANK; D])
    }

    /// Latches `digits[i]` into digit `i`.
    fn write_digits(&mut self, digits: [u8; D]) -> Result<(), P::Error> {
        for (latch, nibble) in self.latches.iter_mut().zip(digits) {
            write_nibble(&mut self.data, nibble)?;
            latch.set_high()?;
            latch.set_low()?;
        }
        Ok(())
    }
}

fn write_nibble<P: OutputPin>(data: &mut [P; 4], nibble: u8) -> Result<(), P::Error> {
    for (bit, line) in data.iter_mut().enumerate() {
        if (nibble >> bit) & 0x01 != 0 {
            line.set_high()?;
        } else {
            line.set_low()?;
        }
    }
    Ok(())
}
