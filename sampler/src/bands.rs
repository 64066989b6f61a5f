//! Threshold bands for the indicator LEDs.
//!
//! A [`BandTable`] is an ordered list of lower bounds. A reading falls in
//! the row with the greatest lower bound that is still `<=` the reading,
//! and that row says which indicator lines are on. A row can also be
//! unmapped (`None`), in which case the indicator outputs are left as they
//! were.

/// Indicator lines that are on, one bit per line (bit 0 is band 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BandPattern(pub u8);

impl BandPattern {
    pub const OFF: BandPattern = BandPattern(0b000);
    pub const BAND1: BandPattern = BandPattern(0b001);
    pub const BAND1_2: BandPattern = BandPattern(0b011);
    pub const BAND1_2_3: BandPattern = BandPattern(0b111);

    /// Whether indicator line `line` (0 based) is on.
    pub fn is_on(self, line: usize) -> bool {
        line < 8 && self.0 & (1 << line) != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub lower_bound: u16,
    pub pattern: Option<BandPattern>,
}

impl Band {
    pub const fn new(lower_bound: u16, pattern: BandPattern) -> Self {
        Band {
            lower_bound,
            pattern: Some(pattern),
        }
    }

    /// A range of readings that does not change the outputs.
    pub const fn unmapped(lower_bound: u16) -> Self {
        Band {
            lower_bound,
            pattern: None,
        }
    }
}

/// Bands sorted by increasing lower bound.
#[derive(Debug, Clone, Copy)]
pub struct BandTable<'a> {
    bands: &'a [Band],
}

impl<'a> BandTable<'a> {
    /// # Panics
    ///
    /// If the lower bounds are not strictly increasing.
    pub const fn new(bands: &'a [Band]) -> Self {
        let mut i = 1;
        while i < bands.len() {
            assert!(
                bands[i - 1].lower_bound < bands[i].lower_bound,
                "band lower bounds must be strictly increasing"
            );
            i += 1;
        }
        BandTable { bands }
    }

    /// The pattern for `reading`, `None` if the reading is below the first
    /// band or falls in an unmapped band.
    pub fn lookup(&self, reading: u16) -> Option<BandPattern> {
        self.bands
            .iter()
            .rev()
            .find(|band| band.lower_bound <= reading)
            .and_then(|band| band.pattern)
    }
}

/// Distance bands in centimetres for the three indicator LEDs.
///
/// `30` sits in its own unmapped band: under 30 cm two LEDs are on, over
/// 30 cm all three are, and exactly 30 cm leaves the LEDs as they were.
pub const DISTANCE_BANDS: BandTable<'static> = BandTable::new(&DISTANCE_ROWS);

const DISTANCE_ROWS: [Band; 5] = [
    Band::new(0, BandPattern::OFF),
    Band::new(10, BandPattern::BAND1),
    Band::new(20, BandPattern::BAND1_2),
    Band::unmapped(30),
    Band::new(31, BandPattern::BAND1_2_3),
];

/// What the indicator should show.
///
/// With sampling disabled everything is off whatever the last reading was.
/// `None` means leave the outputs untouched.
pub fn indicator_pattern(
    table: &BandTable<'_>,
    reading: u16,
    sampling_enabled: bool,
) -> Option<BandPattern> {
    if !sampling_enabled {
        return Some(BandPattern::OFF);
    }
    table.lookup(reading)
}
