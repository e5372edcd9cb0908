// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

/// Analog path sampled for one acquisition.
///
/// Each path has its own amplification factor and its own zero offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GainPath {
    /// x49 amplifier, for the smallest currents
    HighGain,
    /// x4.9 amplifier
    MidGain,
    /// Sense resistor voltage without amplification
    DirectSense,
}

impl GainPath {
    /// All paths in calibration order
    pub const ALL: [GainPath; 3] = [GainPath::HighGain, GainPath::MidGain, GainPath::DirectSense];

    /// Position of the path in per-path tables
    #[inline(always)]
    pub const fn index(self) -> usize {
        match self {
            GainPath::HighGain => 0,
            GainPath::MidGain => 1,
            GainPath::DirectSense => 2,
        }
    }

    /// Amplification as a `(numerator, denominator)` pair, applied as
    /// `current * denominator / numerator` when undoing the gain.
    #[inline(always)]
    pub const fn gain_ratio(self) -> (u32, u32) {
        match self {
            GainPath::HighGain => (49, 1),
            GainPath::MidGain => (49, 10),
            GainPath::DirectSense => (1, 1),
        }
    }
}

impl Default for GainPath {
    fn default() -> Self {
        GainPath::DirectSense
    }
}
