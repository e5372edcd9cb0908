// Implements the one-shot calibration of the measurement chain.
//
// Key Features:
// - Derives the supply voltage from the internal voltage reference
// - Records the zero-current code of every gain path
//
// Detailed Operation:
// The converter measures against the supply, so the supply voltage is found by
// reading the known internal reference and inverting the ratio. The first
// reading after switching the converter input is thrown away because the
// input needs time to settle. Zero offsets are taken as the minimum code seen
// while no current flows: the offset is treated as a floor rather than noise,
// so real readings are rarely clamped to zero later on.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::GainPath;
use crate::config::{ADC_BITS, CALIBRATION_SAMPLES, CALIBRATION_SHIFT, VREF_10UV};
use crate::ports::{AnalogFrontEnd, AnalogInput};

/// Supply voltage and amplifier offsets of the measurement chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Calibration {
    /// Supply voltage in 10 µV units
    vcc_10uv: u32,

    /// Code produced by each path at zero current, indexed by `GainPath::index`
    zero_offset: [u16; 3],
}

impl Calibration {
    /// Nominal 3.3 V supply, used until the first calibration
    pub const NOMINAL_VCC_10UV: u32 = 330_000;

    pub const fn new(vcc_10uv: u32, zero_offset: [u16; 3]) -> Self {
        Self {
            vcc_10uv,
            zero_offset,
        }
    }

    /// Measure supply voltage and zero offsets.
    ///
    /// No current may flow through the sense resistors while this runs.
    pub fn measure<A: AnalogFrontEnd>(adc: &mut A) -> Self {
        let vcc_10uv = measure_vcc(adc);
        let zero_offset = measure_zero_offsets(adc);
        Self::new(vcc_10uv, zero_offset)
    }

    /// Supply voltage in 10 µV units
    pub fn vcc_10uv(&self) -> u32 {
        self.vcc_10uv
    }

    /// Zero-current code of `path`
    pub fn zero_offset(&self, path: GainPath) -> u16 {
        self.zero_offset[path.index()]
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(Self::NOMINAL_VCC_10UV, [0; 3])
    }
}

/// Measure the supply voltage against the internal reference.
pub fn measure_vcc<A: AnalogFrontEnd>(adc: &mut A) -> u32 {
    adc.read_single(AnalogInput::InternalReference); // settle after the input switch
    let mut sum: u32 = 0;
    for _ in 0..CALIBRATION_SAMPLES {
        sum += adc.read_single(AnalogInput::InternalReference) as u32;
    }
    vcc_from_reference_sum(sum)
}

/// Supply voltage for a sum of `CALIBRATION_SAMPLES` reference codes.
///
/// Vref : Vcc = sum / 16 : 2^ADC_BITS, so the average is folded into the shift.
/// A zero sum has no meaningful answer and yields 0.
pub fn vcc_from_reference_sum(sum: u32) -> u32 {
    (VREF_10UV << (ADC_BITS + CALIBRATION_SHIFT))
        .checked_div(sum)
        .unwrap_or(0)
}

/// Record the minimum zero-current code of every gain path.
pub fn measure_zero_offsets<A: AnalogFrontEnd>(adc: &mut A) -> [u16; 3] {
    let mut offsets = [0; 3];
    for path in GainPath::ALL {
        offsets[path.index()] = measure_min(adc, AnalogInput::Path(path));
    }
    offsets
}

fn measure_min<A: AnalogFrontEnd>(adc: &mut A, input: AnalogInput) -> u16 {
    adc.read_single(input); // settle after the input switch
    let mut min = u16::MAX;
    for _ in 0..CALIBRATION_SAMPLES {
        min = min.min(adc.read_single(input));
    }
    min
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed sequence of codes per input and counts conversions
    struct ScriptedAdc {
        reference: &'static [u16],
        path: [&'static [u16]; 3],
        reads: [usize; 4],
    }

    impl ScriptedAdc {
        fn new(reference: &'static [u16], path: [&'static [u16]; 3]) -> Self {
            Self {
                reference,
                path,
                reads: [0; 4],
            }
        }

        fn next(script: &[u16], idx: &mut usize) -> u16 {
            let value = script[*idx % script.len()];
            *idx += 1;
            value
        }
    }

    impl AnalogFrontEnd for ScriptedAdc {
        fn select_channel(&mut self, _channel: usize) {}

        fn settle_delay(&mut self) {}

        fn read_single(&mut self, input: AnalogInput) -> u16 {
            match input {
                AnalogInput::InternalReference => Self::next(self.reference, &mut self.reads[3]),
                AnalogInput::Path(path) => {
                    let i = path.index();
                    Self::next(self.path[i], &mut self.reads[i])
                }
            }
        }

        fn start_batch(&mut self, _path: GainPath) {}
    }

    #[test]
    fn vcc_from_typical_reference() {
        // 1.2 V reference on a 3.3 V supply reads ~372 of 1024
        assert_eq!(vcc_from_reference_sum(372 * 16), 330_322);
    }

    #[test]
    fn zero_reference_does_not_panic() {
        assert_eq!(vcc_from_reference_sum(0), 0);
    }

    #[test]
    fn first_reference_reading_is_discarded() {
        // The garbage first reading must not enter the average
        static REFERENCE: [u16; 17] = [
            1000, 372, 372, 372, 372, 372, 372, 372, 372, 372, 372, 372, 372, 372, 372, 372, 372,
        ];
        let mut adc = ScriptedAdc::new(&REFERENCE, [&[0], &[0], &[0]]);
        assert_eq!(measure_vcc(&mut adc), 330_322);
        assert_eq!(adc.reads[3], 17);
    }

    #[test]
    fn zero_offset_is_the_minimum() {
        static HIGH: [u16; 17] = [0, 9, 8, 7, 9, 8, 9, 8, 7, 9, 8, 9, 8, 7, 9, 8, 9];
        static MID: [u16; 17] = [0, 3, 2, 3, 3, 2, 3, 3, 2, 3, 3, 2, 3, 3, 2, 3, 3];
        static DIRECT: [u16; 1] = [1];
        let mut adc = ScriptedAdc::new(&[372], [&HIGH, &MID, &DIRECT]);

        // The leading 0 of each script is the discarded settling reading
        assert_eq!(measure_zero_offsets(&mut adc), [7, 2, 1]);
        assert_eq!(adc.reads[..3], [17, 17, 17]);
    }

    #[test]
    fn measure_fills_both_parts() {
        let mut adc = ScriptedAdc::new(&[372], [&[12], &[4], &[0]]);
        let cal = Calibration::measure(&mut adc);
        assert_eq!(cal.vcc_10uv(), 330_322);
        assert_eq!(cal.zero_offset(GainPath::HighGain), 12);
        assert_eq!(cal.zero_offset(GainPath::MidGain), 4);
        assert_eq!(cal.zero_offset(GainPath::DirectSense), 0);
    }
}
