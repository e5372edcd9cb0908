// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::GainPath;
use crate::ports::{AnalogFrontEnd, AnalogInput};

/// Picks the gain path for one acquisition from a quick probe of the
/// unamplified sense voltage.
///
/// Small currents give sense voltages below the converter resolution, so
/// progressively more gain is used as the probe code shrinks.
pub struct RangeSelector {
    low: u16, // Below this: HighGain
    mid: u16, // Below this: MidGain, otherwise DirectSense
}

impl RangeSelector {
    pub fn new(low: u16, mid: u16) -> Self {
        Self { low, mid }
    }

    /// Classify a probe code taken on the direct sense path.
    pub fn classify(&self, probe_code: u16) -> GainPath {
        if probe_code < self.low {
            GainPath::HighGain
        } else if probe_code < self.mid {
            GainPath::MidGain
        } else {
            GainPath::DirectSense
        }
    }

    /// Probe the active channel and leave the converter settled on the chosen path.
    ///
    /// The first conversion after the multiplexer switch is discarded, and so
    /// is the first conversion on an amplified path.
    pub fn select<A: AnalogFrontEnd>(&self, adc: &mut A) -> GainPath {
        let probe = AnalogInput::Path(GainPath::DirectSense);
        adc.read_single(probe); // settle after the input switch
        let code = adc.read_single(probe);

        let path = self.classify(code);
        if path != GainPath::DirectSense {
            adc.read_single(AnalogInput::Path(path)); // settle on the new path
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns `probe` for every direct sense conversion and logs all inputs
    struct ProbeAdc {
        probe: u16,
        log: [Option<AnalogInput>; 4],
        reads: usize,
    }

    impl ProbeAdc {
        fn new(probe: u16) -> Self {
            Self {
                probe,
                log: [None; 4],
                reads: 0,
            }
        }
    }

    impl AnalogFrontEnd for ProbeAdc {
        fn select_channel(&mut self, _channel: usize) {}

        fn settle_delay(&mut self) {}

        fn read_single(&mut self, input: AnalogInput) -> u16 {
            self.log[self.reads] = Some(input);
            self.reads += 1;
            match input {
                AnalogInput::Path(GainPath::DirectSense) => self.probe,
                _ => 0,
            }
        }

        fn start_batch(&mut self, _path: GainPath) {}
    }

    #[test]
    fn thresholds_pick_paths() {
        let selector = RangeSelector::new(20, 200);
        assert_eq!(selector.classify(5), GainPath::HighGain);
        assert_eq!(selector.classify(50), GainPath::MidGain);
        assert_eq!(selector.classify(500), GainPath::DirectSense);
    }

    #[test]
    fn threshold_edges() {
        let selector = RangeSelector::new(20, 200);
        assert_eq!(selector.classify(19), GainPath::HighGain);
        assert_eq!(selector.classify(20), GainPath::MidGain);
        assert_eq!(selector.classify(199), GainPath::MidGain);
        assert_eq!(selector.classify(200), GainPath::DirectSense);
    }

    #[test]
    fn amplified_path_gets_a_settling_read() {
        let selector = RangeSelector::new(20, 200);
        let mut adc = ProbeAdc::new(5);
        assert_eq!(selector.select(&mut adc), GainPath::HighGain);
        assert_eq!(adc.reads, 3);
        assert_eq!(adc.log[2], Some(AnalogInput::Path(GainPath::HighGain)));
    }

    #[test]
    fn direct_path_keeps_the_probe_input() {
        let selector = RangeSelector::new(20, 200);
        let mut adc = ProbeAdc::new(500);
        assert_eq!(selector.select(&mut adc), GainPath::DirectSense);
        assert_eq!(adc.reads, 2);
    }
}
