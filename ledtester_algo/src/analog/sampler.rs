// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::{Calibration, GainPath};
use crate::config::SENSE_RESISTOR_OHM;
use crate::math_integer::ohms_law;

/// One calibrated current reading
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Averaged raw code of the batch
    pub raw_code: u16,
    /// Path the batch was taken on
    pub path: GainPath,
    /// Calibrated current in µA
    pub current_ua: u16,
    /// The code was below the calibrated zero offset and was read as 0 µA
    pub clamped: bool,
}

/// Average a batch of codes (truncating division).
///
/// An empty batch averages to 0.
pub fn average(batch: &[u16]) -> u16 {
    if batch.is_empty() {
        return 0;
    }
    let sum: u32 = batch.iter().map(|&code| code as u32).sum();
    (sum / batch.len() as u32) as u16
}

/// Convert an averaged code on `path` into a current in µA.
pub fn to_current(code: u16, path: GainPath, cal: &Calibration) -> Reading {
    let offset = cal.zero_offset(path);
    let (code_above_zero, clamped) = match code.checked_sub(offset) {
        Some(value) => (value, false),
        None => (0, true),
    };

    let voltage = ohms_law::code_to_10uv(code_above_zero, cal.vcc_10uv());
    let (num, den) = path.gain_ratio();
    let current = ohms_law::current_ua(voltage, SENSE_RESISTOR_OHM) * den / num;

    Reading {
        raw_code: code,
        path,
        current_ua: current.min(u16::MAX as u32) as u16,
        clamped,
    }
}

/// Average `batch` and convert it in one step.
pub fn sample(batch: &[u16], path: GainPath, cal: &Calibration) -> Reading {
    to_current(average(batch), path, cal)
}
