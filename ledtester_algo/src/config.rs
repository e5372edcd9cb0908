// Fixed hardware parameters and run-time tunables of the current regulation engine.
//
// Hardware constants describe the board (channel count, converter resolution,
// sense resistor, amplifier gains) and never change at run time. Everything the
// control loop can be tuned with lives in `EngineConfig`, which is handed to
// `Engine::new` once at boot.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

/// Number of LED channels sharing one converter and one PWM timer
pub const LED_NUM: usize = 4;

/// Conversions captured by DMA per acquisition
pub const BATCH_LEN: usize = 32;

/// Resolution of the codes handed to the engine
pub const ADC_BITS: u32 = 10;

/// Largest code the engine can see
pub const ADC_MAX: u16 = (1 << ADC_BITS) - 1;

/// Internal voltage reference, 1.20 V in 10 µV units
pub const VREF_10UV: u32 = 120_000;

/// Kept readings per calibration measurement (one extra is discarded first)
pub const CALIBRATION_SAMPLES: usize = 16;

/// log2(CALIBRATION_SAMPLES), folded into the supply voltage shift
pub const CALIBRATION_SHIFT: u32 = 4;

/// Current sense resistor in ohms
pub const SENSE_RESISTOR_OHM: u32 = 50;

/// Fixed-point scale of the control law (gain / 1024)
pub const GAIN_SHIFT: u32 = 10;

/// Run-time tunables of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Probe codes below this select the high gain amplifier
    pub probe_low: u16,
    /// Probe codes below this (and not below `probe_low`) select the mid gain amplifier
    pub probe_mid: u16,

    /// Duty applied while the goal is 0 (keeps the driver in its linear region)
    pub idle_duty: u16,
    /// Duty above this is treated as saturation and clamped to 0
    pub max_duty: u16,

    /// Proportional gain used at or below `kp_crossover_ua`
    pub kp_small: u32,
    /// Proportional gain above the crossover is `kp_numerator / measured + kp_offset`
    pub kp_numerator: u32,
    pub kp_offset: u32,
    pub kp_crossover_ua: u16,
    /// Derivative gain is `kd_ratio * kp`
    pub kd_ratio: u32,

    /// Channel carrying the settling accumulator
    pub reference_channel: usize,
    /// log2 of the settling window length in reference channel updates
    pub settle_window_shift: u32,
    /// Number of windows after which the duty is fixed regardless of error
    pub settle_max_windows: u16,
    /// Settling tolerance is `goal >> settle_tolerance_shift`, floored at `settle_tolerance_min_ua`
    pub settle_tolerance_shift: u32,
    pub settle_tolerance_min_ua: u16,

    /// Upper bound for operator goals
    pub goal_max_ua: u16,

    /// Control tick period in milliseconds
    pub ctrl_period_ms: u16,
    /// UI-rate tick period in milliseconds, derived from the control tick
    pub ui_tick_ms: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe_low: 20,
            probe_mid: 200,

            idle_duty: 5000,
            max_duty: 30000,

            kp_small: 500,
            kp_numerator: 20000,
            kp_offset: 10,
            kp_crossover_ua: 40,
            kd_ratio: 2,

            reference_channel: 0,
            settle_window_shift: 6,    // 64 updates per window
            settle_max_windows: 40,    // 2560 updates at most
            settle_tolerance_shift: 7, // goal / 128
            settle_tolerance_min_ua: 4,

            goal_max_ua: 20000,

            ctrl_period_ms: 1,
            ui_tick_ms: 10,
        }
    }
}

impl EngineConfig {
    /// Length of one settling window in reference channel updates
    #[inline(always)]
    pub fn settle_window_len(&self) -> u16 {
        1u16.checked_shl(self.settle_window_shift).unwrap_or(1 << (u16::BITS - 1))
    }

    /// Number of reference channel updates after which settling is forced
    #[inline(always)]
    pub fn settle_max_ticks(&self) -> u16 {
        self.settle_window_len().saturating_mul(self.settle_max_windows)
    }

    /// Settling tolerance for a given goal
    pub fn settle_tolerance(&self, goal_ua: u16) -> u16 {
        let tolerance = goal_ua >> self.settle_tolerance_shift;
        tolerance.max(self.settle_tolerance_min_ua)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_spans_2560_updates() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.settle_window_len(), 64);
        assert_eq!(cfg.settle_max_ticks(), 2560);
    }

    #[test]
    fn oversized_window_saturates() {
        let cfg = EngineConfig {
            settle_window_shift: 20,
            settle_max_windows: 1000,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.settle_window_len(), 0x8000);
        assert_eq!(cfg.settle_max_ticks(), u16::MAX);
    }

    #[test]
    fn tolerance_is_floored() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.settle_tolerance(100), 4);
        assert_eq!(cfg.settle_tolerance(0), 4);
        assert_eq!(cfg.settle_tolerance(1280), 10);
        assert_eq!(cfg.settle_tolerance(20000), 156);
    }
}
