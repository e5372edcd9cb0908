// Implements settling detection for the reference channel.
//
// Key Features:
// - Observes the reference channel in fixed-length windows
// - Tracks the largest absolute error and the duty sum of each window
// - Fixes the duty to the window average once the error stays in tolerance
// - Forces the fix after a maximum observation time
//
// Detailed Operation:
// A window is `2^settle_window_shift` updates long. The first update of a
// window resets the error maximum and the duty sum; its own error is not
// tracked but its duty is summed, so every window sums exactly one window
// length of duties. At each window boundary the largest error is compared to
// the tolerance (`goal >> 7`, at least 4 µA). When it fits, or when the
// maximum number of windows has elapsed, the duty is replaced by the window
// average and incremental updates stop until the goal is written again.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::config::EngineConfig;

/// Observation window state of the reference channel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettlingAccumulator {
    tick_count: u16,         // Updates observed since the last fix
    max_abs_error_seen: u16, // Largest |error| of the current window
    duty_sum: u32,           // Sum of duties of the current window
    is_fixed: bool,          // Duty is fixed, incremental updates suppressed
}

impl SettlingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duty is fixed and incremental updates are suppressed
    #[inline(always)]
    pub fn is_fixed(&self) -> bool {
        self.is_fixed
    }

    /// Updates observed since the last fix
    pub fn tick_count(&self) -> u16 {
        self.tick_count
    }

    /// Largest absolute error of the current window
    pub fn max_abs_error_seen(&self) -> u16 {
        self.max_abs_error_seen
    }

    /// Sum of duties of the current window
    pub fn duty_sum(&self) -> u32 {
        self.duty_sum
    }

    /// Resume active control and start a fresh observation.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feed one control update.
    ///
    /// Returns the averaged duty when this update fixes the channel.
    pub fn observe(
        &mut self,
        error_ua: i16,
        duty: u16,
        goal_ua: u16,
        cfg: &EngineConfig,
    ) -> Option<u16> {
        if self.is_fixed {
            return None;
        }

        let window_mask = cfg.settle_window_len() - 1;
        if self.tick_count & window_mask == 0 {
            self.max_abs_error_seen = 0;
            self.duty_sum = 0;
        } else {
            self.max_abs_error_seen = self.max_abs_error_seen.max(error_ua.unsigned_abs());
        }
        self.duty_sum += duty as u32;
        self.tick_count += 1;

        if self.tick_count >= cfg.settle_max_ticks() {
            self.is_fixed = true;
        } else if self.tick_count & window_mask == 0 {
            self.is_fixed = self.max_abs_error_seen <= cfg.settle_tolerance(goal_ua);
        }

        if !self.is_fixed {
            return None;
        }

        let duty = (self.duty_sum >> cfg.settle_window_shift) as u16;
        info!(
            "duty fixed @{}: {} (max error {}uA)",
            self.tick_count,
            duty,
            self.max_abs_error_seen
        );
        self.tick_count = 0;
        Some(duty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(acc: &mut SettlingAccumulator, n: usize, error: i16, duty: u16, goal: u16) -> Option<u16> {
        let cfg = EngineConfig::default();
        let mut result = None;
        for _ in 0..n {
            result = acc.observe(error, duty, goal, &cfg);
            if result.is_some() {
                break;
            }
        }
        result
    }

    #[test]
    fn quiet_window_fixes_at_boundary() {
        let mut acc = SettlingAccumulator::new();
        assert_eq!(feed(&mut acc, 63, 2, 1000, 100), None);
        assert!(!acc.is_fixed());
        assert_eq!(feed(&mut acc, 1, 2, 1000, 100), Some(1000));
        assert!(acc.is_fixed());
        assert_eq!(acc.tick_count(), 0);
    }

    #[test]
    fn first_error_of_window_is_not_tracked() {
        let mut acc = SettlingAccumulator::new();
        let cfg = EngineConfig::default();
        // A large error on the reset update does not block the fix
        assert_eq!(acc.observe(500, 1000, 100, &cfg), None);
        assert_eq!(feed(&mut acc, 63, 0, 1000, 100), Some(1000));
    }

    #[test]
    fn noisy_windows_run_to_the_limit() {
        let mut acc = SettlingAccumulator::new();
        assert_eq!(feed(&mut acc, 2559, 5, 800, 100), None);
        assert_eq!(acc.tick_count(), 2559);
        assert_eq!(feed(&mut acc, 1, 5, 800, 100), Some(800));
    }

    #[test]
    fn fixed_duty_is_the_window_average() {
        let mut acc = SettlingAccumulator::new();
        let cfg = EngineConfig::default();
        for i in 0..63u16 {
            assert_eq!(acc.observe(0, 1000 + (i & 1) * 2, 1000, &cfg), None);
        }
        // 32 x 1000 + 32 x 1002 = 64 x 1001
        assert_eq!(acc.observe(0, 1002, 1000, &cfg), Some(1001));
    }

    #[test]
    fn tolerance_scales_with_goal() {
        let mut acc = SettlingAccumulator::new();
        // 12800 >> 7 = 100 µA tolerance
        assert_eq!(feed(&mut acc, 64, -100, 20000, 12800), Some(20000));

        let mut acc = SettlingAccumulator::new();
        assert_eq!(feed(&mut acc, 64, -101, 20000, 12800), None);
    }

    #[test]
    fn reset_resumes_observation() {
        let mut acc = SettlingAccumulator::new();
        feed(&mut acc, 64, 0, 1000, 100);
        assert!(acc.is_fixed());
        acc.reset();
        assert!(!acc.is_fixed());
        assert_eq!(acc.duty_sum(), 0);
    }
}
