// Implements the per-channel incremental current controller.
//
// Key Features:
// - Incremental proportional + derivative law in fixed point (gain / 1024)
// - Proportional gain scheduled on the measured current magnitude
// - Forward-progress floor of one duty unit while the error is nonzero
// - Safe idle duty for a zero goal, clamp to 0 on saturation
// - Settling detection on the reference channel
//
// Detailed Operation:
// Every update computes the error and its change since the previous update.
// Small currents get a large fixed proportional gain (a proportional step would
// otherwise vanish), larger currents get `20000 / measured + 10`, tapering the
// step to keep the loop stable. The derivative gain is twice the proportional
// gain. Both terms are scaled by `>> 10` and the step wraps at 16 bits, so a
// duty driven below zero lands above the saturation limit and is clamped to 0.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::ChannelState;
use crate::config::{EngineConfig, GAIN_SHIFT};

/// What a control update did to the duty
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlStatus {
    /// Incremental law applied
    Tracking,
    /// Goal is 0, safe idle duty applied
    Idle,
    /// Duty exceeded the limit and was clamped to 0
    Saturated,
    /// This update fixed the duty to the settling window average
    Settled,
    /// Duty is fixed, incremental update suppressed
    Held,
}

/// Result of one control update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlOutcome {
    pub duty: u16,
    pub status: ControlStatus,
}

/// Incremental current controller shared by all channels
pub struct CurrentController {
    cfg: EngineConfig,
}

impl CurrentController {
    pub fn new(cfg: EngineConfig) -> Self {
        Self { cfg }
    }

    /// Proportional gain (x1024) for a measured current.
    pub fn proportional_gain(&self, measured_ua: u16) -> u32 {
        if measured_ua <= self.cfg.kp_crossover_ua {
            return self.cfg.kp_small;
        }
        // measured_ua > crossover >= 0, the division is safe
        self.cfg.kp_numerator / measured_ua as u32 + self.cfg.kp_offset
    }

    /// Duty step for an error, its change and the measured current.
    ///
    /// Never returns 0 for a nonzero error.
    pub fn step(&self, error_ua: i16, d_error_ua: i16, measured_ua: u16) -> i16 {
        let kp = self.proportional_gain(measured_ua) as i32;
        let kd = self.cfg.kd_ratio as i32 * kp;

        let p = (kp * error_ua as i32) >> GAIN_SHIFT;
        let d = (kd * d_error_ua as i32) >> GAIN_SHIFT;
        let delta = (p + d) as i16;

        if delta == 0 && error_ua != 0 {
            error_ua.signum()
        } else {
            delta
        }
    }

    /// Run one control update of `ch` with a fresh measurement.
    pub fn update(&self, ch: &mut ChannelState, measured_ua: u16) -> ControlOutcome {
        let goal_ua = ch.goal_current_ua;
        let error_ua = goal_ua.wrapping_sub(measured_ua) as i16;
        let d_error_ua = error_ua.wrapping_sub(ch.prev_error_ua);
        ch.prev_error_ua = error_ua;

        if ch.is_fixed() {
            return ControlOutcome {
                duty: ch.duty,
                status: ControlStatus::Held,
            };
        }

        let (mut duty, mut status) = if goal_ua == 0 {
            (self.cfg.idle_duty, ControlStatus::Idle)
        } else {
            let delta = self.step(error_ua, d_error_ua, measured_ua);
            (ch.duty.wrapping_add(delta as u16), ControlStatus::Tracking)
        };

        // Past this point the current no longer follows the duty
        if duty > self.cfg.max_duty {
            duty = 0;
            status = ControlStatus::Saturated;
        }

        if let Some(settling) = ch.settling.as_mut() {
            if let Some(fixed) = settling.observe(error_ua, duty, goal_ua, &self.cfg) {
                duty = fixed;
                status = ControlStatus::Settled;
            }
        }

        ch.duty = duty;
        ControlOutcome { duty, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> CurrentController {
        CurrentController::new(EngineConfig::default())
    }

    fn channel(goal: u16, duty: u16) -> ChannelState {
        let mut ch = ChannelState::new();
        ch.set_goal(goal);
        ch.duty = duty;
        ch
    }

    #[test]
    fn gain_schedule() {
        let ctl = controller();
        assert_eq!(ctl.proportional_gain(0), 500);
        assert_eq!(ctl.proportional_gain(40), 500);
        assert_eq!(ctl.proportional_gain(41), 497);
        assert_eq!(ctl.proportional_gain(1000), 30);
        assert_eq!(ctl.proportional_gain(20000), 11);
    }

    #[test]
    fn first_step_from_zero() {
        // kp = 500, kd = 1000: 50000 >> 10 = 48, 100000 >> 10 = 97
        let ctl = controller();
        let mut ch = channel(100, 0);
        let out = ctl.update(&mut ch, 0);
        assert_eq!(out, ControlOutcome { duty: 145, status: ControlStatus::Tracking });
        assert_eq!(ch.prev_error(), 100);
    }

    #[test]
    fn derivative_brakes_a_closing_error() {
        // error 60, change -40: 29 + (-40) = -11
        let ctl = controller();
        let mut ch = channel(100, 145);
        ch.prev_error_ua = 100;
        assert_eq!(ctl.update(&mut ch, 40).duty, 134);
    }

    #[test]
    fn zero_goal_forces_idle_duty() {
        let ctl = controller();
        for duty in [0, 1, 12345, 30000] {
            let mut ch = channel(0, duty);
            let out = ctl.update(&mut ch, 300);
            assert_eq!(out, ControlOutcome { duty: 5000, status: ControlStatus::Idle });
        }
    }

    #[test]
    fn forward_progress_floor() {
        // kp = 11 at 20000 µA: 11 * 5 >> 10 == 0
        let ctl = controller();
        assert_eq!(ctl.step(5, 0, 20000), 1);
        assert_eq!(ctl.step(-5, 0, 20000), -1);

        let mut ch = channel(20005, 20000);
        ch.prev_error_ua = 5;
        assert_eq!(ctl.update(&mut ch, 20000).duty, 20001);

        let mut ch = channel(19995, 20000);
        ch.prev_error_ua = -5;
        assert_eq!(ctl.update(&mut ch, 20000).duty, 19999);
    }

    #[test]
    fn no_step_at_target() {
        let ctl = controller();
        let mut ch = channel(1000, 9000);
        ch.prev_error_ua = 0;
        let out = ctl.update(&mut ch, 1000);
        assert_eq!(out.duty, 9000);
        assert_eq!(out.status, ControlStatus::Tracking);
    }

    #[test]
    fn saturation_clamps_to_zero() {
        let ctl = controller();
        let mut ch = channel(20000, 29990);
        let out = ctl.update(&mut ch, 0);
        assert_eq!(out, ControlOutcome { duty: 0, status: ControlStatus::Saturated });
    }

    #[test]
    fn negative_duty_wraps_into_saturation() {
        // error -30, change -130: -15 + (-127) takes duty 100 below zero
        let ctl = controller();
        let mut ch = channel(10, 100);
        ch.prev_error_ua = 100;
        let out = ctl.update(&mut ch, 40);
        assert_eq!(out.status, ControlStatus::Saturated);
        assert_eq!(out.duty, 0);
    }

    #[test]
    fn channels_without_settling_never_fix() {
        let ctl = controller();
        let mut ch = channel(100, 1000);
        for _ in 0..3000 {
            ctl.update(&mut ch, 100);
        }
        assert!(!ch.is_fixed());
        assert!(ch.settling().is_none());
    }

    #[test]
    fn approach_then_settle_on_reference_channel() {
        let ctl = controller();
        let mut ch = ChannelState::with_settling();
        ch.set_goal(100);

        let measured = [0, 40, 70, 90, 98];
        let duties: [u16; 5] = core::array::from_fn(|i| ctl.update(&mut ch, measured[i]).duty);
        assert_eq!(duties, [145, 134, 124, 116, 112]);

        // First window sees the approach, the second one is quiet
        let mut settled_at = None;
        for i in 5..128 {
            let out = ctl.update(&mut ch, 100);
            assert_eq!(out.duty, 111);
            if out.status == ControlStatus::Settled {
                settled_at = Some(i);
            }
        }
        assert_eq!(settled_at, Some(127));
        assert!(ch.is_fixed());
    }

    #[test]
    fn fixed_duty_holds_until_goal_write() {
        let ctl = controller();
        let mut ch = ChannelState::with_settling();
        ch.set_goal(100);
        ch.duty = 111;

        let mut settled_at = None;
        for i in 0..64 {
            let out = ctl.update(&mut ch, 100);
            if out.status == ControlStatus::Settled {
                settled_at = Some(i);
                break;
            }
        }
        assert_eq!(settled_at, Some(63));
        assert!(ch.is_fixed());
        assert_eq!(ch.duty(), 111);

        // Large errors no longer move the duty
        let out = ctl.update(&mut ch, 0);
        assert_eq!(out, ControlOutcome { duty: 111, status: ControlStatus::Held });
        assert_eq!(ch.prev_error(), 100);

        // Rewriting the same goal resumes control
        ch.set_goal(100);
        assert!(!ch.is_fixed());
        assert_eq!(ctl.update(&mut ch, 0).status, ControlStatus::Tracking);
    }
}
