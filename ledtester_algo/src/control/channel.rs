// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::SettlingAccumulator;
use crate::analog::{GainPath, Reading};

/// Control state of one LED channel.
///
/// Idle channels keep their last duty applied; the PWM output runs on its own
/// and only changes when the channel is controlled again.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChannelState {
    pub(crate) goal_current_ua: u16, // Operator-set target
    pub(crate) prev_error_ua: i16,   // Error of the previous control update
    pub(crate) duty: u16,            // PWM compare value (0 = off)

    /// Present only on the reference channel
    pub(crate) settling: Option<SettlingAccumulator>,

    /// Last calibrated reading, kept for diagnostics
    pub(crate) reading: Reading,
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel that also runs settling detection
    pub fn with_settling() -> Self {
        Self {
            settling: Some(SettlingAccumulator::new()),
            ..Self::default()
        }
    }

    /// Set the target current and resume active control.
    ///
    /// Returns `true` when the goal changed.
    pub fn set_goal(&mut self, goal_ua: u16) -> bool {
        if let Some(settling) = self.settling.as_mut() {
            settling.reset();
        }
        let changed = self.goal_current_ua != goal_ua;
        self.goal_current_ua = goal_ua;
        changed
    }

    pub fn goal_current(&self) -> u16 {
        self.goal_current_ua
    }

    pub fn prev_error(&self) -> i16 {
        self.prev_error_ua
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }

    /// Settling state, `None` on channels without settling detection
    pub fn settling(&self) -> Option<&SettlingAccumulator> {
        self.settling.as_ref()
    }

    /// Duty is fixed by settling detection
    #[inline(always)]
    pub fn is_fixed(&self) -> bool {
        self.settling.map_or(false, |s| s.is_fixed())
    }

    /// Last calibrated reading
    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    /// Last measured current in µA
    pub fn measured_current(&self) -> u16 {
        self.reading.current_ua
    }

    /// Last averaged raw code
    pub fn last_raw_code(&self) -> u16 {
        self.reading.raw_code
    }

    /// Gain path of the last acquisition
    pub fn last_gain(&self) -> GainPath {
        self.reading.path
    }

    /// Switch the output off and drop the control history.
    ///
    /// Settling starts over, so the next update runs the incremental law.
    pub(crate) fn release(&mut self) {
        self.duty = 0;
        self.prev_error_ua = 0;
        if let Some(settling) = self.settling.as_mut() {
            settling.reset();
        }
    }

    pub(crate) fn record(&mut self, reading: Reading) {
        self.reading = reading;
    }
}
