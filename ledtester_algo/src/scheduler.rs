// Implements the round-robin acquisition scheduler.
//
// Key Features:
// - Two-state machine: Idle between acquisitions, Acquiring while DMA runs
// - Advances the active channel once per control tick
// - Detects ticks that arrive before the previous acquisition completed
// - Derives the slower UI-rate tick from the control tick
//
// Detailed Operation:
// The control tick moves Idle -> Acquiring and selects the next channel; the
// batch completion moves Acquiring -> Idle. An acquisition must complete
// within one tick period. When a tick still finds the scheduler Acquiring, the
// tick is counted as an overrun and dropped: the channel pointer stays put and
// the in-flight acquisition is left to complete.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

/// Acquisition state of the shared converter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcqState {
    Idle,
    Acquiring,
}

pub struct Scheduler {
    state: AcqState,
    active_channel: usize, // Channel being sampled/controlled
    channel_count: usize,

    ctrl_period_ms: u16, // Control tick period
    ui_tick_ms: u16,     // UI tick period
    ui_elapsed_ms: u16,  // Time accumulated towards the next UI tick

    overruns: u32, // Ticks dropped while Acquiring
}

impl Scheduler {
    pub fn new(channel_count: usize, ctrl_period_ms: u16, ui_tick_ms: u16) -> Self {
        Self {
            state: AcqState::Idle,
            active_channel: 0,
            channel_count,
            ctrl_period_ms,
            ui_tick_ms,
            ui_elapsed_ms: 0,
            overruns: 0,
        }
    }

    #[inline(always)]
    pub fn state(&self) -> AcqState {
        self.state
    }

    #[inline(always)]
    pub fn active_channel(&self) -> usize {
        self.active_channel
    }

    /// Ticks dropped because the previous acquisition was still running
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Account one control tick towards the UI rate.
    ///
    /// Returns `true` when a UI tick is due.
    pub fn advance_ui_clock(&mut self) -> bool {
        self.ui_elapsed_ms = self.ui_elapsed_ms.saturating_add(self.ctrl_period_ms);
        if self.ui_elapsed_ms >= self.ui_tick_ms {
            self.ui_elapsed_ms -= self.ui_tick_ms;
            true
        } else {
            false
        }
    }

    /// Idle -> Acquiring on the next channel.
    ///
    /// Returns the new active channel, or `None` when the tick overran a
    /// running acquisition.
    pub fn begin(&mut self) -> Option<usize> {
        if self.state == AcqState::Acquiring {
            self.overruns = self.overruns.wrapping_add(1);
            return None;
        }
        self.active_channel += 1;
        if self.active_channel >= self.channel_count {
            self.active_channel = 0;
        }
        self.state = AcqState::Acquiring;
        Some(self.active_channel)
    }

    /// Acquiring -> Idle.
    ///
    /// Returns `false` for a completion without an acquisition in flight.
    pub fn complete(&mut self) -> bool {
        match self.state {
            AcqState::Acquiring => {
                self.state = AcqState::Idle;
                true
            }
            AcqState::Idle => false,
        }
    }
}
