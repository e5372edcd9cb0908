//! Closed-loop current regulation and auto-ranging measurement engine of a
//! multi-channel LED tester.
//!
//! One converter (with DMA) and one PWM timer are time-multiplexed over
//! [`LED_NUM`](config::LED_NUM) channels. Every control tick the next channel
//! is selected, the gain path is picked from a quick probe and a batch
//! acquisition is started; the batch completion averages the codes, converts
//! them to a current and runs the incremental controller of that channel.
//!
//! The engine is hardware-free: the firmware drives it from its interrupt
//! handlers through [`Engine::on_tick`] and [`Engine::on_batch_complete`] and
//! implements the [`ports`] traits on top of the HAL.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

pub mod analog;
pub mod config;
pub mod control;
pub mod math_integer;
pub mod ports;
pub mod scheduler;

use analog::{sampler, Calibration, GainPath, RangeSelector};
use config::{EngineConfig, LED_NUM};
use control::{ChannelState, ControlOutcome, CurrentController};
use ports::{AnalogFrontEnd, DutyOutput};
use scheduler::{AcqState, Scheduler};

/// What a control tick started
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Acquisition {
    /// Batch running on `channel` through `path`
    Started { channel: usize, path: GainPath },
    /// Previous acquisition still running, tick dropped
    Overrun,
}

/// Result of one control tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickOutcome {
    pub acquisition: Acquisition,
    /// The slower UI-rate tick is due
    pub ui_tick: bool,
}

/// Engine state: every channel, the calibration and the scheduler.
pub struct Engine {
    config: EngineConfig,
    channels: [ChannelState; LED_NUM],
    calibration: Calibration,

    scheduler: Scheduler,
    range: RangeSelector,
    controller: CurrentController,

    active_path: GainPath, // Path of the acquisition in flight
}

impl Engine {
    /// Create an engine with zero goals and duties.
    ///
    /// The calibration starts at nominal values until [`Engine::calibrate`] runs.
    pub fn new(config: EngineConfig) -> Self {
        debug_assert!(config.reference_channel < LED_NUM);
        debug_assert!(config.settle_window_shift < u16::BITS);
        debug_assert!(config.settle_window_len().checked_mul(config.settle_max_windows).is_some());
        debug_assert!(config.ui_tick_ms > 0);

        let mut channels = [ChannelState::new(); LED_NUM];
        channels[config.reference_channel] = ChannelState::with_settling();

        Self {
            config,
            channels,
            calibration: Calibration::default(),

            scheduler: Scheduler::new(LED_NUM, config.ctrl_period_ms, config.ui_tick_ms),
            range: RangeSelector::new(config.probe_low, config.probe_mid),
            controller: CurrentController::new(config),

            active_path: GainPath::default(),
        }
    }

    /// Measure supply voltage and zero offsets with every output off.
    ///
    /// Every channel resumes active control afterwards, fixed duties included.
    /// Must run before the control tick is started; may run again later to
    /// re-calibrate while the tick is stopped.
    pub fn calibrate<A: AnalogFrontEnd, P: DutyOutput>(
        &mut self,
        adc: &mut A,
        pwm: &mut P,
    ) -> &Calibration {
        for (channel, state) in self.channels.iter_mut().enumerate() {
            state.release();
            pwm.set_duty(channel, 0);
        }

        self.calibration = Calibration::measure(adc);
        info!(
            "calibration: vcc={}x10uV zero=[{}, {}, {}]",
            self.calibration.vcc_10uv(),
            self.calibration.zero_offset(GainPath::HighGain),
            self.calibration.zero_offset(GainPath::MidGain),
            self.calibration.zero_offset(GainPath::DirectSense)
        );
        &self.calibration
    }

    /// Periodic control tick: start the acquisition of the next channel.
    pub fn on_tick<A: AnalogFrontEnd>(&mut self, adc: &mut A) -> TickOutcome {
        let ui_tick = self.scheduler.advance_ui_clock();

        let acquisition = match self.scheduler.begin() {
            Some(channel) => {
                adc.select_channel(channel);
                adc.settle_delay();
                let path = self.range.select(adc);
                self.active_path = path;
                adc.start_batch(path);
                Acquisition::Started { channel, path }
            }
            None => {
                warn!("tick overran acquisition ({} total)", self.scheduler.overruns());
                Acquisition::Overrun
            }
        };

        TickOutcome {
            acquisition,
            ui_tick,
        }
    }

    /// Batch completion: convert the batch, update the active channel and
    /// apply its duty.
    ///
    /// Returns `None` when no acquisition was in flight.
    pub fn on_batch_complete<P: DutyOutput>(
        &mut self,
        batch: &[u16],
        pwm: &mut P,
    ) -> Option<ControlOutcome> {
        if !self.scheduler.complete() {
            return None;
        }

        let channel = self.scheduler.active_channel();
        let reading = sampler::sample(batch, self.active_path, &self.calibration);

        let state = &mut self.channels[channel];
        state.record(reading);
        let outcome = self.controller.update(state, reading.current_ua);
        pwm.set_duty(channel, outcome.duty);
        Some(outcome)
    }

    /// Set the target current of `channel`, clamped to the configured maximum.
    ///
    /// Resumes active control of a channel whose duty was fixed.
    pub fn set_goal_current(&mut self, channel: usize, goal_ua: u16) {
        let goal_ua = goal_ua.min(self.config.goal_max_ua);
        if self.channels[channel].set_goal(goal_ua) {
            debug!("ch{}: goal {}uA", channel, goal_ua);
        }
    }

    pub fn goal_current(&self, channel: usize) -> u16 {
        self.channels[channel].goal_current()
    }

    /// Last measured current of `channel` in µA
    pub fn measured_current(&self, channel: usize) -> u16 {
        self.channels[channel].measured_current()
    }

    /// Last averaged raw code of `channel`
    pub fn last_raw_code(&self, channel: usize) -> u16 {
        self.channels[channel].last_raw_code()
    }

    /// Gain path of the last acquisition of `channel`
    pub fn last_gain(&self, channel: usize) -> GainPath {
        self.channels[channel].last_gain()
    }

    pub fn duty(&self, channel: usize) -> u16 {
        self.channels[channel].duty()
    }

    /// Duty of `channel` is fixed by settling detection
    pub fn is_fixed(&self, channel: usize) -> bool {
        self.channels[channel].is_fixed()
    }

    pub fn channel(&self, channel: usize) -> &ChannelState {
        &self.channels[channel]
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn active_channel(&self) -> usize {
        self.scheduler.active_channel()
    }

    pub fn state(&self) -> AcqState {
        self.scheduler.state()
    }

    /// Ticks dropped because an acquisition was still running
    pub fn overruns(&self) -> u32 {
        self.scheduler.overruns()
    }
}
