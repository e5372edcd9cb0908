//! Hardware seams of the engine.
//!
//! The engine never touches registers. The firmware implements these traits on
//! top of the HAL, host tests implement them with simulated hardware.

use crate::analog::GainPath;

/// Input that can be converted by the analog front end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogInput {
    /// One of the current sensing paths of the selected channel
    Path(GainPath),
    /// Internal voltage reference, used to derive the supply voltage
    InternalReference,
}

/// Converter, DMA and multiplexer shared by every channel.
pub trait AnalogFrontEnd {
    /// Drive the multiplexer select lines for `channel`.
    fn select_channel(&mut self, channel: usize);

    /// Wait for the analog input to settle after a multiplexer or path change.
    fn settle_delay(&mut self);

    /// One blocking conversion, returned as a 10-bit code.
    fn read_single(&mut self, input: AnalogInput) -> u16;

    /// Start a DMA batch of `BATCH_LEN` conversions on `path`.
    ///
    /// Completion is reported through `Engine::on_batch_complete`.
    fn start_batch(&mut self, path: GainPath);
}

/// PWM timer driving the channel current regulators.
pub trait DutyOutput {
    /// Write the compare register of `channel`.
    fn set_duty(&mut self, channel: usize, duty: u16);
}
