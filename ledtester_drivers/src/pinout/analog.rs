//! Converter inputs: the three gain paths of the multiplexed sense signal.
use super::PinDef;
use super::{PinMode, Port};

/// High-gain amplifier output (x49), ADC1_IN4
pub const HIGH_GAIN: PinDef = PinDef {
    port: Port::A,
    pin: 3,
    mode: PinMode::Analog,
};

/// Mid-gain amplifier output (x4.9), ADC1_IN15
pub const MID_GAIN: PinDef = PinDef {
    port: Port::B,
    pin: 0,
    mode: PinMode::Analog,
};

/// Unamplified sense resistor voltage, ADC1_IN3
pub const DIRECT_SENSE: PinDef = PinDef {
    port: Port::A,
    pin: 2,
    mode: PinMode::Analog,
};

pub const HIGH_GAIN_CH: u8 = 4;
pub const MID_GAIN_CH: u8 = 15;
pub const DIRECT_SENSE_CH: u8 = 3;
/// Internal voltage reference
pub const VREFINT_CH: u8 = 18;
