//! Select lines of the analog multiplexer in front of the sense amplifiers.
//! Channel bit 0 drives SEL1, bit 1 drives SEL2.
use super::PinDef;
use super::{PinMode, Port};

pub const SEL1: PinDef = PinDef {
    port: Port::B,
    pin: 2,
    mode: PinMode::Output,
};

pub const SEL2: PinDef = PinDef {
    port: Port::A,
    pin: 4,
    mode: PinMode::Output,
};
