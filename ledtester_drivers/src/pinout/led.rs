//! PWM outputs of the LED current sources, TIM2 channels 1 to 4.
use super::PinDef;
use super::{PinMode, Port};

/// LED channel 0, TIM2_CH1
pub const LED0: PinDef = PinDef {
    port: Port::A,
    pin: 0,
    mode: PinMode::Alt(1),
};

/// LED channel 1, TIM2_CH2
pub const LED1: PinDef = PinDef {
    port: Port::A,
    pin: 1,
    mode: PinMode::Alt(1),
};

/// LED channel 2, TIM2_CH3
pub const LED2: PinDef = PinDef {
    port: Port::B,
    pin: 10,
    mode: PinMode::Alt(1),
};

/// LED channel 3, TIM2_CH4
pub const LED3: PinDef = PinDef {
    port: Port::B,
    pin: 11,
    mode: PinMode::Alt(1),
};
