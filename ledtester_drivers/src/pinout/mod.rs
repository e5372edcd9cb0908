use hal::gpio::{Pin, PinMode, Port};

pub mod analog;
pub mod led;
pub mod mux;

/// Represents the definition of a GPIO pin.
pub struct PinDef {
    /// The port to which the pin belongs (e.g., Port::A, Port::B).
    port: Port,
    /// The pin number within the port.
    pin: u8,
    /// The mode of the pin (e.g., Output, Analog, Alternate function).
    mode: PinMode,
}

impl PinDef {
    /// Configures the pin described by this definition.
    /// # Example
    /// ```ignore
    /// let mut sel1 = mux::SEL1.init();
    /// sel1.set_high();
    /// ```
    pub fn init(&self) -> Pin {
        Pin::new(self.port, self.pin, self.mode)
    }
}
