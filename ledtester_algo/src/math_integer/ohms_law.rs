use crate::config::ADC_BITS;

/// Convert a converter code to a voltage in 10 µV units.
///
/// # Arguments
/// * `code` - Converter code [u16]
/// * `vcc_10uv` - Full-scale (supply) voltage in 10 µV units [u32]
///
/// # Returns
/// The voltage in 10 µV units [u32]
pub const fn code_to_10uv(code: u16, vcc_10uv: u32) -> u32 {
    // Full scale is 2^ADC_BITS codes
    (vcc_10uv.saturating_mul(code as u32)) >> ADC_BITS
}

/// Calculate current in microamps (µA) from voltage (10 µV) and resistance (Ω).
///
/// # Arguments
/// * `voltage_10uv` - The voltage in 10 µV units [u32]
/// * `resistance_ohm` - The resistance in ohms [u32]
///
/// # Returns
/// The current in microamps [u32]
pub const fn current_ua(voltage_10uv: u32, resistance_ohm: u32) -> u32 {
    // I = V / R, ensuring we prevent division by zero
    if resistance_ohm == 0 {
        0
    } else {
        10 * (voltage_10uv / resistance_ohm)
    }
}
