pub mod calibration;
pub mod gain_path;
pub mod range_selector;
pub mod sampler;

pub use calibration::Calibration;
pub use gain_path::GainPath;
pub use range_selector::RangeSelector;
pub use sampler::Reading;
