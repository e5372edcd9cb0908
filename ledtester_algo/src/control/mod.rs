pub mod channel;
pub mod controller;
pub mod settling;

pub use channel::ChannelState;
pub use controller::{ControlOutcome, ControlStatus, CurrentController};
pub use settling::SettlingAccumulator;
