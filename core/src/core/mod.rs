pub mod bus;
pub mod latches;
pub mod panel;

pub use bus::{Bus, BusArbiter, BusDmaMode, DmaMaster};
pub use latches::{Control, CpuError};
pub use panel::PanelState;
