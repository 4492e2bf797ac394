//! The front-panel machine: Machine aggregate, its bus implementation,
//! the operator state machine, I/O port table and configuration parsing.

pub mod config;
pub mod io;
pub mod panel;
pub mod system;

pub use config::Config;
pub use io::{IoPort, Ports};
pub use panel::{HeadlessPanel, PanelDriver, SwitchEvent};
pub use system::Machine;
