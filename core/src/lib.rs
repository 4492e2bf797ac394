//! Instruction-accurate Z80 / Intel 8080 simulator core.
//!
//! This crate holds the CPU engine (both decoders over a shared register
//! file), the page-attributed memory fabric, the bus status and DMA
//! arbitration types, the shared control latches the operator mutates, the
//! execution history ring, software breakpoints, the T-state window, the
//! disassembler and the snapshot types. Everything UI-shaped (front panel
//! loop, ICE shell, I/O devices) lives in the `machines` and `frontend`
//! crates.

pub mod core;
pub mod cpu;
pub mod debug;
pub mod memory;
pub mod state;

pub use crate::core::bus::Bus;
pub use crate::core::latches::{Control, CpuError};
pub use crate::core::panel::PanelState;
pub use crate::cpu::{Cpu, Model};
pub use crate::memory::{Memory, PageAttr};
