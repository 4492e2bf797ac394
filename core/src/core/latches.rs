//! Shared control latches.
//!
//! These are the words the operator (panel callbacks, ICE commands) writes
//! and the CPU observes at machine-cycle boundaries. Writes use release
//! ordering and reads acquire, so a state transition published by the input
//! thread is fully visible to the CPU loop; no ordering is promised below
//! instruction granularity.

use std::sync::atomic::{AtomicBool, AtomicI16, AtomicU8, AtomicU16, Ordering};

/// `cpu_state` values. RESET is an OR-bit on top of the run state so that
/// holding the reset switch knocks a running CPU out of its loop.
pub mod run_state {
    pub const STOPPED: u8 = 0;
    pub const CONTIN_RUN: u8 = 1;
    pub const SINGLE_STEP: u8 = 2;
    pub const MODEL_SWITCH: u8 = 3;
    pub const RESET: u8 = 0x80;
}

/// `cpu_switch` values driven by the panel loop.
pub mod cpu_switch {
    pub const IDLE: u8 = 0;
    pub const RUN: u8 = 1;
    pub const STEP: u8 = 2;
    pub const WAIT_AT_M1: u8 = 3;
}

/// `reset` latch: what kind of reset the operator is holding.
pub mod reset_mode {
    pub const NONE: u8 = 0;
    pub const CPU_ONLY: u8 = 1;
    pub const COLD: u8 = 2;
}

/// Error status of the CPU emulation, read by the main loop after the CPU
/// loop returns. The CPU never propagates errors any other way.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum CpuError {
    #[default]
    None = 0,
    /// HALT with interrupts disabled and nothing pending.
    OpHalt,
    /// Input from an unmapped I/O port.
    IoTrapIn,
    /// Output to an unmapped I/O port.
    IoTrapOut,
    /// A peripheral requested a clean halt.
    IoHalt,
    /// Fatal peripheral error.
    IoError,
    /// Illegal single-byte opcode.
    OpTrap1,
    /// Illegal two-byte encoding.
    OpTrap2,
    /// Illegal four-byte encoding.
    OpTrap4,
    /// User interrupt (Ctrl-C and friends).
    UserInt,
    /// Unsupported bus data during interrupt acknowledge.
    IntError,
    /// Power switched off or window closed.
    PowerOff,
}

impl CpuError {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::OpHalt,
            2 => Self::IoTrapIn,
            3 => Self::IoTrapOut,
            4 => Self::IoHalt,
            5 => Self::IoError,
            6 => Self::OpTrap1,
            7 => Self::OpTrap2,
            8 => Self::OpTrap4,
            9 => Self::UserInt,
            10 => Self::IntError,
            11 => Self::PowerOff,
            _ => Self::None,
        }
    }
}

/// The shared latch block. One instance per machine, behind an `Arc`; the
/// CPU, the panel input thread and the main loop all hold clones.
#[derive(Default)]
pub struct Control {
    cpu_state: AtomicU8,
    cpu_error: AtomicU8,
    cpu_switch: AtomicU8,
    reset: AtomicU8,
    power: AtomicBool,
    int_int: AtomicBool,
    int_nmi: AtomicBool,
    int_data: AtomicI16,
    bus_request: AtomicBool,
    address_switch: AtomicU16,
    m1_step: AtomicBool,
    trap_port: AtomicU8,
}

impl Control {
    pub fn new() -> Self {
        let ctl = Self::default();
        ctl.int_data.store(-1, Ordering::Relaxed);
        ctl
    }

    pub fn cpu_state(&self) -> u8 {
        self.cpu_state.load(Ordering::Acquire)
    }
    pub fn set_cpu_state(&self, v: u8) {
        self.cpu_state.store(v, Ordering::Release);
    }
    /// OR the RESET bit into `cpu_state` (keeps the underlying run state).
    pub fn raise_reset_state(&self) {
        self.cpu_state.fetch_or(run_state::RESET, Ordering::AcqRel);
    }
    pub fn clear_reset_state(&self) {
        self.cpu_state
            .fetch_and(!run_state::RESET, Ordering::AcqRel);
    }

    pub fn cpu_error(&self) -> CpuError {
        CpuError::from_u8(self.cpu_error.load(Ordering::Acquire))
    }
    pub fn set_cpu_error(&self, e: CpuError) {
        self.cpu_error.store(e as u8, Ordering::Release);
    }

    pub fn cpu_switch(&self) -> u8 {
        self.cpu_switch.load(Ordering::Acquire)
    }
    pub fn set_cpu_switch(&self, v: u8) {
        self.cpu_switch.store(v, Ordering::Release);
    }

    pub fn reset(&self) -> u8 {
        self.reset.load(Ordering::Acquire)
    }
    pub fn set_reset(&self, v: u8) {
        self.reset.store(v, Ordering::Release);
    }

    pub fn power(&self) -> bool {
        self.power.load(Ordering::Acquire)
    }
    pub fn set_power(&self, on: bool) {
        self.power.store(on, Ordering::Release);
    }

    pub fn int_int(&self) -> bool {
        self.int_int.load(Ordering::Acquire)
    }
    /// Raise a maskable interrupt with the byte the device will drive onto
    /// the bus during INTA (-1 when the bus is left floating).
    pub fn raise_int(&self, data: i16) {
        self.int_data.store(data, Ordering::Release);
        self.int_int.store(true, Ordering::Release);
    }
    /// Acknowledge: clear the request and float the bus again.
    pub fn clear_int(&self) {
        self.int_int.store(false, Ordering::Release);
        self.int_data.store(-1, Ordering::Release);
    }
    pub fn int_data(&self) -> i16 {
        self.int_data.load(Ordering::Acquire)
    }

    pub fn int_nmi(&self) -> bool {
        self.int_nmi.load(Ordering::Acquire)
    }
    pub fn raise_nmi(&self) {
        self.int_nmi.store(true, Ordering::Release);
    }
    pub fn take_nmi(&self) -> bool {
        self.int_nmi.swap(false, Ordering::AcqRel)
    }

    pub fn bus_request(&self) -> bool {
        self.bus_request.load(Ordering::Acquire)
    }
    pub fn set_bus_request(&self, v: bool) {
        self.bus_request.store(v, Ordering::Release);
    }

    pub fn address_switch(&self) -> u16 {
        self.address_switch.load(Ordering::Acquire)
    }
    pub fn set_address_switch(&self, v: u16) {
        self.address_switch.store(v, Ordering::Release);
    }

    pub fn m1_step(&self) -> bool {
        self.m1_step.load(Ordering::Acquire)
    }
    pub fn set_m1_step(&self, v: bool) {
        self.m1_step.store(v, Ordering::Release);
    }

    /// Port number recorded by an I/O trap, for the error report.
    pub fn trap_port(&self) -> u8 {
        self.trap_port.load(Ordering::Acquire)
    }
    pub fn set_trap_port(&self, p: u8) {
        self.trap_port.store(p, Ordering::Release);
    }
}
