//! The CPU engine: two decoders (Z80, 8080) over a shared register file.
//!
//! The decoders are instruction-stepped; every handler returns its
//! documented T-state cost. Sub-instruction stop points for the front panel
//! (M1, INTA, INP) are served by the machine's wait hooks on the [`Bus`]
//! seam, not by cycle-stepping the core.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::bus::Bus;
use crate::core::latches::{Control, CpuError, run_state};
use crate::core::panel::PanelState;
use crate::debug::{History, TstateWindow};

pub mod disasm;
mod i8080;
pub mod tables;
mod z80;

/// Flag register bits. C/Z/S/H/P share positions on both CPUs; N and the
/// Y/X copies exist on the Z80 only — on the 8080, bit 1 reads as 1 and
/// bits 3/5 read as 0, an invariant kept after every flag-writing op.
pub mod flag {
    pub const C: u8 = 0x01;
    pub const N: u8 = 0x02;
    pub const PV: u8 = 0x04;
    pub const X: u8 = 0x08;
    pub const H: u8 = 0x10;
    pub const Y: u8 = 0x20;
    pub const Z: u8 = 0x40;
    pub const S: u8 = 0x80;
}

/// Which processor the engine is emulating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Model {
    #[default]
    Z80,
    I8080,
}

/// Active index-register substitution from a DD/FD prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum IndexMode {
    Hl,
    Ix,
    Iy,
}

/// The register file. Z80-only fields are simply unused in 8080 mode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    // Z80 alternate set
    pub a_prime: u8,
    pub f_prime: u8,
    pub b_prime: u8,
    pub c_prime: u8,
    pub d_prime: u8,
    pub e_prime: u8,
    pub h_prime: u8,
    pub l_prime: u8,
    pub ix: u16,
    pub iy: u16,
    pub pc: u16,
    pub sp: u16,
    /// Interrupt vector base.
    pub i: u8,
    /// Refresh register: 7-bit counter, bit 7 preserved across increments.
    pub r: u8,
    pub iff1: bool,
    pub iff2: bool,
    pub int_mode: u8,
    /// Internal address latch (WZ); sources the undocumented Y/X bits
    /// after memory-indirect operations.
    pub memptr: u16,
}

impl Registers {
    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }
    pub fn set_bc(&mut self, v: u16) {
        [self.b, self.c] = v.to_be_bytes();
    }

    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }
    pub fn set_de(&mut self, v: u16) {
        [self.d, self.e] = v.to_be_bytes();
    }

    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }
    pub fn set_hl(&mut self, v: u16) {
        [self.h, self.l] = v.to_be_bytes();
    }

    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.f])
    }
    pub fn set_af(&mut self, v: u16) {
        [self.a, self.f] = v.to_be_bytes();
    }
}

/// Paces the emulation to a configured clock frequency: the run loop may
/// burn at most `tmax` T-states per 10 ms wall-clock slice.
pub struct Throttle {
    tmax: u64,
    slice_t: u64,
    slice_start: Instant,
}

impl Throttle {
    const SLICE: Duration = Duration::from_millis(10);

    pub fn new(mhz: f64) -> Self {
        Self {
            tmax: (mhz * 10_000.0) as u64,
            slice_t: 0,
            slice_start: Instant::now(),
        }
    }

    fn restart(&mut self) {
        self.slice_t = 0;
        self.slice_start = Instant::now();
    }

    fn pace(&mut self, cost: u32) {
        self.slice_t += u64::from(cost);
        if self.slice_t < self.tmax {
            return;
        }
        let elapsed = self.slice_start.elapsed();
        if elapsed < Self::SLICE {
            thread::sleep(Self::SLICE - elapsed);
        }
        self.restart();
    }
}

/// Wall-clock and T-state figures from the most recent `run`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunStats {
    pub wall_us: u64,
    pub t_states: u64,
}

pub struct Cpu {
    pub model: Model,
    pub regs: Registers,
    /// T-state clock.
    pub t: u64,
    /// Total opcode fetches; feeds clock calibration and statistics
    /// without wrapping the 7-bit architectural R counter.
    pub refresh: u64,
    pub halted: bool,
    /// Execute undocumented opcodes instead of trapping them.
    pub undoc_allowed: bool,
    pub history: History,
    pub history_enabled: bool,
    pub twin: TstateWindow,
    pub throttle: Option<Throttle>,
    pub stats: RunStats,
    ctl: Arc<Control>,
    panel: Arc<PanelState>,
    index: IndexMode,
    /// EI takes effect one instruction late.
    int_protection: bool,
    pending_model: Option<Model>,
}

impl Cpu {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            regs: Registers::default(),
            t: 0,
            refresh: 0,
            halted: false,
            undoc_allowed: false,
            history: History::new(),
            history_enabled: false,
            twin: TstateWindow::default(),
            throttle: None,
            stats: RunStats::default(),
            ctl: Arc::new(Control::new()),
            panel: Arc::new(PanelState::new()),
            index: IndexMode::Hl,
            int_protection: false,
            pending_model: None,
        }
    }

    pub fn ctl(&self) -> &Arc<Control> {
        &self.ctl
    }

    pub fn panel(&self) -> &Arc<PanelState> {
        &self.panel
    }

    /// Power-on: registers come up with random contents, like the real
    /// parts. PC is forced to 0 so a freshly loaded program starts.
    pub fn power_on_init(&mut self) {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let r = &mut self.regs;
        r.pc = 0;
        r.sp = rng.r#gen();
        r.a = rng.r#gen();
        r.f = rng.r#gen();
        r.b = rng.r#gen();
        r.c = rng.r#gen();
        r.d = rng.r#gen();
        r.e = rng.r#gen();
        r.h = rng.r#gen();
        r.l = rng.r#gen();
        r.i = 0;
        r.a_prime = rng.r#gen();
        r.f_prime = rng.r#gen();
        r.b_prime = rng.r#gen();
        r.c_prime = rng.r#gen();
        r.d_prime = rng.r#gen();
        r.e_prime = rng.r#gen();
        r.h_prime = rng.r#gen();
        r.l_prime = rng.r#gen();
        r.ix = rng.r#gen();
        r.iy = rng.r#gen();
        r.memptr = rng.r#gen();
        if self.model == Model::I8080 {
            self.fixup_8080_flags();
        }
    }

    /// Hardware reset. Register contents other than the listed ones are
    /// preserved, as on the real parts.
    pub fn reset(&mut self) {
        let r = &mut self.regs;
        r.pc = 0;
        r.iff1 = false;
        r.iff2 = false;
        r.i = 0;
        r.r = 0;
        r.int_mode = 0;
        self.halted = false;
        self.int_protection = false;
        self.ctl.clear_int();
        self.ctl.take_nmi();
    }

    /// Queue a model switch; it takes effect at the next fetch boundary
    /// (the run loop re-enters the other decoder).
    pub fn switch_model(&mut self, to: Model) {
        if to == self.model && self.pending_model.is_none() {
            return;
        }
        self.pending_model = Some(to);
        self.ctl.set_cpu_state(run_state::MODEL_SWITCH);
    }

    fn apply_pending_model(&mut self) {
        if let Some(to) = self.pending_model.take() {
            self.model = to;
            if to == Model::I8080 {
                self.fixup_8080_flags();
            }
        }
    }

    /// 8080 F invariant: bit 1 always set, bits 3/5 always clear.
    fn fixup_8080_flags(&mut self) {
        self.regs.f = (self.regs.f | flag::N) & !(flag::Y | flag::X);
    }

    /// Run until `cpu_state` leaves CONTIN_RUN. A queued model switch
    /// re-enters the loop with the other decoder.
    pub fn run(&mut self, bus: &mut dyn Bus) {
        self.ctl.set_cpu_state(run_state::CONTIN_RUN);
        self.ctl.set_cpu_error(CpuError::None);
        let started = Instant::now();
        let t0 = self.t;
        if let Some(th) = &mut self.throttle {
            th.restart();
        }
        loop {
            self.apply_pending_model();
            while self.ctl.cpu_state() == run_state::CONTIN_RUN {
                self.instruction(bus);
                if self.ctl.cpu_error() != CpuError::None {
                    break;
                }
            }
            if self.ctl.cpu_state() == run_state::MODEL_SWITCH {
                self.ctl.set_cpu_state(run_state::CONTIN_RUN);
                continue;
            }
            break;
        }
        self.stats = RunStats {
            wall_us: started.elapsed().as_micros() as u64,
            t_states: self.t.wrapping_sub(t0),
        };
    }

    /// Execute exactly one instruction, then stop.
    pub fn step(&mut self, bus: &mut dyn Bus) {
        self.ctl.set_cpu_state(run_state::SINGLE_STEP);
        self.ctl.set_cpu_error(CpuError::None);
        self.apply_pending_model();
        self.instruction(bus);
        self.ctl.set_cpu_state(run_state::STOPPED);
    }

    /// One trip through the per-instruction procedure: DMA yield,
    /// interrupt sampling, fetch, execute, bookkeeping.
    fn instruction(&mut self, bus: &mut dyn Bus) {
        while self.ctl.bus_request() {
            let t = bus.bus_ack();
            if t == 0 {
                break;
            }
            self.t = self.t.wrapping_add(t);
        }

        let int_taken = match self.model {
            Model::Z80 => self.sample_ints_z80(bus),
            Model::I8080 => self.sample_ints_8080(bus),
        };
        if int_taken {
            self.panel.set_led_inten(self.regs.iff1);
            return;
        }

        if self.halted {
            // Burn NOP time until an interrupt or the operator wakes us.
            self.t = self.t.wrapping_add(4);
            return;
        }

        let pc0 = self.regs.pc;
        if self.history_enabled {
            self.history.record(&self.regs);
        }
        let cost = match self.model {
            Model::Z80 => self.step_z80(bus),
            Model::I8080 => self.step_8080(bus),
        };
        self.clock_add(pc0, cost);
        self.panel.set_led_inten(self.regs.iff1);
    }

    fn clock_add(&mut self, pc: u16, cost: u32) {
        self.t = self.t.wrapping_add(u64::from(cost));
        self.twin.account(pc, cost);
        if let Some(th) = &mut self.throttle {
            th.pace(cost);
        }
    }

    /// M1 cycle: fetch, bump PC and the refresh counter.
    fn fetch_m1(&mut self, bus: &mut dyn Bus) -> u8 {
        let op = bus.fetch(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.bump_r();
        op
    }

    fn bump_r(&mut self) {
        self.regs.r = (self.regs.r & 0x80) | (self.regs.r.wrapping_add(1) & 0x7F);
        self.refresh += 1;
    }

    fn fetch_operand(&mut self, bus: &mut dyn Bus) -> u8 {
        let v = bus.mem_read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        v
    }

    fn fetch_word(&mut self, bus: &mut dyn Bus) -> u16 {
        let lo = self.fetch_operand(bus);
        let hi = self.fetch_operand(bus);
        u16::from_le_bytes([lo, hi])
    }

    fn push_word(&mut self, bus: &mut dyn Bus, v: u16) {
        let [lo, hi] = v.to_le_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.stack_write(self.regs.sp, hi);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.stack_write(self.regs.sp, lo);
    }

    fn pop_word(&mut self, bus: &mut dyn Bus) -> u16 {
        let lo = bus.stack_read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = bus.stack_read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }

    fn rd_word(&mut self, bus: &mut dyn Bus, addr: u16) -> u16 {
        let lo = bus.mem_read(addr);
        let hi = bus.mem_read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn wr_word(&mut self, bus: &mut dyn Bus, addr: u16, v: u16) {
        let [lo, hi] = v.to_le_bytes();
        bus.mem_write(addr, lo);
        bus.mem_write(addr.wrapping_add(1), hi);
    }

    /// Illegal encoding of `len` bytes: record the trap and stop. PC is
    /// left past the encoding; the reporter backs up to show the bytes.
    fn op_trap(&mut self, len: u8) -> u32 {
        let e = match len {
            1 => CpuError::OpTrap1,
            2 => CpuError::OpTrap2,
            _ => CpuError::OpTrap4,
        };
        self.ctl.set_cpu_error(e);
        self.ctl.set_cpu_state(run_state::STOPPED);
        0
    }

    /// Z80 interrupt sampling at the instruction boundary. Returns true if
    /// an interrupt response consumed this boundary.
    fn sample_ints_z80(&mut self, bus: &mut dyn Bus) -> bool {
        if self.int_protection {
            self.int_protection = false;
            return false;
        }

        if self.ctl.take_nmi() {
            self.leave_halt(bus);
            self.regs.iff1 = false; // IFF2 keeps the pre-NMI state for RETN
            self.bump_r();
            self.push_word(bus, self.regs.pc);
            self.regs.pc = 0x0066;
            self.regs.memptr = self.regs.pc;
            self.t = self.t.wrapping_add(11);
            bus.wait_int_step();
            return true;
        }

        if self.ctl.int_int() && self.regs.iff1 {
            self.leave_halt(bus);
            self.regs.iff1 = false;
            self.regs.iff2 = false;
            let raw = bus.int_ack();
            // Floating bus reads as 0xFF (RST 38h).
            let data = if raw < 0 { 0xFF } else { raw as u8 };
            self.bump_r();
            match self.regs.int_mode {
                0 => {
                    if data & 0xC7 == 0xC7 {
                        self.push_word(bus, self.regs.pc);
                        self.regs.pc = u16::from(data & 0x38);
                        self.t = self.t.wrapping_add(13);
                    } else {
                        self.ctl.set_cpu_error(CpuError::IntError);
                        self.ctl.set_cpu_state(run_state::STOPPED);
                        return true;
                    }
                }
                1 => {
                    self.push_word(bus, self.regs.pc);
                    self.regs.pc = 0x0038;
                    self.t = self.t.wrapping_add(13);
                }
                _ => {
                    let vec = (u16::from(self.regs.i) << 8) | u16::from(data & 0xFE);
                    self.push_word(bus, self.regs.pc);
                    self.regs.pc = self.rd_word(bus, vec);
                    self.t = self.t.wrapping_add(19);
                }
            }
            self.regs.memptr = self.regs.pc;
            self.ctl.clear_int();
            bus.wait_int_step();
            return true;
        }

        false
    }

    /// 8080 interrupt sampling: single mode, behaves like IM 0.
    fn sample_ints_8080(&mut self, bus: &mut dyn Bus) -> bool {
        if self.int_protection {
            self.int_protection = false;
            return false;
        }
        if !(self.ctl.int_int() && self.regs.iff1) {
            return false;
        }
        self.leave_halt(bus);
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        let raw = bus.int_ack();
        let data = if raw < 0 { 0xFF } else { raw as u8 };
        if data & 0xC7 == 0xC7 {
            self.push_word(bus, self.regs.pc);
            self.regs.pc = u16::from(data & 0x38);
            self.t = self.t.wrapping_add(11);
        } else {
            self.ctl.set_cpu_error(CpuError::IntError);
            self.ctl.set_cpu_state(run_state::STOPPED);
            return true;
        }
        self.ctl.clear_int();
        bus.wait_int_step();
        true
    }

    /// 8-bit register by decode index (0=B .. 5=L, 7=A), ignoring any
    /// index prefix. Index 6 is the memory form, handled by callers.
    fn get_r8_plain(&self, idx: u8) -> u8 {
        match idx {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            _ => self.regs.a,
        }
    }

    fn set_r8_plain(&mut self, idx: u8, v: u8) {
        match idx {
            0 => self.regs.b = v,
            1 => self.regs.c = v,
            2 => self.regs.d = v,
            3 => self.regs.e = v,
            4 => self.regs.h = v,
            5 => self.regs.l = v,
            _ => self.regs.a = v,
        }
    }

    /// Condition-code field (NZ, Z, NC, C, PO, PE, P, M).
    fn cc(&self, idx: u8) -> bool {
        let f = self.regs.f;
        match idx {
            0 => f & flag::Z == 0,
            1 => f & flag::Z != 0,
            2 => f & flag::C == 0,
            3 => f & flag::C != 0,
            4 => f & flag::PV == 0,
            5 => f & flag::PV != 0,
            6 => f & flag::S == 0,
            _ => f & flag::S != 0,
        }
    }

    fn leave_halt(&mut self, bus: &mut dyn Bus) {
        if self.halted {
            self.halted = false;
            bus.set_halted(false);
        }
    }

    /// HALT: idle at NOP cost until an interrupt. With interrupts disabled
    /// and nothing pending this can never end, so it surfaces as OPHALT —
    /// which is also how software breakpoints trap.
    fn op_halt(&mut self, bus: &mut dyn Bus, cost: u32) -> u32 {
        if !self.regs.iff1 && !self.ctl.int_int() && !(self.model == Model::Z80 && self.ctl.int_nmi()) {
            self.ctl.set_cpu_error(CpuError::OpHalt);
            self.ctl.set_cpu_state(run_state::STOPPED);
        } else {
            self.halted = true;
            bus.set_halted(true);
        }
        cost
    }
}
