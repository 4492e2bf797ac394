//! Z80 decoder: main opcode page, prefix handling, ED page, I/O and
//! interrupt-control opcodes. ALU, loads, branches, bit and block
//! instructions live in the sibling modules.
//!
//! Handlers return their documented T-state cost. DD/FD costs compose: the
//! prefix fetch itself is 4 T, a displacement read adds 8 T to the base
//! (HL) form, which lands every indexed instruction on its documented
//! total.

mod alu;
mod bit;
mod block;
mod branch;
mod load_store;

use crate::core::bus::Bus;
use crate::cpu::{Cpu, IndexMode, flag, tables};

impl Cpu {
    pub(crate) fn step_z80(&mut self, bus: &mut dyn Bus) -> u32 {
        let mut t = 0u32;
        let mut op = self.fetch_m1(bus);
        loop {
            match op {
                0xDD => {
                    self.index = IndexMode::Ix;
                    t += 4;
                    op = self.fetch_m1(bus);
                }
                0xFD => {
                    self.index = IndexMode::Iy;
                    t += 4;
                    op = self.fetch_m1(bus);
                }
                _ => break,
            }
        }
        if self.index != IndexMode::Hl && !self.undoc_allowed && !prefix_documented(op) {
            self.index = IndexMode::Hl;
            return self.op_trap(2);
        }
        t += self.exec_z80(op, bus);
        self.index = IndexMode::Hl;
        t
    }

    fn exec_z80(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        match op {
            0x00 => 4, // NOP
            0x76 => self.op_halt(bus, 4),

            0xCB => self.exec_cb(bus),
            0xED => self.exec_ed(bus),

            // --- Load/store and exchanges ---
            0x02 => self.op_ld_bc_a(bus),
            0x12 => self.op_ld_de_a(bus),
            0x0A => self.op_ld_a_bc(bus),
            0x1A => self.op_ld_a_de(bus),
            0x22 => self.op_ld_nn_hl(bus),
            0x2A => self.op_ld_hl_nn(bus),
            0x32 => self.op_ld_nn_a(bus),
            0x3A => self.op_ld_a_nn(bus),
            0xF9 => self.op_ld_sp_hl(),
            0x08 => self.op_ex_af_af(),
            0xD9 => self.op_exx(),
            0xEB => self.op_ex_de_hl(),
            0xE3 => self.op_ex_sp_hl(bus),
            op if op & 0xCF == 0x01 => self.op_ld_rr_nn(op, bus),
            op if op & 0xC7 == 0x06 => self.op_ld_r_n(op, bus),
            op if op & 0xC0 == 0x40 => self.op_ld_r_r(op, bus),

            // --- Stack ---
            op if op & 0xCF == 0xC5 => self.op_push(op, bus),
            op if op & 0xCF == 0xC1 => self.op_pop(op, bus),

            // --- ALU ---
            op if op & 0xC0 == 0x80 => self.op_alu_r(op, bus),
            op if op & 0xC7 == 0xC6 => self.op_alu_n(op, bus),
            op if op & 0xC7 == 0x04 => self.op_inc_dec_r(op, bus),
            op if op & 0xC7 == 0x05 => self.op_inc_dec_r(op, bus),
            op if op & 0xCF == 0x09 => self.op_add_hl_rr(op),
            op if op & 0xCF == 0x03 => self.op_inc_dec_rr(op),
            op if op & 0xCF == 0x0B => self.op_inc_dec_rr(op),
            0x07 => self.op_rlca(),
            0x0F => self.op_rrca(),
            0x17 => self.op_rla(),
            0x1F => self.op_rra(),
            0x27 => self.op_daa(),
            0x2F => self.op_cpl(),
            0x37 => self.op_scf(),
            0x3F => self.op_ccf(),

            // --- Control flow ---
            0xC3 => self.op_jp(bus, None),
            0xE9 => self.op_jp_hl(),
            0x18 => self.op_jr(bus, None),
            0x10 => self.op_djnz(bus),
            0xCD => self.op_call(bus, None),
            0xC9 => self.op_ret(bus),
            op if op & 0xC7 == 0xC2 => self.op_jp(bus, Some((op >> 3) & 7)),
            op if op & 0xE7 == 0x20 => self.op_jr(bus, Some((op >> 3) & 3)),
            op if op & 0xC7 == 0xC4 => self.op_call(bus, Some((op >> 3) & 7)),
            op if op & 0xC7 == 0xC0 => self.op_ret_cc(op, bus),
            op if op & 0xC7 == 0xC7 => self.op_rst(op, bus),

            // --- I/O, interrupt control ---
            0xDB => self.op_in_a_n(bus),
            0xD3 => self.op_out_n_a(bus),
            0xF3 => self.op_di(),
            0xFB => self.op_ei(),

            _ => unreachable!("unhandled opcode {op:#04x}"),
        }
    }

    /// ED page. Holes act as 8 T NOPs on silicon; without `-u` they trap.
    fn exec_ed(&mut self, bus: &mut dyn Bus) -> u32 {
        // ED supersedes a dangling DD/FD prefix.
        self.index = IndexMode::Hl;
        let op = self.fetch_m1(bus);
        match op {
            0x47 => self.op_ld_i_a(),
            0x4F => self.op_ld_r_a(),
            0x57 => self.op_ld_a_i(),
            0x5F => self.op_ld_a_r(),
            0x67 => self.op_rrd(bus),
            0x6F => self.op_rld(bus),

            0xA0 => self.op_ldi_ldd(bus, false),
            0xA8 => self.op_ldi_ldd(bus, true),
            0xB0 => self.op_ldir_lddr(bus, false),
            0xB8 => self.op_ldir_lddr(bus, true),
            0xA1 => self.op_cpi_cpd(bus, false),
            0xA9 => self.op_cpi_cpd(bus, true),
            0xB1 => self.op_cpir_cpdr(bus, false),
            0xB9 => self.op_cpir_cpdr(bus, true),
            0xA2 => self.op_ini_ind(bus, false),
            0xAA => self.op_ini_ind(bus, true),
            0xB2 => self.op_inir_indr(bus, false),
            0xBA => self.op_inir_indr(bus, true),
            0xA3 => self.op_outi_outd(bus, false),
            0xAB => self.op_outi_outd(bus, true),
            0xB3 => self.op_otir_otdr(bus, false),
            0xBB => self.op_otir_otdr(bus, true),

            op if op & 0xC7 == 0x40 => self.op_in_r_c(op, bus),
            op if op & 0xC7 == 0x41 => self.op_out_c_r(op, bus),
            op if op & 0xCF == 0x42 => self.op_sbc_hl_rr(op),
            op if op & 0xCF == 0x4A => self.op_adc_hl_rr(op),
            op if op & 0xCF == 0x43 => self.op_ld_nn_rr_ed(op, bus),
            op if op & 0xCF == 0x4B => self.op_ld_rr_nn_ed(op, bus),
            op if op & 0xC7 == 0x44 => self.op_neg(),
            op if op & 0xC7 == 0x45 => self.op_retn_reti(bus),
            op if op & 0xC7 == 0x46 => self.op_im(op),

            _ => {
                if self.undoc_allowed {
                    8
                } else {
                    self.op_trap(2)
                }
            }
        }
    }

    // --- Index-aware register access ------------------------------------

    /// 8-bit register by decode index; under a DD/FD prefix, H and L mean
    /// the index-register halves (undocumented IXH/IXL/IYH/IYL).
    pub(crate) fn get_r8(&self, idx: u8) -> u8 {
        match (idx, self.index) {
            (4, IndexMode::Ix) => (self.regs.ix >> 8) as u8,
            (5, IndexMode::Ix) => self.regs.ix as u8,
            (4, IndexMode::Iy) => (self.regs.iy >> 8) as u8,
            (5, IndexMode::Iy) => self.regs.iy as u8,
            _ => self.get_r8_plain(idx),
        }
    }

    pub(crate) fn set_r8(&mut self, idx: u8, v: u8) {
        match (idx, self.index) {
            (4, IndexMode::Ix) => self.regs.ix = (self.regs.ix & 0x00FF) | (u16::from(v) << 8),
            (5, IndexMode::Ix) => self.regs.ix = (self.regs.ix & 0xFF00) | u16::from(v),
            (4, IndexMode::Iy) => self.regs.iy = (self.regs.iy & 0x00FF) | (u16::from(v) << 8),
            (5, IndexMode::Iy) => self.regs.iy = (self.regs.iy & 0xFF00) | u16::from(v),
            _ => self.set_r8_plain(idx, v),
        }
    }

    /// 16-bit pair by decode index (0=BC, 1=DE, 2=HL/IX/IY, 3=SP).
    pub(crate) fn get_rp(&self, idx: u8) -> u16 {
        match idx {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.hl_idx(),
            _ => self.regs.sp,
        }
    }

    pub(crate) fn set_rp(&mut self, idx: u8, v: u16) {
        match idx {
            0 => self.regs.set_bc(v),
            1 => self.regs.set_de(v),
            2 => self.set_hl_idx(v),
            _ => self.regs.sp = v,
        }
    }

    /// PUSH/POP variant: index 3 is AF.
    pub(crate) fn get_rp_af(&self, idx: u8) -> u16 {
        if idx == 3 {
            self.regs.af()
        } else {
            self.get_rp(idx)
        }
    }

    pub(crate) fn set_rp_af(&mut self, idx: u8, v: u16) {
        if idx == 3 {
            self.regs.set_af(v);
        } else {
            self.set_rp(idx, v);
        }
    }

    /// HL, or the active index register under a prefix.
    pub(crate) fn hl_idx(&self) -> u16 {
        match self.index {
            IndexMode::Hl => self.regs.hl(),
            IndexMode::Ix => self.regs.ix,
            IndexMode::Iy => self.regs.iy,
        }
    }

    pub(crate) fn set_hl_idx(&mut self, v: u16) {
        match self.index {
            IndexMode::Hl => self.regs.set_hl(v),
            IndexMode::Ix => self.regs.ix = v,
            IndexMode::Iy => self.regs.iy = v,
        }
    }

    /// Effective address for the (HL) / (IX+d) / (IY+d) operand, plus the
    /// extra T-states the displacement read costs. Updates WZ for the
    /// indexed forms.
    pub(crate) fn ea_hl(&mut self, bus: &mut dyn Bus) -> (u16, u32) {
        match self.index {
            IndexMode::Hl => (self.regs.hl(), 0),
            _ => {
                let d = self.fetch_operand(bus) as i8;
                let addr = self.hl_idx().wrapping_add(d as u16);
                self.regs.memptr = addr;
                (addr, 8)
            }
        }
    }

    // --- I/O and interrupt-control opcodes ------------------------------

    /// IN A,(n) — 11 T. No flags.
    fn op_in_a_n(&mut self, bus: &mut dyn Bus) -> u32 {
        let port = self.fetch_operand(bus);
        self.regs.memptr = ((u16::from(self.regs.a) << 8) | u16::from(port)).wrapping_add(1);
        self.regs.a = bus.io_read(port);
        11
    }

    /// OUT (n),A — 11 T.
    fn op_out_n_a(&mut self, bus: &mut dyn Bus) -> u32 {
        let port = self.fetch_operand(bus);
        self.regs.memptr = (u16::from(self.regs.a) << 8) | u16::from(port.wrapping_add(1));
        bus.io_write(port, self.regs.a);
        11
    }

    /// IN r,(C) — 12 T. ED 70 reads the port for flags only.
    fn op_in_r_c(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let r = (op >> 3) & 7;
        if r == 6 && !self.undoc_allowed {
            return self.op_trap(2);
        }
        let v = bus.io_read(self.regs.c);
        if r != 6 {
            self.set_r8_plain(r, v);
        }
        self.regs.f = (self.regs.f & flag::C) | tables::SZYXP[v as usize];
        self.regs.memptr = self.regs.bc().wrapping_add(1);
        12
    }

    /// OUT (C),r — 12 T. ED 71 drives 0 onto the bus.
    fn op_out_c_r(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let r = (op >> 3) & 7;
        if r == 6 && !self.undoc_allowed {
            return self.op_trap(2);
        }
        let v = if r == 6 { 0 } else { self.get_r8_plain(r) };
        bus.io_write(self.regs.c, v);
        self.regs.memptr = self.regs.bc().wrapping_add(1);
        12
    }

    /// DI — 4 T.
    fn op_di(&mut self) -> u32 {
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        4
    }

    /// EI — 4 T. Interrupts stay masked for one more instruction.
    fn op_ei(&mut self) -> u32 {
        self.regs.iff1 = true;
        self.regs.iff2 = true;
        self.int_protection = true;
        4
    }

    /// IM 0/1/2 — 8 T (with the undocumented ED aliases).
    fn op_im(&mut self, op: u8) -> u32 {
        self.regs.int_mode = match (op >> 3) & 7 {
            2 | 6 => 1,
            3 | 7 => 2,
            _ => 0,
        };
        8
    }

    /// LD I,A — 9 T.
    fn op_ld_i_a(&mut self) -> u32 {
        self.regs.i = self.regs.a;
        9
    }

    /// LD R,A — 9 T. Loads all 8 bits, including the preserved bit 7.
    fn op_ld_r_a(&mut self) -> u32 {
        self.regs.r = self.regs.a;
        9
    }

    /// LD A,I — 9 T. P/V reflects IFF2.
    fn op_ld_a_i(&mut self) -> u32 {
        self.regs.a = self.regs.i;
        self.iff2_flags();
        9
    }

    /// LD A,R — 9 T. P/V reflects IFF2.
    fn op_ld_a_r(&mut self) -> u32 {
        self.regs.a = self.regs.r;
        self.iff2_flags();
        9
    }

    fn iff2_flags(&mut self) {
        let mut f = (self.regs.f & flag::C) | tables::SZYX[self.regs.a as usize];
        if self.regs.iff2 {
            f |= flag::PV;
        }
        self.regs.f = f;
    }
}

/// Main-page opcodes that are documented under a DD/FD prefix (everything
/// touching HL or the (HL) operand). Anything else with a prefix is
/// undocumented territory.
fn prefix_documented(op: u8) -> bool {
    matches!(
        op,
        0x09 | 0x19
            | 0x29
            | 0x39
            | 0x21
            | 0x22
            | 0x23
            | 0x2A
            | 0x2B
            | 0x34
            | 0x35
            | 0x36
            | 0xCB
            | 0xE1
            | 0xE3
            | 0xE5
            | 0xE9
            | 0xF9
    ) || (op & 0xC0 == 0x40 && op != 0x76 && (op & 7 == 6 || (op >> 3) & 7 == 6))
        || op & 0xC7 == 0x86
}
