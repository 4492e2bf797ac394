//! Z80 loads, exchanges and stack operations.

use crate::core::bus::Bus;
use crate::cpu::{Cpu, IndexMode};

impl Cpu {
    /// LD r,r' — 4 T; memory forms 7 T. Under DD/FD the register forms
    /// substitute the index halves, the memory forms keep plain H/L.
    pub(super) fn op_ld_r_r(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let dst = (op >> 3) & 7;
        let src = op & 7;
        if src == 6 {
            let (addr, extra) = self.ea_hl(bus);
            let v = bus.mem_read(addr);
            self.set_r8_plain(dst, v);
            7 + extra
        } else if dst == 6 {
            let (addr, extra) = self.ea_hl(bus);
            bus.mem_write(addr, self.get_r8_plain(src));
            7 + extra
        } else {
            let v = self.get_r8(src);
            self.set_r8(dst, v);
            4
        }
    }

    /// LD r,n — 7 T; LD (HL),n 10 T; LD (IX+d),n 19 T total.
    pub(super) fn op_ld_r_n(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let dst = (op >> 3) & 7;
        if dst == 6 {
            if self.index == IndexMode::Hl {
                let n = self.fetch_operand(bus);
                bus.mem_write(self.regs.hl(), n);
                10
            } else {
                // Displacement precedes the immediate on the wire.
                let d = self.fetch_operand(bus) as i8;
                let addr = self.hl_idx().wrapping_add(d as u16);
                self.regs.memptr = addr;
                let n = self.fetch_operand(bus);
                bus.mem_write(addr, n);
                15
            }
        } else {
            let n = self.fetch_operand(bus);
            self.set_r8(dst, n);
            7
        }
    }

    /// LD A,(BC) — 7 T.
    pub(super) fn op_ld_a_bc(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.regs.bc();
        self.regs.a = bus.mem_read(addr);
        self.regs.memptr = addr.wrapping_add(1);
        7
    }

    /// LD A,(DE) — 7 T.
    pub(super) fn op_ld_a_de(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.regs.de();
        self.regs.a = bus.mem_read(addr);
        self.regs.memptr = addr.wrapping_add(1);
        7
    }

    /// LD (BC),A — 7 T. WZ: A on the high byte, addr+1 low.
    pub(super) fn op_ld_bc_a(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.regs.bc();
        bus.mem_write(addr, self.regs.a);
        self.regs.memptr =
            (u16::from(self.regs.a) << 8) | (addr.wrapping_add(1) & 0x00FF);
        7
    }

    /// LD (DE),A — 7 T.
    pub(super) fn op_ld_de_a(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.regs.de();
        bus.mem_write(addr, self.regs.a);
        self.regs.memptr =
            (u16::from(self.regs.a) << 8) | (addr.wrapping_add(1) & 0x00FF);
        7
    }

    /// LD A,(nn) — 13 T.
    pub(super) fn op_ld_a_nn(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.fetch_word(bus);
        self.regs.a = bus.mem_read(addr);
        self.regs.memptr = addr.wrapping_add(1);
        13
    }

    /// LD (nn),A — 13 T.
    pub(super) fn op_ld_nn_a(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.fetch_word(bus);
        bus.mem_write(addr, self.regs.a);
        self.regs.memptr =
            (u16::from(self.regs.a) << 8) | (addr.wrapping_add(1) & 0x00FF);
        13
    }

    /// LD rr,nn — 10 T.
    pub(super) fn op_ld_rr_nn(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let v = self.fetch_word(bus);
        self.set_rp((op >> 4) & 3, v);
        10
    }

    /// LD HL,(nn) — 16 T.
    pub(super) fn op_ld_hl_nn(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.fetch_word(bus);
        let v = self.rd_word(bus, addr);
        self.set_hl_idx(v);
        self.regs.memptr = addr.wrapping_add(1);
        16
    }

    /// LD (nn),HL — 16 T.
    pub(super) fn op_ld_nn_hl(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.fetch_word(bus);
        let v = self.hl_idx();
        self.wr_word(bus, addr, v);
        self.regs.memptr = addr.wrapping_add(1);
        16
    }

    /// ED LD rr,(nn) — 20 T.
    pub(super) fn op_ld_rr_nn_ed(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let addr = self.fetch_word(bus);
        let v = self.rd_word(bus, addr);
        self.set_rp((op >> 4) & 3, v);
        self.regs.memptr = addr.wrapping_add(1);
        20
    }

    /// ED LD (nn),rr — 20 T.
    pub(super) fn op_ld_nn_rr_ed(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let addr = self.fetch_word(bus);
        let v = self.get_rp((op >> 4) & 3);
        self.wr_word(bus, addr, v);
        self.regs.memptr = addr.wrapping_add(1);
        20
    }

    /// LD SP,HL — 6 T.
    pub(super) fn op_ld_sp_hl(&mut self) -> u32 {
        self.regs.sp = self.hl_idx();
        6
    }

    /// EX AF,AF' — 4 T.
    pub(super) fn op_ex_af_af(&mut self) -> u32 {
        std::mem::swap(&mut self.regs.a, &mut self.regs.a_prime);
        std::mem::swap(&mut self.regs.f, &mut self.regs.f_prime);
        4
    }

    /// EX DE,HL — 4 T. Not index-affected.
    pub(super) fn op_ex_de_hl(&mut self) -> u32 {
        std::mem::swap(&mut self.regs.d, &mut self.regs.h);
        std::mem::swap(&mut self.regs.e, &mut self.regs.l);
        4
    }

    /// EXX — 4 T.
    pub(super) fn op_exx(&mut self) -> u32 {
        std::mem::swap(&mut self.regs.b, &mut self.regs.b_prime);
        std::mem::swap(&mut self.regs.c, &mut self.regs.c_prime);
        std::mem::swap(&mut self.regs.d, &mut self.regs.d_prime);
        std::mem::swap(&mut self.regs.e, &mut self.regs.e_prime);
        std::mem::swap(&mut self.regs.h, &mut self.regs.h_prime);
        std::mem::swap(&mut self.regs.l, &mut self.regs.l_prime);
        4
    }

    /// EX (SP),HL — 19 T.
    pub(super) fn op_ex_sp_hl(&mut self, bus: &mut dyn Bus) -> u32 {
        let sp = self.regs.sp;
        let lo = bus.stack_read(sp);
        let hi = bus.stack_read(sp.wrapping_add(1));
        let old = self.hl_idx();
        bus.stack_write(sp, old as u8);
        bus.stack_write(sp.wrapping_add(1), (old >> 8) as u8);
        let v = u16::from_le_bytes([lo, hi]);
        self.set_hl_idx(v);
        self.regs.memptr = v;
        19
    }

    /// PUSH rr — 11 T.
    pub(super) fn op_push(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let v = self.get_rp_af((op >> 4) & 3);
        self.push_word(bus, v);
        11
    }

    /// POP rr — 10 T.
    pub(super) fn op_pop(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let v = self.pop_word(bus);
        self.set_rp_af((op >> 4) & 3, v);
        10
    }
}
