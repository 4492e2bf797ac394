//! Z80 jumps, calls, returns and restarts.

use crate::core::bus::Bus;
use crate::cpu::Cpu;

impl Cpu {
    /// JP nn / JP cc,nn — 10 T either way; the target word is always read.
    pub(super) fn op_jp(&mut self, bus: &mut dyn Bus, cond: Option<u8>) -> u32 {
        let target = self.fetch_word(bus);
        self.regs.memptr = target;
        if cond.is_none_or(|c| self.cc(c)) {
            self.regs.pc = target;
        }
        10
    }

    /// JP (HL) — 4 T (JP (IX)/(IY) under prefix).
    pub(super) fn op_jp_hl(&mut self) -> u32 {
        self.regs.pc = self.hl_idx();
        4
    }

    /// JR e — 12 T; JR cc,e 12 T taken, 7 T not.
    pub(super) fn op_jr(&mut self, bus: &mut dyn Bus, cond: Option<u8>) -> u32 {
        let d = self.fetch_operand(bus) as i8;
        if cond.is_none_or(|c| self.cc(c)) {
            self.regs.pc = self.regs.pc.wrapping_add(d as u16);
            self.regs.memptr = self.regs.pc;
            12
        } else {
            7
        }
    }

    /// DJNZ e — 13 T taken, 8 T when B reaches zero.
    pub(super) fn op_djnz(&mut self, bus: &mut dyn Bus) -> u32 {
        let d = self.fetch_operand(bus) as i8;
        self.regs.b = self.regs.b.wrapping_sub(1);
        if self.regs.b != 0 {
            self.regs.pc = self.regs.pc.wrapping_add(d as u16);
            self.regs.memptr = self.regs.pc;
            13
        } else {
            8
        }
    }

    /// CALL nn — 17 T; CALL cc,nn 17/10 T.
    pub(super) fn op_call(&mut self, bus: &mut dyn Bus, cond: Option<u8>) -> u32 {
        let target = self.fetch_word(bus);
        self.regs.memptr = target;
        if cond.is_none_or(|c| self.cc(c)) {
            self.push_word(bus, self.regs.pc);
            self.regs.pc = target;
            17
        } else {
            10
        }
    }

    /// RET — 10 T.
    pub(super) fn op_ret(&mut self, bus: &mut dyn Bus) -> u32 {
        self.regs.pc = self.pop_word(bus);
        self.regs.memptr = self.regs.pc;
        10
    }

    /// RET cc — 11 T taken, 5 T not.
    pub(super) fn op_ret_cc(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        if self.cc((op >> 3) & 7) {
            self.regs.pc = self.pop_word(bus);
            self.regs.memptr = self.regs.pc;
            11
        } else {
            5
        }
    }

    /// RETN/RETI — 14 T. Both restore IFF1 from IFF2.
    pub(super) fn op_retn_reti(&mut self, bus: &mut dyn Bus) -> u32 {
        self.regs.pc = self.pop_word(bus);
        self.regs.memptr = self.regs.pc;
        self.regs.iff1 = self.regs.iff2;
        14
    }

    /// RST p — 11 T.
    pub(super) fn op_rst(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        self.push_word(bus, self.regs.pc);
        self.regs.pc = u16::from(op & 0x38);
        self.regs.memptr = self.regs.pc;
        11
    }
}
