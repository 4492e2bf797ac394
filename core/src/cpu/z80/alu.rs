//! Z80 arithmetic and logic group.

use crate::core::bus::Bus;
use crate::cpu::{Cpu, flag, tables};

impl Cpu {
    fn do_add(&mut self, val: u8, with_carry: bool) {
        let a = self.regs.a;
        let c = u8::from(with_carry && self.regs.f & flag::C != 0);
        let sum = u16::from(a) + u16::from(val) + u16::from(c);
        let res = sum as u8;
        let mut f = tables::SZYX[res as usize];
        if (a & 0xF) + (val & 0xF) + c > 0xF {
            f |= flag::H;
        }
        if (a ^ res) & (val ^ res) & 0x80 != 0 {
            f |= flag::PV;
        }
        if sum > 0xFF {
            f |= flag::C;
        }
        self.regs.a = res;
        self.regs.f = f;
    }

    fn do_sub(&mut self, val: u8, with_carry: bool) {
        let a = self.regs.a;
        let c = u8::from(with_carry && self.regs.f & flag::C != 0);
        let diff = u16::from(a)
            .wrapping_sub(u16::from(val))
            .wrapping_sub(u16::from(c));
        let res = diff as u8;
        let mut f = tables::SZYX[res as usize] | flag::N;
        if (a & 0xF) < (val & 0xF) + c {
            f |= flag::H;
        }
        if (a ^ val) & (a ^ res) & 0x80 != 0 {
            f |= flag::PV;
        }
        if diff > 0xFF {
            f |= flag::C;
        }
        self.regs.a = res;
        self.regs.f = f;
    }

    /// CP: like SUB without the store; Y/X come from the operand.
    fn do_cp(&mut self, val: u8) {
        let a = self.regs.a;
        let diff = u16::from(a).wrapping_sub(u16::from(val));
        let res = diff as u8;
        let mut f = tables::SZ[res as usize] | flag::N | (val & (flag::Y | flag::X));
        if (a & 0xF) < (val & 0xF) {
            f |= flag::H;
        }
        if (a ^ val) & (a ^ res) & 0x80 != 0 {
            f |= flag::PV;
        }
        if diff > 0xFF {
            f |= flag::C;
        }
        self.regs.f = f;
    }

    fn do_logic(&mut self, op: u8, val: u8) {
        match op {
            4 => self.regs.a &= val,
            5 => self.regs.a ^= val,
            _ => self.regs.a |= val,
        }
        self.regs.f = tables::SZYXP[self.regs.a as usize] | if op == 4 { flag::H } else { 0 };
    }

    fn alu_dispatch(&mut self, op: u8, val: u8) {
        match op {
            0 => self.do_add(val, false),
            1 => self.do_add(val, true),
            2 => self.do_sub(val, false),
            3 => self.do_sub(val, true),
            4..=6 => self.do_logic(op, val),
            _ => self.do_cp(val),
        }
    }

    /// ALU A,r — 4 T, or 7 T for the (HL) form.
    pub(super) fn op_alu_r(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let alu = (op >> 3) & 7;
        let r = op & 7;
        if r == 6 {
            let (addr, extra) = self.ea_hl(bus);
            let val = bus.mem_read(addr);
            self.alu_dispatch(alu, val);
            7 + extra
        } else {
            let val = self.get_r8(r);
            self.alu_dispatch(alu, val);
            4
        }
    }

    /// ALU A,n — 7 T.
    pub(super) fn op_alu_n(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let val = self.fetch_operand(bus);
        self.alu_dispatch((op >> 3) & 7, val);
        7
    }

    fn inc8(&mut self, v: u8) -> u8 {
        let res = v.wrapping_add(1);
        let mut f = (self.regs.f & flag::C) | tables::SZYX[res as usize];
        if v & 0xF == 0xF {
            f |= flag::H;
        }
        if v == 0x7F {
            f |= flag::PV;
        }
        self.regs.f = f;
        res
    }

    fn dec8(&mut self, v: u8) -> u8 {
        let res = v.wrapping_sub(1);
        let mut f = (self.regs.f & flag::C) | tables::SZYX[res as usize] | flag::N;
        if v & 0xF == 0 {
            f |= flag::H;
        }
        if v == 0x80 {
            f |= flag::PV;
        }
        self.regs.f = f;
        res
    }

    /// INC/DEC r — 4 T, (HL) form 11 T.
    pub(super) fn op_inc_dec_r(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let r = (op >> 3) & 7;
        let dec = op & 1 != 0;
        if r == 6 {
            let (addr, extra) = self.ea_hl(bus);
            let v = bus.mem_read(addr);
            let res = if dec { self.dec8(v) } else { self.inc8(v) };
            bus.mem_write(addr, res);
            11 + extra
        } else {
            let v = self.get_r8(r);
            let res = if dec { self.dec8(v) } else { self.inc8(v) };
            self.set_r8(r, res);
            4
        }
    }

    /// ADD HL,rr — 11 T. S/Z/P preserved, H from bit 11, Y/X from the
    /// high result byte.
    pub(super) fn op_add_hl_rr(&mut self, op: u8) -> u32 {
        let dst = self.hl_idx();
        let src = self.get_rp((op >> 4) & 3);
        self.regs.memptr = dst.wrapping_add(1);
        let sum = u32::from(dst) + u32::from(src);
        let res = sum as u16;
        let mut f = self.regs.f & (flag::S | flag::Z | flag::PV);
        f |= ((res >> 8) as u8) & (flag::Y | flag::X);
        if (dst & 0x0FFF) + (src & 0x0FFF) > 0x0FFF {
            f |= flag::H;
        }
        if sum > 0xFFFF {
            f |= flag::C;
        }
        self.regs.f = f;
        self.set_hl_idx(res);
        11
    }

    /// ADC HL,rr — 15 T. Full flag treatment, unlike ADD HL.
    pub(super) fn op_adc_hl_rr(&mut self, op: u8) -> u32 {
        let dst = self.regs.hl();
        let src = self.get_rp((op >> 4) & 3);
        let c = u32::from(self.regs.f & flag::C != 0);
        self.regs.memptr = dst.wrapping_add(1);
        let sum = u32::from(dst) + u32::from(src) + c;
        let res = sum as u16;
        let mut f = ((res >> 8) as u8) & (flag::S | flag::Y | flag::X);
        if res == 0 {
            f |= flag::Z;
        }
        if (dst & 0x0FFF) + (src & 0x0FFF) + c as u16 > 0x0FFF {
            f |= flag::H;
        }
        if (dst ^ res) & (src ^ res) & 0x8000 != 0 {
            f |= flag::PV;
        }
        if sum > 0xFFFF {
            f |= flag::C;
        }
        self.regs.f = f;
        self.regs.set_hl(res);
        15
    }

    /// SBC HL,rr — 15 T.
    pub(super) fn op_sbc_hl_rr(&mut self, op: u8) -> u32 {
        let dst = self.regs.hl();
        let src = self.get_rp((op >> 4) & 3);
        let c = u32::from(self.regs.f & flag::C != 0);
        self.regs.memptr = dst.wrapping_add(1);
        let diff = u32::from(dst).wrapping_sub(u32::from(src)).wrapping_sub(c);
        let res = diff as u16;
        let mut f = flag::N | (((res >> 8) as u8) & (flag::S | flag::Y | flag::X));
        if res == 0 {
            f |= flag::Z;
        }
        if (dst & 0x0FFF) < (src & 0x0FFF) + c as u16 {
            f |= flag::H;
        }
        if (dst ^ src) & (dst ^ res) & 0x8000 != 0 {
            f |= flag::PV;
        }
        if diff > 0xFFFF {
            f |= flag::C;
        }
        self.regs.f = f;
        self.regs.set_hl(res);
        15
    }

    /// INC/DEC rr — 6 T. No flags.
    pub(super) fn op_inc_dec_rr(&mut self, op: u8) -> u32 {
        let rp = (op >> 4) & 3;
        let v = self.get_rp(rp);
        let res = if op & 0x08 != 0 {
            v.wrapping_sub(1)
        } else {
            v.wrapping_add(1)
        };
        self.set_rp(rp, res);
        6
    }

    /// NEG — 8 T.
    pub(super) fn op_neg(&mut self) -> u32 {
        let v = self.regs.a;
        self.regs.a = 0;
        self.do_sub(v, false);
        8
    }

    /// DAA — 4 T. Decimal adjust honoring N/H/C from the previous op.
    pub(super) fn op_daa(&mut self) -> u32 {
        let a = self.regs.a;
        let f = self.regs.f;
        let mut adjust = 0u8;
        let mut carry = f & flag::C != 0;
        if f & flag::H != 0 || a & 0x0F > 9 {
            adjust |= 0x06;
        }
        if carry || a > 0x99 {
            adjust |= 0x60;
            carry = true;
        }
        let res = if f & flag::N != 0 {
            a.wrapping_sub(adjust)
        } else {
            a.wrapping_add(adjust)
        };
        let mut nf = tables::SZYXP[res as usize] | (f & flag::N);
        if carry {
            nf |= flag::C;
        }
        if (a ^ res) & 0x10 != 0 {
            nf |= flag::H;
        }
        self.regs.a = res;
        self.regs.f = nf;
        4
    }

    /// CPL — 4 T.
    pub(super) fn op_cpl(&mut self) -> u32 {
        self.regs.a = !self.regs.a;
        self.regs.f = (self.regs.f & (flag::S | flag::Z | flag::PV | flag::C))
            | flag::H
            | flag::N
            | (self.regs.a & (flag::Y | flag::X));
        4
    }

    /// SCF — 4 T.
    pub(super) fn op_scf(&mut self) -> u32 {
        self.regs.f = (self.regs.f & (flag::S | flag::Z | flag::PV))
            | flag::C
            | (self.regs.a & (flag::Y | flag::X));
        4
    }

    /// CCF — 4 T. H takes the old carry.
    pub(super) fn op_ccf(&mut self) -> u32 {
        let old_c = self.regs.f & flag::C;
        let mut f = (self.regs.f & (flag::S | flag::Z | flag::PV))
            | (self.regs.a & (flag::Y | flag::X));
        if old_c == 0 {
            f |= flag::C;
        } else {
            f |= flag::H;
        }
        self.regs.f = f;
        4
    }

    /// RLCA/RRCA/RLA/RRA — 4 T. Only H/N/C and the Y/X copies change.
    pub(super) fn op_rlca(&mut self) -> u32 {
        let carry = self.regs.a & 0x80 != 0;
        self.regs.a = self.regs.a.rotate_left(1);
        self.acc_rotate_flags(carry);
        4
    }

    pub(super) fn op_rrca(&mut self) -> u32 {
        let carry = self.regs.a & 0x01 != 0;
        self.regs.a = self.regs.a.rotate_right(1);
        self.acc_rotate_flags(carry);
        4
    }

    pub(super) fn op_rla(&mut self) -> u32 {
        let carry = self.regs.a & 0x80 != 0;
        self.regs.a = (self.regs.a << 1) | u8::from(self.regs.f & flag::C != 0);
        self.acc_rotate_flags(carry);
        4
    }

    pub(super) fn op_rra(&mut self) -> u32 {
        let carry = self.regs.a & 0x01 != 0;
        self.regs.a = (self.regs.a >> 1) | (u8::from(self.regs.f & flag::C != 0) << 7);
        self.acc_rotate_flags(carry);
        4
    }

    fn acc_rotate_flags(&mut self, carry: bool) {
        self.regs.f = (self.regs.f & (flag::S | flag::Z | flag::PV))
            | (self.regs.a & (flag::Y | flag::X))
            | if carry { flag::C } else { 0 };
    }

    /// RRD — 18 T. Low-nibble rotate between A and (HL).
    pub(super) fn op_rrd(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.regs.hl();
        let m = bus.mem_read(addr);
        let a = self.regs.a;
        self.regs.a = (a & 0xF0) | (m & 0x0F);
        bus.mem_write(addr, (a << 4) | (m >> 4));
        self.regs.f = (self.regs.f & flag::C) | tables::SZYXP[self.regs.a as usize];
        self.regs.memptr = addr.wrapping_add(1);
        18
    }

    /// RLD — 18 T.
    pub(super) fn op_rld(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.regs.hl();
        let m = bus.mem_read(addr);
        let a = self.regs.a;
        self.regs.a = (a & 0xF0) | (m >> 4);
        bus.mem_write(addr, (m << 4) | (a & 0x0F));
        self.regs.f = (self.regs.f & flag::C) | tables::SZYXP[self.regs.a as usize];
        self.regs.memptr = addr.wrapping_add(1);
        18
    }
}
