//! CB page: rotates, shifts, BIT/RES/SET, including the DD/FD CB forms.

use crate::core::bus::Bus;
use crate::cpu::{Cpu, IndexMode, flag, tables};

impl Cpu {
    pub(super) fn exec_cb(&mut self, bus: &mut dyn Bus) -> u32 {
        if self.index != IndexMode::Hl {
            return self.exec_index_cb(bus);
        }
        let op = self.fetch_m1(bus);
        let sel = (op >> 3) & 7;
        let r = op & 7;
        match op >> 6 {
            0 => {
                // SLL is an undocumented shift.
                if sel == 6 && !self.undoc_allowed {
                    return self.op_trap(2);
                }
                if r == 6 {
                    let addr = self.regs.hl();
                    let v = bus.mem_read(addr);
                    let res = self.cb_rot(sel, v);
                    bus.mem_write(addr, res);
                    15
                } else {
                    let v = self.get_r8_plain(r);
                    let res = self.cb_rot(sel, v);
                    self.set_r8_plain(r, res);
                    8
                }
            }
            1 => {
                if r == 6 {
                    let v = bus.mem_read(self.regs.hl());
                    // Y/X come from the internal address latch here.
                    let yx = (self.regs.memptr >> 8) as u8;
                    self.cb_bit(sel, v, yx);
                    12
                } else {
                    let v = self.get_r8_plain(r);
                    self.cb_bit(sel, v, v);
                    8
                }
            }
            res_set => {
                let set = res_set == 3;
                if r == 6 {
                    let addr = self.regs.hl();
                    let v = bus.mem_read(addr);
                    bus.mem_write(addr, bit_update(v, sel, set));
                    15
                } else {
                    let v = self.get_r8_plain(r);
                    self.set_r8_plain(r, bit_update(v, sel, set));
                    8
                }
            }
        }
    }

    /// DD CB d op / FD CB d op. The sub-opcode is read as data (no refresh
    /// cycle). Non-BIT forms with a register field also copy the result to
    /// that register — a 4-byte undocumented encoding.
    fn exec_index_cb(&mut self, bus: &mut dyn Bus) -> u32 {
        let d = self.fetch_operand(bus) as i8;
        let op = self.fetch_operand(bus);
        let addr = self.hl_idx().wrapping_add(d as u16);
        self.regs.memptr = addr;
        let sel = (op >> 3) & 7;
        let r = op & 7;
        let kind = op >> 6;
        let undoc = r != 6 || (kind == 0 && sel == 6);
        if undoc && !self.undoc_allowed {
            return self.op_trap(4);
        }
        match kind {
            0 => {
                let v = bus.mem_read(addr);
                let res = self.cb_rot(sel, v);
                bus.mem_write(addr, res);
                if r != 6 {
                    self.set_r8_plain(r, res);
                }
                19
            }
            1 => {
                let v = bus.mem_read(addr);
                self.cb_bit(sel, v, (addr >> 8) as u8);
                16
            }
            kind => {
                let v = bus.mem_read(addr);
                let res = bit_update(v, sel, kind == 3);
                bus.mem_write(addr, res);
                if r != 6 {
                    self.set_r8_plain(r, res);
                }
                19
            }
        }
    }

    /// The eight CB shift/rotate kinds (RLC RRC RL RR SLA SRA SLL SRL).
    fn cb_rot(&mut self, kind: u8, v: u8) -> u8 {
        let c_in = self.regs.f & flag::C != 0;
        let (res, carry) = match kind {
            0 => (v.rotate_left(1), v & 0x80 != 0),
            1 => (v.rotate_right(1), v & 0x01 != 0),
            2 => ((v << 1) | u8::from(c_in), v & 0x80 != 0),
            3 => ((v >> 1) | (u8::from(c_in) << 7), v & 0x01 != 0),
            4 => (v << 1, v & 0x80 != 0),
            5 => ((v >> 1) | (v & 0x80), v & 0x01 != 0),
            6 => ((v << 1) | 1, v & 0x80 != 0),
            _ => (v >> 1, v & 0x01 != 0),
        };
        self.regs.f = tables::SZYXP[res as usize] | if carry { flag::C } else { 0 };
        res
    }

    /// BIT b — Z/PV on the tested bit, S only for bit 7, Y/X from the
    /// given source byte (register, or WZ high for memory operands).
    fn cb_bit(&mut self, b: u8, v: u8, yx_src: u8) {
        let bit = v & (1 << b);
        let mut f = (self.regs.f & flag::C) | flag::H | tables::SZ[bit as usize];
        if bit == 0 {
            f |= flag::PV;
        }
        f |= yx_src & (flag::Y | flag::X);
        self.regs.f = f;
    }
}

fn bit_update(v: u8, b: u8, set: bool) -> u8 {
    if set { v | (1 << b) } else { v & !(1 << b) }
}
