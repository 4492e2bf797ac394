//! Intel 8080 decoder.
//!
//! Shares the register file and decode-index helpers with the Z80 side;
//! there are no prefixes, alternates or index registers here, and the
//! flag register keeps bit 1 high and bits 3/5 low at all times.

mod alu;

use crate::core::bus::Bus;
use crate::cpu::Cpu;

impl Cpu {
    pub(crate) fn step_8080(&mut self, bus: &mut dyn Bus) -> u32 {
        let op = self.fetch_m1(bus);
        let t = self.exec_8080(op, bus);
        self.fixup_8080_flags();
        t
    }

    fn exec_8080(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        match op {
            0x00 => 4, // NOP
            0x76 => self.op_halt(bus, 7),

            // Undocumented alias opcodes; shadow encodings of NOP, JMP,
            // CALL and RET on real silicon.
            0x08 | 0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 => {
                if self.undoc_allowed {
                    4
                } else {
                    self.op_trap(1)
                }
            }
            0xCB => {
                if self.undoc_allowed {
                    self.op8_jmp(bus, None)
                } else {
                    self.op_trap(1)
                }
            }
            0xD9 => {
                if self.undoc_allowed {
                    self.op8_ret(bus)
                } else {
                    self.op_trap(1)
                }
            }
            0xDD | 0xED | 0xFD => {
                if self.undoc_allowed {
                    self.op8_call(bus, None)
                } else {
                    self.op_trap(1)
                }
            }

            // --- Data transfer ---
            0x02 => self.op8_stax(bus, self.regs.bc()),
            0x12 => self.op8_stax(bus, self.regs.de()),
            0x0A => self.op8_ldax(bus, self.regs.bc()),
            0x1A => self.op8_ldax(bus, self.regs.de()),
            0x22 => self.op8_shld(bus),
            0x2A => self.op8_lhld(bus),
            0x32 => self.op8_sta(bus),
            0x3A => self.op8_lda(bus),
            0xEB => self.op8_xchg(),
            0xE3 => self.op8_xthl(bus),
            0xF9 => self.op8_sphl(),
            op if op & 0xCF == 0x01 => self.op8_lxi(op, bus),
            op if op & 0xC7 == 0x06 => self.op8_mvi(op, bus),
            op if op & 0xC0 == 0x40 => self.op8_mov(op, bus),

            // --- Arithmetic/logic ---
            0x07 => self.op8_rlc(),
            0x0F => self.op8_rrc(),
            0x17 => self.op8_ral(),
            0x1F => self.op8_rar(),
            0x27 => self.op8_daa(),
            0x2F => self.op8_cma(),
            0x37 => self.op8_stc(),
            0x3F => self.op8_cmc(),
            op if op & 0xCF == 0x09 => self.op8_dad(op),
            op if op & 0xCF == 0x03 => self.op8_inx_dcx(op),
            op if op & 0xCF == 0x0B => self.op8_inx_dcx(op),
            op if op & 0xC7 == 0x04 => self.op8_inr_dcr(op, bus),
            op if op & 0xC7 == 0x05 => self.op8_inr_dcr(op, bus),
            op if op & 0xC0 == 0x80 => self.op8_alu_r(op, bus),
            op if op & 0xC7 == 0xC6 => self.op8_alu_n(op, bus),

            // --- Control flow ---
            0xC3 => self.op8_jmp(bus, None),
            0xC9 => self.op8_ret(bus),
            0xCD => self.op8_call(bus, None),
            0xE9 => self.op8_pchl(),
            op if op & 0xC7 == 0xC2 => self.op8_jmp(bus, Some((op >> 3) & 7)),
            op if op & 0xC7 == 0xC4 => self.op8_call(bus, Some((op >> 3) & 7)),
            op if op & 0xC7 == 0xC0 => self.op8_ret_cc(op, bus),
            op if op & 0xC7 == 0xC7 => self.op8_rst(op, bus),

            // --- Stack, I/O, interrupt control ---
            op if op & 0xCF == 0xC5 => self.op8_push(op, bus),
            op if op & 0xCF == 0xC1 => self.op8_pop(op, bus),
            0xDB => self.op8_in(bus),
            0xD3 => self.op8_out(bus),
            0xF3 => self.op8_di(),
            0xFB => self.op8_ei(),

            _ => unreachable!("unhandled opcode {op:#04x}"),
        }
    }

    /// MOV r,r — 5 T; through memory 7 T.
    fn op8_mov(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let dst = (op >> 3) & 7;
        let src = op & 7;
        if src == 6 {
            let v = bus.mem_read(self.regs.hl());
            self.set_r8_plain(dst, v);
            7
        } else if dst == 6 {
            bus.mem_write(self.regs.hl(), self.get_r8_plain(src));
            7
        } else {
            let v = self.get_r8_plain(src);
            self.set_r8_plain(dst, v);
            5
        }
    }

    /// MVI r — 7 T; MVI M 10 T.
    fn op8_mvi(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let dst = (op >> 3) & 7;
        let n = self.fetch_operand(bus);
        if dst == 6 {
            bus.mem_write(self.regs.hl(), n);
            10
        } else {
            self.set_r8_plain(dst, n);
            7
        }
    }

    /// LXI rp — 10 T.
    fn op8_lxi(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let v = self.fetch_word(bus);
        match (op >> 4) & 3 {
            0 => self.regs.set_bc(v),
            1 => self.regs.set_de(v),
            2 => self.regs.set_hl(v),
            _ => self.regs.sp = v,
        }
        10
    }

    fn op8_stax(&mut self, bus: &mut dyn Bus, addr: u16) -> u32 {
        bus.mem_write(addr, self.regs.a);
        7
    }

    fn op8_ldax(&mut self, bus: &mut dyn Bus, addr: u16) -> u32 {
        self.regs.a = bus.mem_read(addr);
        7
    }

    /// STA — 13 T.
    fn op8_sta(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.fetch_word(bus);
        bus.mem_write(addr, self.regs.a);
        13
    }

    /// LDA — 13 T.
    fn op8_lda(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.fetch_word(bus);
        self.regs.a = bus.mem_read(addr);
        13
    }

    /// SHLD — 16 T.
    fn op8_shld(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.fetch_word(bus);
        let hl = self.regs.hl();
        self.wr_word(bus, addr, hl);
        16
    }

    /// LHLD — 16 T.
    fn op8_lhld(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.fetch_word(bus);
        let v = self.rd_word(bus, addr);
        self.regs.set_hl(v);
        16
    }

    /// XCHG — 5 T.
    fn op8_xchg(&mut self) -> u32 {
        std::mem::swap(&mut self.regs.d, &mut self.regs.h);
        std::mem::swap(&mut self.regs.e, &mut self.regs.l);
        5
    }

    /// XTHL — 18 T.
    fn op8_xthl(&mut self, bus: &mut dyn Bus) -> u32 {
        let sp = self.regs.sp;
        let lo = bus.stack_read(sp);
        let hi = bus.stack_read(sp.wrapping_add(1));
        let hl = self.regs.hl();
        bus.stack_write(sp, hl as u8);
        bus.stack_write(sp.wrapping_add(1), (hl >> 8) as u8);
        self.regs.set_hl(u16::from_le_bytes([lo, hi]));
        18
    }

    /// SPHL — 5 T.
    fn op8_sphl(&mut self) -> u32 {
        self.regs.sp = self.regs.hl();
        5
    }

    /// JMP / Jcc — 10 T.
    fn op8_jmp(&mut self, bus: &mut dyn Bus, cond: Option<u8>) -> u32 {
        let target = self.fetch_word(bus);
        if cond.is_none_or(|c| self.cc(c)) {
            self.regs.pc = target;
        }
        10
    }

    /// CALL — 17 T; Ccc 17 T taken, 11 T not.
    fn op8_call(&mut self, bus: &mut dyn Bus, cond: Option<u8>) -> u32 {
        let target = self.fetch_word(bus);
        if cond.is_none_or(|c| self.cc(c)) {
            self.push_word(bus, self.regs.pc);
            self.regs.pc = target;
            17
        } else {
            11
        }
    }

    /// RET — 10 T.
    fn op8_ret(&mut self, bus: &mut dyn Bus) -> u32 {
        self.regs.pc = self.pop_word(bus);
        10
    }

    /// Rcc — 11 T taken, 5 T not.
    fn op8_ret_cc(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        if self.cc((op >> 3) & 7) {
            self.regs.pc = self.pop_word(bus);
            11
        } else {
            5
        }
    }

    /// RST — 11 T.
    fn op8_rst(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        self.push_word(bus, self.regs.pc);
        self.regs.pc = u16::from(op & 0x38);
        11
    }

    /// PCHL — 5 T.
    fn op8_pchl(&mut self) -> u32 {
        self.regs.pc = self.regs.hl();
        5
    }

    /// PUSH — 11 T.
    fn op8_push(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let v = match (op >> 4) & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            _ => self.regs.af(),
        };
        self.push_word(bus, v);
        11
    }

    /// POP — 10 T. POP PSW re-imposes the fixed flag bits.
    fn op8_pop(&mut self, op: u8, bus: &mut dyn Bus) -> u32 {
        let v = self.pop_word(bus);
        match (op >> 4) & 3 {
            0 => self.regs.set_bc(v),
            1 => self.regs.set_de(v),
            2 => self.regs.set_hl(v),
            _ => self.regs.set_af(v),
        }
        10
    }

    /// IN — 10 T.
    fn op8_in(&mut self, bus: &mut dyn Bus) -> u32 {
        let port = self.fetch_operand(bus);
        self.regs.a = bus.io_read(port);
        10
    }

    /// OUT — 10 T.
    fn op8_out(&mut self, bus: &mut dyn Bus) -> u32 {
        let port = self.fetch_operand(bus);
        bus.io_write(port, self.regs.a);
        10
    }

    fn op8_di(&mut self) -> u32 {
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        4
    }

    /// EI — masked for one more instruction, as on the Z80.
    fn op8_ei(&mut self) -> u32 {
        self.regs.iff1 = true;
        self.regs.iff2 = true;
        self.int_protection = true;
        4
    }
}
