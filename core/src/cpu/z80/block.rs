//! Z80 block transfer, compare and block I/O.
//!
//! The repeating forms execute one iteration per instruction step and back
//! PC up over the ED prefix while work remains, so interrupts are honored
//! between iterations exactly like on hardware.

use crate::core::bus::Bus;
use crate::cpu::{Cpu, flag, tables};

impl Cpu {
    /// LDI/LDD — 16 T.
    pub(super) fn op_ldi_ldd(&mut self, bus: &mut dyn Bus, dec: bool) -> u32 {
        self.ldx_step(bus, dec);
        16
    }

    /// LDIR/LDDR — 21 T per iteration, 16 T on the last.
    pub(super) fn op_ldir_lddr(&mut self, bus: &mut dyn Bus, dec: bool) -> u32 {
        self.ldx_step(bus, dec);
        if self.regs.bc() != 0 {
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            self.regs.memptr = self.regs.pc.wrapping_add(1);
            21
        } else {
            16
        }
    }

    fn ldx_step(&mut self, bus: &mut dyn Bus, dec: bool) {
        let v = bus.mem_read(self.regs.hl());
        bus.mem_write(self.regs.de(), v);
        let delta = if dec { 0xFFFFu16 } else { 1 };
        self.regs.set_hl(self.regs.hl().wrapping_add(delta));
        self.regs.set_de(self.regs.de().wrapping_add(delta));
        self.regs.set_bc(self.regs.bc().wrapping_sub(1));
        let n = v.wrapping_add(self.regs.a);
        let mut f = self.regs.f & (flag::S | flag::Z | flag::C);
        if self.regs.bc() != 0 {
            f |= flag::PV;
        }
        if n & 0x08 != 0 {
            f |= flag::X;
        }
        if n & 0x02 != 0 {
            f |= flag::Y;
        }
        self.regs.f = f;
    }

    /// CPI/CPD — 16 T.
    pub(super) fn op_cpi_cpd(&mut self, bus: &mut dyn Bus, dec: bool) -> u32 {
        self.cpx_step(bus, dec);
        16
    }

    /// CPIR/CPDR — 21/16 T; stops on match or when BC runs out.
    pub(super) fn op_cpir_cpdr(&mut self, bus: &mut dyn Bus, dec: bool) -> u32 {
        self.cpx_step(bus, dec);
        if self.regs.bc() != 0 && self.regs.f & flag::Z == 0 {
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            self.regs.memptr = self.regs.pc.wrapping_add(1);
            21
        } else {
            16
        }
    }

    fn cpx_step(&mut self, bus: &mut dyn Bus, dec: bool) {
        let a = self.regs.a;
        let v = bus.mem_read(self.regs.hl());
        let res = a.wrapping_sub(v);
        let half = (a & 0xF) < (v & 0xF);
        let delta = if dec { 0xFFFFu16 } else { 1 };
        self.regs.set_hl(self.regs.hl().wrapping_add(delta));
        self.regs.set_bc(self.regs.bc().wrapping_sub(1));
        self.regs.memptr = self.regs.memptr.wrapping_add(delta);
        let n = res.wrapping_sub(u8::from(half));
        let mut f = (self.regs.f & flag::C) | flag::N | tables::SZ[res as usize];
        if half {
            f |= flag::H;
        }
        if self.regs.bc() != 0 {
            f |= flag::PV;
        }
        if n & 0x08 != 0 {
            f |= flag::X;
        }
        if n & 0x02 != 0 {
            f |= flag::Y;
        }
        self.regs.f = f;
    }

    /// INI/IND — 16 T.
    pub(super) fn op_ini_ind(&mut self, bus: &mut dyn Bus, dec: bool) -> u32 {
        self.inx_step(bus, dec);
        16
    }

    /// INIR/INDR — 21/16 T.
    pub(super) fn op_inir_indr(&mut self, bus: &mut dyn Bus, dec: bool) -> u32 {
        self.inx_step(bus, dec);
        if self.regs.b != 0 {
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            21
        } else {
            16
        }
    }

    fn inx_step(&mut self, bus: &mut dyn Bus, dec: bool) {
        let c = self.regs.c;
        let v = bus.io_read(c);
        bus.mem_write(self.regs.hl(), v);
        let delta = if dec { 0xFFFFu16 } else { 1 };
        self.regs.memptr = self.regs.bc().wrapping_add(delta);
        self.regs.b = self.regs.b.wrapping_sub(1);
        self.regs.set_hl(self.regs.hl().wrapping_add(delta));
        let k = u16::from(v) + u16::from(c.wrapping_add(if dec { 0xFF } else { 1 }));
        self.block_io_flags(v, k);
    }

    /// OUTI/OUTD — 16 T.
    pub(super) fn op_outi_outd(&mut self, bus: &mut dyn Bus, dec: bool) -> u32 {
        self.outx_step(bus, dec);
        16
    }

    /// OTIR/OTDR — 21/16 T.
    pub(super) fn op_otir_otdr(&mut self, bus: &mut dyn Bus, dec: bool) -> u32 {
        self.outx_step(bus, dec);
        if self.regs.b != 0 {
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            21
        } else {
            16
        }
    }

    fn outx_step(&mut self, bus: &mut dyn Bus, dec: bool) {
        let v = bus.mem_read(self.regs.hl());
        self.regs.b = self.regs.b.wrapping_sub(1);
        bus.io_write(self.regs.c, v);
        let delta = if dec { 0xFFFFu16 } else { 1 };
        self.regs.memptr = self.regs.bc().wrapping_add(delta);
        self.regs.set_hl(self.regs.hl().wrapping_add(delta));
        let k = u16::from(v) + u16::from(self.regs.l);
        self.block_io_flags(v, k);
    }

    /// Shared undocumented flag model for the block I/O group.
    fn block_io_flags(&mut self, v: u8, k: u16) {
        let b = self.regs.b;
        let mut f = tables::SZYX[b as usize];
        if v & 0x80 != 0 {
            f |= flag::N;
        }
        if k > 0xFF {
            f |= flag::H | flag::C;
        }
        f |= tables::SZP[((k as u8 & 7) ^ b) as usize] & flag::PV;
        self.regs.f = f;
    }
}
