//! Single-instruction disassembler for both models, used by the debugging
//! shell. Decodes by the usual x/y/z/p/q opcode fields; operands print as
//! bare hex.

use crate::cpu::Model;

/// One decoded instruction.
#[derive(Debug, Clone)]
pub struct Disasm {
    pub text: String,
    /// Encoding length in bytes.
    pub len: u16,
}

const R8: [&str; 8] = ["B", "C", "D", "E", "H", "L", "(HL)", "A"];
const RP: [&str; 4] = ["BC", "DE", "HL", "SP"];
const RP_AF: [&str; 4] = ["BC", "DE", "HL", "AF"];
const CC: [&str; 8] = ["NZ", "Z", "NC", "C", "PO", "PE", "P", "M"];
const ALU: [&str; 8] = [
    "ADD A,", "ADC A,", "SUB ", "SBC A,", "AND ", "XOR ", "OR ", "CP ",
];
const ROT: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "SLL", "SRL"];

const ALU_I: [&str; 8] = ["ADD", "ADC", "SUB", "SBB", "ANA", "XRA", "ORA", "CMP"];
const ALU_I_IMM: [&str; 8] = ["ADI", "ACI", "SUI", "SBI", "ANI", "XRI", "ORI", "CPI"];
const RP_I: [&str; 4] = ["B", "D", "H", "SP"];
const CC_I: [&str; 8] = ["NZ", "Z", "NC", "C", "PO", "PE", "P", "M"];

/// Disassemble one instruction at `addr` through `read`.
pub fn disassemble<F: Fn(u16) -> u8>(model: Model, read: F, addr: u16) -> Disasm {
    match model {
        Model::Z80 => dis_z80(&read, addr),
        Model::I8080 => dis_8080(&read, addr),
    }
}

struct Cursor<'a, F> {
    read: &'a F,
    addr: u16,
    len: u16,
}

impl<F: Fn(u16) -> u8> Cursor<'_, F> {
    fn byte(&mut self) -> u8 {
        let v = (self.read)(self.addr.wrapping_add(self.len));
        self.len += 1;
        v
    }

    fn imm8(&mut self) -> String {
        format!("{:02X}", self.byte())
    }

    fn imm16(&mut self) -> String {
        let lo = self.byte();
        let hi = self.byte();
        format!("{:04X}", u16::from_le_bytes([lo, hi]))
    }

    fn rel(&mut self) -> String {
        let d = self.byte() as i8;
        let target = self.addr.wrapping_add(self.len).wrapping_add(d as u16);
        format!("{target:04X}")
    }
}

fn dis_z80<F: Fn(u16) -> u8>(read: &F, addr: u16) -> Disasm {
    let mut cur = Cursor { read, addr, len: 0 };
    // Collapse a leading prefix chain; only the last one counts.
    let mut index = "";
    let mut op = cur.byte();
    while op == 0xDD || op == 0xFD {
        index = if op == 0xDD { "IX" } else { "IY" };
        op = cur.byte();
    }
    let text = match op {
        0xCB => dis_z80_cb(&mut cur, index),
        0xED => dis_z80_ed(&mut cur),
        _ => dis_z80_main(&mut cur, op, index),
    };
    Disasm { text, len: cur.len }
}

/// The (HL) / (IX+d) operand, reading a displacement when indexed.
fn hl_operand<F: Fn(u16) -> u8>(cur: &mut Cursor<'_, F>, index: &str) -> String {
    if index.is_empty() {
        "(HL)".into()
    } else {
        let d = cur.byte() as i8;
        if d < 0 {
            format!("({index}-{:02X})", -(d as i16))
        } else {
            format!("({index}+{d:02X})")
        }
    }
}

fn r8_operand<F: Fn(u16) -> u8>(cur: &mut Cursor<'_, F>, idx: u8, index: &str) -> String {
    if idx == 6 {
        hl_operand(cur, index)
    } else if index.is_empty() {
        R8[idx as usize].into()
    } else {
        match idx {
            4 => format!("{index}H"),
            5 => format!("{index}L"),
            _ => R8[idx as usize].into(),
        }
    }
}

fn rp_name(idx: u8, index: &str) -> String {
    if idx == 2 && !index.is_empty() {
        index.into()
    } else {
        RP[idx as usize].into()
    }
}

fn dis_z80_main<F: Fn(u16) -> u8>(cur: &mut Cursor<'_, F>, op: u8, index: &str) -> String {
    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let p = y >> 1;
    let q = y & 1;
    match (x, z) {
        (0, 0) => match y {
            0 => "NOP".into(),
            1 => "EX AF,AF'".into(),
            2 => format!("DJNZ {}", cur.rel()),
            3 => format!("JR {}", cur.rel()),
            _ => format!("JR {},{}", CC[(y - 4) as usize], cur.rel()),
        },
        (0, 1) if q == 0 => format!("LD {},{}", rp_name(p, index), cur.imm16()),
        (0, 1) => format!("ADD {},{}", rp_name(2, index), rp_name(p, index)),
        (0, 2) => match y {
            0 => "LD (BC),A".into(),
            1 => "LD A,(BC)".into(),
            2 => "LD (DE),A".into(),
            3 => "LD A,(DE)".into(),
            4 => format!("LD ({}),{}", cur.imm16(), rp_name(2, index)),
            5 => format!("LD {},({})", rp_name(2, index), cur.imm16()),
            6 => format!("LD ({}),A", cur.imm16()),
            _ => format!("LD A,({})", cur.imm16()),
        },
        (0, 3) if q == 0 => format!("INC {}", rp_name(p, index)),
        (0, 3) => format!("DEC {}", rp_name(p, index)),
        (0, 4) => format!("INC {}", r8_operand(cur, y, index)),
        (0, 5) => format!("DEC {}", r8_operand(cur, y, index)),
        (0, 6) => {
            let dst = r8_operand(cur, y, index);
            format!("LD {dst},{}", cur.imm8())
        }
        (0, _) => ["RLCA", "RRCA", "RLA", "RRA", "DAA", "CPL", "SCF", "CCF"][y as usize].into(),
        (1, _) if op == 0x76 => "HALT".into(),
        (1, _) => {
            // Only one displacement byte even when both operands look indexed.
            if z == 6 {
                let src = hl_operand(cur, index);
                format!("LD {},{}", R8[y as usize], src)
            } else if y == 6 {
                let dst = hl_operand(cur, index);
                format!("LD {},{}", dst, R8[z as usize])
            } else {
                format!(
                    "LD {},{}",
                    r8_operand(cur, y, index),
                    r8_operand(cur, z, index)
                )
            }
        }
        (2, _) => {
            let operand = r8_operand(cur, z, index);
            format!("{}{}", ALU[y as usize], operand)
        }
        (3, 0) => format!("RET {}", CC[y as usize]),
        (3, 1) if q == 0 => format!(
            "POP {}",
            if p == 2 && !index.is_empty() {
                index.into()
            } else {
                RP_AF[p as usize].to_string()
            }
        ),
        (3, 1) => match p {
            0 => "RET".into(),
            1 => "EXX".into(),
            2 => format!("JP ({})", if index.is_empty() { "HL" } else { index }),
            _ => format!("LD SP,{}", if index.is_empty() { "HL" } else { index }),
        },
        (3, 2) => format!("JP {},{}", CC[y as usize], cur.imm16()),
        (3, 3) => match y {
            0 => format!("JP {}", cur.imm16()),
            2 => format!("OUT ({}),A", cur.imm8()),
            3 => format!("IN A,({})", cur.imm8()),
            4 => format!("EX (SP),{}", if index.is_empty() { "HL" } else { index }),
            5 => "EX DE,HL".into(),
            6 => "DI".into(),
            _ => "EI".into(),
        },
        (3, 4) => format!("CALL {},{}", CC[y as usize], cur.imm16()),
        (3, 5) if q == 0 => format!(
            "PUSH {}",
            if p == 2 && !index.is_empty() {
                index.into()
            } else {
                RP_AF[p as usize].to_string()
            }
        ),
        (3, 5) => format!("CALL {}", cur.imm16()),
        (3, 6) => {
            let n = cur.imm8();
            format!("{}{}", ALU[y as usize], n)
        }
        _ => format!("RST {:02X}", y * 8),
    }
}

fn dis_z80_cb<F: Fn(u16) -> u8>(cur: &mut Cursor<'_, F>, index: &str) -> String {
    // DD CB d op: displacement precedes the sub-opcode.
    let operand = if index.is_empty() {
        None
    } else {
        Some(hl_operand(cur, index))
    };
    let op = cur.byte();
    let y = (op >> 3) & 7;
    let z = op & 7;
    let target = operand.unwrap_or_else(|| R8[z as usize].to_string());
    match op >> 6 {
        0 => format!("{} {}", ROT[y as usize], target),
        1 => format!("BIT {y},{target}"),
        2 => format!("RES {y},{target}"),
        _ => format!("SET {y},{target}"),
    }
}

fn dis_z80_ed<F: Fn(u16) -> u8>(cur: &mut Cursor<'_, F>) -> String {
    let op = cur.byte();
    match op {
        0x47 => "LD I,A".into(),
        0x4F => "LD R,A".into(),
        0x57 => "LD A,I".into(),
        0x5F => "LD A,R".into(),
        0x67 => "RRD".into(),
        0x6F => "RLD".into(),
        0xA0 => "LDI".into(),
        0xA1 => "CPI".into(),
        0xA2 => "INI".into(),
        0xA3 => "OUTI".into(),
        0xA8 => "LDD".into(),
        0xA9 => "CPD".into(),
        0xAA => "IND".into(),
        0xAB => "OUTD".into(),
        0xB0 => "LDIR".into(),
        0xB1 => "CPIR".into(),
        0xB2 => "INIR".into(),
        0xB3 => "OTIR".into(),
        0xB8 => "LDDR".into(),
        0xB9 => "CPDR".into(),
        0xBA => "INDR".into(),
        0xBB => "OTDR".into(),
        op if op & 0xC7 == 0x40 => {
            let r = (op >> 3) & 7;
            if r == 6 {
                "IN (C)".into()
            } else {
                format!("IN {},(C)", R8[r as usize])
            }
        }
        op if op & 0xC7 == 0x41 => {
            let r = (op >> 3) & 7;
            if r == 6 {
                "OUT (C),0".into()
            } else {
                format!("OUT (C),{}", R8[r as usize])
            }
        }
        op if op & 0xCF == 0x42 => format!("SBC HL,{}", RP[((op >> 4) & 3) as usize]),
        op if op & 0xCF == 0x4A => format!("ADC HL,{}", RP[((op >> 4) & 3) as usize]),
        op if op & 0xCF == 0x43 => {
            let nn = cur.imm16();
            format!("LD ({nn}),{}", RP[((op >> 4) & 3) as usize])
        }
        op if op & 0xCF == 0x4B => {
            let nn = cur.imm16();
            format!("LD {},({nn})", RP[((op >> 4) & 3) as usize])
        }
        op if op & 0xC7 == 0x44 => "NEG".into(),
        0x4D => "RETI".into(),
        op if op & 0xC7 == 0x45 => "RETN".into(),
        op if op & 0xC7 == 0x46 => {
            let mode = match (op >> 3) & 7 {
                2 | 6 => 1,
                3 | 7 => 2,
                _ => 0,
            };
            format!("IM {mode}")
        }
        _ => "NOP*".into(),
    }
}

fn dis_8080<F: Fn(u16) -> u8>(read: &F, addr: u16) -> Disasm {
    let mut cur = Cursor { read, addr, len: 0 };
    let op = cur.byte();
    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let p = y >> 1;
    let q = y & 1;
    let text = match (x, z) {
        (0, 0) => "NOP".into(),
        (0, 1) if q == 0 => format!("LXI {},{}", RP_I[p as usize], cur.imm16()),
        (0, 1) => format!("DAD {}", RP_I[p as usize]),
        (0, 2) => match y {
            0 => "STAX B".into(),
            1 => "LDAX B".into(),
            2 => "STAX D".into(),
            3 => "LDAX D".into(),
            4 => format!("SHLD {}", cur.imm16()),
            5 => format!("LHLD {}", cur.imm16()),
            6 => format!("STA {}", cur.imm16()),
            _ => format!("LDA {}", cur.imm16()),
        },
        (0, 3) if q == 0 => format!("INX {}", RP_I[p as usize]),
        (0, 3) => format!("DCX {}", RP_I[p as usize]),
        (0, 4) => format!("INR {}", r8_8080(y)),
        (0, 5) => format!("DCR {}", r8_8080(y)),
        (0, 6) => {
            let dst = r8_8080(y);
            format!("MVI {dst},{}", cur.imm8())
        }
        (0, _) => ["RLC", "RRC", "RAL", "RAR", "DAA", "CMA", "STC", "CMC"][y as usize].into(),
        (1, _) if op == 0x76 => "HLT".into(),
        (1, _) => format!("MOV {},{}", r8_8080(y), r8_8080(z)),
        (2, _) => format!("{} {}", ALU_I[y as usize], r8_8080(z)),
        (3, 0) => format!("R{}", CC_I[y as usize]),
        (3, 1) if q == 0 => format!(
            "POP {}",
            if p == 3 { "PSW" } else { RP_I[p as usize] }
        ),
        (3, 1) => match p {
            0 => "RET".into(),
            1 => "RET*".into(),
            2 => "PCHL".into(),
            _ => "SPHL".into(),
        },
        (3, 2) => format!("J{} {}", CC_I[y as usize], cur.imm16()),
        (3, 3) => match y {
            0 => format!("JMP {}", cur.imm16()),
            1 => format!("JMP* {}", cur.imm16()),
            2 => format!("OUT {}", cur.imm8()),
            3 => format!("IN {}", cur.imm8()),
            4 => "XTHL".into(),
            5 => "XCHG".into(),
            6 => "DI".into(),
            _ => "EI".into(),
        },
        (3, 4) => format!("C{} {}", CC_I[y as usize], cur.imm16()),
        (3, 5) if q == 0 => format!(
            "PUSH {}",
            if p == 3 { "PSW" } else { RP_I[p as usize] }
        ),
        (3, 5) => {
            let nn = cur.imm16();
            if p == 0 {
                format!("CALL {nn}")
            } else {
                format!("CALL* {nn}")
            }
        }
        (3, 6) => {
            let n = cur.imm8();
            format!("{} {}", ALU_I_IMM[y as usize], n)
        }
        _ => format!("RST {y}"),
    };
    Disasm { text, len: cur.len }
}

fn r8_8080(idx: u8) -> &'static str {
    ["B", "C", "D", "E", "H", "L", "M", "A"][idx as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dis(model: Model, bytes: &[u8]) -> Disasm {
        disassemble(model, |a| bytes.get(a as usize).copied().unwrap_or(0), 0)
    }

    #[test]
    fn z80_basics() {
        let d = dis(Model::Z80, &[0x3E, 0x42]);
        assert_eq!(d.text, "LD A,42");
        assert_eq!(d.len, 2);
        let d = dis(Model::Z80, &[0xC3, 0x34, 0x12]);
        assert_eq!(d.text, "JP 1234");
        assert_eq!(d.len, 3);
        let d = dis(Model::Z80, &[0xDD, 0x7E, 0x05]);
        assert_eq!(d.text, "LD A,(IX+05)");
        assert_eq!(d.len, 3);
        let d = dis(Model::Z80, &[0xDD, 0xCB, 0xFF, 0x46]);
        assert_eq!(d.text, "BIT 0,(IX-01)");
        assert_eq!(d.len, 4);
        let d = dis(Model::Z80, &[0xED, 0xB0]);
        assert_eq!(d.text, "LDIR");
        assert_eq!(d.len, 2);
    }

    #[test]
    fn i8080_basics() {
        let d = dis(Model::I8080, &[0x3E, 0x42]);
        assert_eq!(d.text, "MVI A,42");
        let d = dis(Model::I8080, &[0x7E]);
        assert_eq!(d.text, "MOV A,M");
        let d = dis(Model::I8080, &[0xDA, 0x00, 0x10]);
        assert_eq!(d.text, "JC 1000");
    }
}
