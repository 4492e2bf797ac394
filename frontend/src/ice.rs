//! ICE-style debugging shell.
//!
//! Line-oriented; each command is a single letter. The shell owns the
//! software breakpoint table and drives the machine through its public
//! run/step interface, so everything it does the front panel could do
//! too.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sim80_core::core::latches::{CpuError, run_state};
use sim80_core::cpu::disasm::disassemble;
use sim80_core::cpu::{Model, Registers, flag};
use sim80_core::debug::{BreakOutcome, HISIZE, SBSIZE, SoftBreaks};
use sim80_machines::Machine;

use crate::term::getkey;

pub struct Ice<'m> {
    m: &'m mut Machine,
    breaks: SoftBreaks,
    wrk_addr: u16,
}

impl<'m> Ice<'m> {
    pub fn new(m: &'m mut Machine) -> Self {
        Self {
            m,
            breaks: SoftBreaks::new(),
            wrk_addr: 0,
        }
    }

    /// The dialog loop. With `go_flag` the first command is an implied
    /// `g`, for machines that should start running right away.
    pub fn cmd_loop(&mut self, go_flag: bool) {
        if !go_flag {
            self.report_error();
            self.print_head();
            self.print_reg();
            self.disass_at(self.m.cpu.regs.pc);
        }
        self.wrk_addr = self.m.cpu.regs.pc;

        let stdin = io::stdin();
        let mut first = go_flag;
        loop {
            let line = if first {
                first = false;
                "g".to_string()
            } else {
                print!(">>> ");
                io::stdout().flush().ok();
                let mut buf = String::new();
                match stdin.lock().read_line(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => buf,
                }
            };
            let cmd = line.trim_end_matches(['\n', '\r']);
            let mut chars = cmd.chars();
            let first_ch = chars.next();
            let rest = chars.as_str();
            match first_ch.map(|c| c.to_ascii_lowercase()) {
                None => self.do_step(),
                Some('t') => self.do_trace(rest),
                Some('g') => self.do_go(rest),
                Some('d') => self.do_dump(rest),
                Some('l') => self.do_list(rest),
                Some('m') => self.do_modify(rest),
                Some('f') => self.do_fill(rest),
                Some('v') => self.do_move(rest),
                Some('x') => self.do_reg(rest),
                Some('p') => self.do_port(rest),
                Some('b') => self.do_break(rest),
                Some('h') => self.do_hist(rest),
                Some('z') => self.do_count(rest),
                Some('c') => self.do_clock(),
                Some('s') => self.do_show(),
                Some('?') => self.do_help(),
                Some('r') => self.do_load(rest),
                Some('!') => self.do_unix(rest),
                Some('q') => break,
                Some(_) => println!("what??"),
            }
        }
    }

    // --- Execution commands ---------------------------------------------

    fn do_step(&mut self) {
        self.m.step();
        if self.m.ctl().cpu_error() == CpuError::OpHalt {
            self.handle_break();
        }
        self.report_error();
        self.print_head();
        self.print_reg();
        self.disass_at(self.m.cpu.regs.pc);
        self.wrk_addr = self.m.cpu.regs.pc;
    }

    fn do_trace(&mut self, s: &str) {
        let count = match s.trim() {
            "" => 20,
            v => v.parse().unwrap_or(20),
        };
        self.print_head();
        self.print_reg();
        for _ in 0..count {
            self.m.step();
            self.print_reg();
            match self.m.ctl().cpu_error() {
                CpuError::None => {}
                CpuError::OpHalt => {
                    if !self.handle_break() {
                        break;
                    }
                }
                _ => break,
            }
        }
        self.report_error();
        self.wrk_addr = self.m.cpu.regs.pc;
    }

    fn do_go(&mut self, s: &str) {
        if let Some(addr) = parse_hex(s) {
            self.m.cpu.regs.pc = addr;
        }
        loop {
            self.m.run();
            if self.m.ctl().cpu_error() == CpuError::OpHalt {
                if self.handle_break() {
                    continue;
                }
            }
            break;
        }
        self.report_error();
        self.print_head();
        self.print_reg();
        self.wrk_addr = self.m.cpu.regs.pc;
    }

    /// Breakpoint trampoline bookkeeping. Returns true when execution
    /// should continue (pass target not reached yet).
    fn handle_break(&mut self) -> bool {
        let breaks = &mut self.breaks;
        let outcome = self.m.with_bus(|cpu, bus| breaks.handle(cpu, bus));
        match outcome {
            BreakOutcome::Missed => false,
            BreakOutcome::Continue => true,
            BreakOutcome::Hit { index, addr } => {
                println!("Software breakpoint {index} reached at {addr:04x}");
                false
            }
        }
    }

    // --- Memory commands ------------------------------------------------

    fn do_dump(&mut self, s: &str) {
        if let Some(addr) = parse_hex(s) {
            self.wrk_addr = addr - addr % 16;
        }
        print!("Addr   ");
        for i in 0..16 {
            print!("{i:02x} ");
        }
        println!(" ASCII");
        for _ in 0..16 {
            print!("{:04x} - ", self.wrk_addr);
            for j in 0..16u16 {
                print!("{:02x} ", self.m.mem.fp_read(self.wrk_addr.wrapping_add(j)));
            }
            print!("\t");
            for j in 0..16u16 {
                let c = self.m.mem.fp_read(self.wrk_addr.wrapping_add(j));
                print!(
                    "{}",
                    if c.is_ascii_graphic() || c == b' ' {
                        c as char
                    } else {
                        '.'
                    }
                );
            }
            println!();
            self.wrk_addr = self.wrk_addr.wrapping_add(16);
        }
    }

    fn do_list(&mut self, s: &str) {
        if let Some(addr) = parse_hex(s) {
            self.wrk_addr = addr;
        }
        for _ in 0..10 {
            print!("{:04x} - ", self.wrk_addr);
            self.wrk_addr = self.disass_at(self.wrk_addr);
        }
    }

    fn do_modify(&mut self, s: &str) {
        if let Some(addr) = parse_hex(s) {
            self.wrk_addr = addr;
        }
        let stdin = io::stdin();
        loop {
            print!("{:04x} = {:02x} : ", self.wrk_addr, self.m.mem.fp_read(self.wrk_addr));
            io::stdout().flush().ok();
            let mut buf = String::new();
            if stdin.lock().read_line(&mut buf).unwrap_or(0) == 0 {
                println!();
                break;
            }
            let v = buf.trim_end_matches(['\n', '\r']);
            if v.is_empty() {
                self.wrk_addr = self.wrk_addr.wrapping_add(1);
                continue;
            }
            let Some(val) = parse_hex(v) else { break };
            self.m.mem.put(self.wrk_addr, val as u8);
            self.wrk_addr = self.wrk_addr.wrapping_add(1);
        }
    }

    fn do_fill(&mut self, s: &str) {
        let mut parts = s.split(',');
        let Some(addr) = parts.next().and_then(parse_hex) else {
            println!("address missing");
            return;
        };
        let Some(count) = parts.next().and_then(parse_hex) else {
            println!("count missing");
            return;
        };
        let Some(val) = parts.next().and_then(parse_hex) else {
            println!("value missing");
            return;
        };
        let mut a = addr;
        for _ in 0..count {
            self.m.mem.put(a, val as u8);
            a = a.wrapping_add(1);
        }
    }

    fn do_move(&mut self, s: &str) {
        let mut parts = s.split(',');
        let Some(mut from) = parts.next().and_then(parse_hex) else {
            println!("from missing");
            return;
        };
        let Some(mut to) = parts.next().and_then(parse_hex) else {
            println!("to missing");
            return;
        };
        let Some(count) = parts.next().and_then(parse_hex) else {
            println!("count missing");
            return;
        };
        for _ in 0..count {
            let v = self.m.mem.fp_read(from);
            self.m.mem.put(to, v);
            from = from.wrapping_add(1);
            to = to.wrapping_add(1);
        }
    }

    fn do_port(&mut self, s: &str) {
        let Some(port) = parse_hex(s).map(|p| p as u8) else {
            println!("port missing");
            return;
        };
        let cur = self.m.ports.read(port).unwrap_or(0xFF);
        print!("{port:02x} = {cur:02x} : ");
        io::stdout().flush().ok();
        let mut buf = String::new();
        if io::stdin().lock().read_line(&mut buf).unwrap_or(0) == 0 {
            println!();
            return;
        }
        if let Some(v) = parse_hex(buf.trim()) {
            self.m.ports.write(port, v as u8);
        }
    }

    // --- Register display and modification ------------------------------

    fn do_reg(&mut self, s: &str) {
        let s = s.trim();
        if !s.is_empty() {
            let is_z80 = self.m.cpu.model == Model::Z80;
            let lower = s.to_ascii_lowercase();
            let def = REGS
                .iter()
                .filter(|d| is_z80 || !d.z80_only)
                .find(|d| lower.starts_with(d.name));
            match def {
                None => {
                    println!("unknown register {s}");
                }
                Some(def) => {
                    let regs = &mut self.m.cpu.regs;
                    match def.kind {
                        RegKind::R8(get) => print!("{} = {:02x} : ", def.print, *get(regs)),
                        RegKind::Pair(h, l) => {
                            let hv = *h(regs);
                            let lv = *l(regs);
                            print!("{} = {:02x}{:02x} : ", def.print, hv, lv)
                        }
                        RegKind::R16(get) => print!("{} = {:04x} : ", def.print, *get(regs)),
                        RegKind::FlagBit(mask) => print!(
                            "{}-FLAG = {} : ",
                            def.print,
                            if regs.f & mask != 0 { '1' } else { '0' }
                        ),
                    }
                    io::stdout().flush().ok();
                    let mut buf = String::new();
                    if io::stdin().lock().read_line(&mut buf).unwrap_or(0) > 0 {
                        let v = buf.trim();
                        if !v.is_empty() {
                            if let Some(w) = parse_hex(v) {
                                let regs = &mut self.m.cpu.regs;
                                match def.kind {
                                    RegKind::R8(get) => *get(regs) = w as u8,
                                    RegKind::Pair(h, l) => {
                                        *h(regs) = (w >> 8) as u8;
                                        *l(regs) = w as u8;
                                    }
                                    RegKind::R16(get) => *get(regs) = w,
                                    RegKind::FlagBit(mask) => {
                                        if w != 0 {
                                            regs.f |= mask;
                                        } else {
                                            regs.f &= !mask;
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        self.print_head();
        self.print_reg();
    }

    fn print_head(&self) {
        match self.m.cpu.model {
            Model::Z80 => println!(
                "\nPC   A  SZHPNC I  IFF BC   DE   HL   A'F' B'C' D'E' H'L' IX   IY   SP"
            ),
            Model::I8080 => println!("\nPC   A  SZHPC BC   DE   HL   SP"),
        }
    }

    fn print_reg(&self) {
        let r = &self.m.cpu.regs;
        let bit = |m: u8| if r.f & m != 0 { '1' } else { '0' };
        print!("{:04x} {:02x} ", r.pc, r.a);
        print!("{}{}{}{}", bit(flag::S), bit(flag::Z), bit(flag::H), bit(flag::PV));
        match self.m.cpu.model {
            Model::Z80 => {
                print!("{}{}", bit(flag::N), bit(flag::C));
                print!(" {:02x} ", r.i);
                print!(
                    "{}{}",
                    if r.iff1 { '1' } else { '0' },
                    if r.iff2 { '1' } else { '0' }
                );
                println!(
                    "  {:02x}{:02x} {:02x}{:02x} {:02x}{:02x} {:02x}{:02x} {:02x}{:02x} {:02x}{:02x} {:02x}{:02x} {:04x} {:04x} {:04x}",
                    r.b, r.c, r.d, r.e, r.h, r.l,
                    r.a_prime, r.f_prime, r.b_prime, r.c_prime,
                    r.d_prime, r.e_prime, r.h_prime, r.l_prime,
                    r.ix, r.iy, r.sp
                );
            }
            Model::I8080 => {
                print!("{}", bit(flag::C));
                println!(
                    " {:02x}{:02x} {:02x}{:02x} {:02x}{:02x} {:04x}",
                    r.b, r.c, r.d, r.e, r.h, r.l, r.sp
                );
            }
        }
    }

    // --- Breakpoints, history, measurement ------------------------------

    fn do_break(&mut self, s: &str) {
        let s = s.trim_end_matches(['\n', '\r']);
        if s.is_empty() {
            println!("No Addr Pass  Counter");
            for (i, bp) in self.breaks.slots().iter().enumerate() {
                if bp.armed() {
                    println!("{:02} {:04x} {:05} {:05}", i, bp.addr, bp.pass, bp.count);
                }
            }
            return;
        }
        // Leading decimal digit(s) select the slot explicitly.
        let (slot, rest) = match s.find(|c: char| !c.is_ascii_digit()) {
            Some(0) => (None, s),
            Some(n) => (s[..n].parse::<usize>().ok(), &s[n..]),
            None => (s.parse::<usize>().ok(), ""),
        };
        let rest = rest.trim_start();
        if rest.starts_with('c') {
            let slot = slot.unwrap_or(0);
            if let Err(e) = self.breaks.clear(slot, &self.m.mem) {
                println!("{e}");
            }
            return;
        }
        let mut parts = rest.split(',');
        let Some(addr) = parts.next().and_then(parse_hex) else {
            println!("address missing");
            return;
        };
        let pass = parts.next().and_then(parse_hex).map_or(1, u32::from);
        if let Err(e) = self.breaks.set(slot, addr, pass, &self.m.mem) {
            println!("{e}");
        }
    }

    fn do_hist(&mut self, s: &str) {
        let s = s.trim();
        if s.starts_with('c') {
            self.m.cpu.history.clear();
            return;
        }
        if self.m.cpu.history.is_empty() {
            println!("History memory is empty");
            return;
        }
        let start = parse_hex(s);
        let is_z80 = self.m.cpu.model == Model::Z80;
        let mut skipping = start.is_some();
        let mut lines = 0;
        for e in self.m.cpu.history.iter() {
            if skipping {
                if e.pc < start.unwrap() {
                    continue;
                }
                skipping = false;
            }
            if is_z80 {
                println!(
                    "{:04x} AF={:04x} BC={:04x} DE={:04x} HL={:04x} IX={:04x} IY={:04x} SP={:04x}",
                    e.pc, e.af, e.bc, e.de, e.hl, e.ix, e.iy, e.sp
                );
            } else {
                println!(
                    "{:04x} AF={:04x} BC={:04x} DE={:04x} HL={:04x} SP={:04x}",
                    e.pc, e.af, e.bc, e.de, e.hl, e.sp
                );
            }
            lines += 1;
            if lines == 20 {
                lines = 0;
                print!("q = quit, else continue: ");
                io::stdout().flush().ok();
                let key = getkey().unwrap_or('q');
                println!();
                if key.eq_ignore_ascii_case(&'q') {
                    break;
                }
            }
        }
    }

    fn do_count(&mut self, s: &str) {
        let s = s.trim();
        if s.is_empty() {
            let w = &self.m.cpu.twin;
            println!("start  stop  status  T-states");
            println!(
                "{:04x}   {:04x}    {}   {}",
                w.start,
                w.end,
                if w.on { "on " } else { "off" },
                w.total
            );
        } else {
            let mut parts = s.split(',');
            let start = parts.next().and_then(parse_hex).unwrap_or(0xFFFF);
            let end = parts.next().and_then(parse_hex).unwrap_or(0xFFFF);
            self.m.cpu.twin.set(start, end);
        }
    }

    /// Clock calibration: run `JP 0000H` from address 0 for three wall
    /// seconds; every iteration is one opcode fetch, so the refresh count
    /// over 10 T per JP gives the emulated frequency.
    fn do_clock(&mut self) {
        let save = [
            self.m.mem.peek(0x0000),
            self.m.mem.peek(0x0001),
            self.m.mem.peek(0x0002),
        ];
        self.m.mem.poke(0x0000, 0xC3);
        self.m.mem.poke(0x0001, 0x00);
        self.m.mem.poke(0x0002, 0x00);
        self.m.cpu.regs.pc = 0;
        self.m.cpu.regs.r = 0;
        let fetches_before = self.m.cpu.refresh;

        // One-shot timer in place of a SIGALRM: stops the CPU through the
        // same latch the panel uses.
        let ctl = Arc::clone(self.m.ctl());
        let timer = thread::spawn(move || {
            thread::sleep(Duration::from_secs(3));
            ctl.set_cpu_state(run_state::STOPPED);
        });
        self.m.run();
        timer.join().ok();

        self.m.mem.poke(0x0000, save[0]);
        self.m.mem.poke(0x0001, save[1]);
        self.m.mem.poke(0x0002, save[2]);

        if self.m.ctl().cpu_error() == CpuError::None {
            let count = self.m.cpu.refresh - fetches_before;
            println!(
                "CPU executed {} {} instructions in 3 seconds",
                count,
                if self.m.cpu.model == Model::Z80 { "JP" } else { "JMP" }
            );
            println!("clock frequency = {:5.2} MHz", count as f64 / 300_000.0);
        } else {
            println!("Interrupted");
        }
    }

    fn do_show(&self) {
        println!("Release: {}", env!("CARGO_PKG_VERSION"));
        println!("No. of entries in history memory: {HISIZE}");
        println!("No. of software breakpoints: {SBSIZE}");
        println!(
            "Undocumented op-codes {}executed",
            if self.m.cpu.undoc_allowed { "" } else { "not " }
        );
        println!("T-State counting possible");
    }

    fn do_load(&mut self, s: &str) {
        let s = s.trim();
        let (file, addr) = match s.split_once(',') {
            Some((f, a)) => (f.trim(), parse_hex(a).unwrap_or(0)),
            None => (s, 0),
        };
        if file.is_empty() {
            println!("filename missing");
            return;
        }
        match self.m.mem.load_file(std::path::Path::new(file), addr, None) {
            Ok(n) => println!("Loader statistics for file {file}: {n} bytes"),
            Err(e) => println!("{e}"),
        }
        self.wrk_addr = self.m.cpu.regs.pc;
    }

    fn do_unix(&mut self, s: &str) {
        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(s.trim())
            .status();
        if let Err(e) = status {
            println!("external command: {e}");
        }
    }

    fn do_help(&self) {
        println!("r filename[,address]      read object into memory");
        println!("d [address]               dump memory");
        println!("l [address]               list memory");
        println!("m [address]               modify memory");
        println!("f address,count,value     fill memory");
        println!("v from,to,count           move memory");
        println!("p address                 show/modify port");
        println!("g [address]               run program");
        println!("t [count]                 trace program");
        println!("return                    single step program");
        println!("x [register]              show/modify register");
        println!("x f<flag>                 modify flag");
        println!("b[no] address[,pass]      set soft breakpoint");
        println!("b                         show soft breakpoints");
        println!("b[no] c                   clear soft breakpoint");
        println!("h [address]               show history");
        println!("h c                       clear history");
        println!("z start,stop              set trigger addr for t-state count");
        println!("z                         show t-state count");
        println!("c                         measure clock frequency");
        println!("s                         show settings");
        println!("! command                 execute external command");
        println!("q                         quit");
    }

    // --- Shared helpers -------------------------------------------------

    fn report_error(&self) {
        if let Some(msg) = self.m.describe_error() {
            println!("\n{msg}");
        }
    }

    /// Disassemble one instruction, print it, return the next address.
    fn disass_at(&self, addr: u16) -> u16 {
        let mem = &self.m.mem;
        let d = disassemble(self.m.cpu.model, |a| mem.fp_read(a), addr);
        println!("{}", d.text);
        addr.wrapping_add(d.len)
    }
}

/// Leading-hex-digits parse, like the original's exatoi: stops at the
/// first non-hex character, empty input is None.
fn parse_hex(s: &str) -> Option<u16> {
    let s = s.trim_start();
    let digits: String = s.chars().take_while(|c| c.is_ascii_hexdigit()).collect();
    if digits.is_empty() {
        return None;
    }
    let mut v: u32 = 0;
    for c in digits.chars() {
        v = (v << 4 | c.to_digit(16).unwrap()) & 0xFFFF;
    }
    Some(v as u16)
}

enum RegKind {
    R8(fn(&mut Registers) -> &mut u8),
    Pair(fn(&mut Registers) -> &mut u8, fn(&mut Registers) -> &mut u8),
    R16(fn(&mut Registers) -> &mut u16),
    FlagBit(u8),
}

struct RegDef {
    name: &'static str,
    print: &'static str,
    z80_only: bool,
    kind: RegKind,
}

/// Register table, sorted longest name first so `bc'` wins over `bc` and
/// `pc` over `p`.
static REGS: &[RegDef] = &[
    RegDef { name: "bc'", print: "BC'", z80_only: true, kind: RegKind::Pair(|r| &mut r.b_prime, |r| &mut r.c_prime) },
    RegDef { name: "de'", print: "DE'", z80_only: true, kind: RegKind::Pair(|r| &mut r.d_prime, |r| &mut r.e_prime) },
    RegDef { name: "hl'", print: "HL'", z80_only: true, kind: RegKind::Pair(|r| &mut r.h_prime, |r| &mut r.l_prime) },
    RegDef { name: "pc", print: "PC", z80_only: false, kind: RegKind::R16(|r| &mut r.pc) },
    RegDef { name: "bc", print: "BC", z80_only: false, kind: RegKind::Pair(|r| &mut r.b, |r| &mut r.c) },
    RegDef { name: "de", print: "DE", z80_only: false, kind: RegKind::Pair(|r| &mut r.d, |r| &mut r.e) },
    RegDef { name: "hl", print: "HL", z80_only: false, kind: RegKind::Pair(|r| &mut r.h, |r| &mut r.l) },
    RegDef { name: "ix", print: "IX", z80_only: true, kind: RegKind::R16(|r| &mut r.ix) },
    RegDef { name: "iy", print: "IY", z80_only: true, kind: RegKind::R16(|r| &mut r.iy) },
    RegDef { name: "sp", print: "SP", z80_only: false, kind: RegKind::R16(|r| &mut r.sp) },
    RegDef { name: "fs", print: "S", z80_only: false, kind: RegKind::FlagBit(flag::S) },
    RegDef { name: "fz", print: "Z", z80_only: false, kind: RegKind::FlagBit(flag::Z) },
    RegDef { name: "fh", print: "H", z80_only: false, kind: RegKind::FlagBit(flag::H) },
    RegDef { name: "fp", print: "P", z80_only: false, kind: RegKind::FlagBit(flag::PV) },
    RegDef { name: "fn", print: "N", z80_only: true, kind: RegKind::FlagBit(flag::N) },
    RegDef { name: "fc", print: "C", z80_only: false, kind: RegKind::FlagBit(flag::C) },
    RegDef { name: "a'", print: "A'", z80_only: true, kind: RegKind::R8(|r| &mut r.a_prime) },
    RegDef { name: "f'", print: "F'", z80_only: true, kind: RegKind::R8(|r| &mut r.f_prime) },
    RegDef { name: "b'", print: "B'", z80_only: true, kind: RegKind::R8(|r| &mut r.b_prime) },
    RegDef { name: "c'", print: "C'", z80_only: true, kind: RegKind::R8(|r| &mut r.c_prime) },
    RegDef { name: "d'", print: "D'", z80_only: true, kind: RegKind::R8(|r| &mut r.d_prime) },
    RegDef { name: "e'", print: "E'", z80_only: true, kind: RegKind::R8(|r| &mut r.e_prime) },
    RegDef { name: "h'", print: "H'", z80_only: true, kind: RegKind::R8(|r| &mut r.h_prime) },
    RegDef { name: "l'", print: "L'", z80_only: true, kind: RegKind::R8(|r| &mut r.l_prime) },
    RegDef { name: "i", print: "I", z80_only: true, kind: RegKind::R8(|r| &mut r.i) },
    RegDef { name: "a", print: "A", z80_only: false, kind: RegKind::R8(|r| &mut r.a) },
    RegDef { name: "f", print: "F", z80_only: false, kind: RegKind::R8(|r| &mut r.f) },
    RegDef { name: "b", print: "B", z80_only: false, kind: RegKind::R8(|r| &mut r.b) },
    RegDef { name: "c", print: "C", z80_only: false, kind: RegKind::R8(|r| &mut r.c) },
    RegDef { name: "d", print: "D", z80_only: false, kind: RegKind::R8(|r| &mut r.d) },
    RegDef { name: "e", print: "E", z80_only: false, kind: RegKind::R8(|r| &mut r.e) },
    RegDef { name: "h", print: "H", z80_only: false, kind: RegKind::R8(|r| &mut r.h) },
    RegDef { name: "l", print: "L", z80_only: false, kind: RegKind::R8(|r| &mut r.l) },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_stops_at_non_hex() {
        assert_eq!(parse_hex("  1f00"), Some(0x1F00));
        assert_eq!(parse_hex("ff,3"), Some(0xFF));
        assert_eq!(parse_hex("12345"), Some(0x2345), "wraps like the original");
        assert_eq!(parse_hex(""), None);
        assert_eq!(parse_hex("g"), None);
    }

    #[test]
    fn register_table_prefers_longer_names() {
        let bc_idx = REGS.iter().position(|d| d.name == "bc").unwrap();
        let bc_alt_idx = REGS.iter().position(|d| d.name == "bc'").unwrap();
        assert!(bc_alt_idx < bc_idx, "bc' resolves before bc");
        for w in REGS.windows(2) {
            assert!(w[0].name.len() >= w[1].name.len(), "table sorted by length");
        }
    }
}
