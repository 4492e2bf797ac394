use sim80_core::core::latches::CpuError;
use sim80_core::cpu::{Cpu, Model};
use sim80_core::debug::{BreakOutcome, HISIZE, SoftBreaks};

mod common;
use common::{TestBus, step_t};

fn cpu() -> Cpu {
    Cpu::new(Model::Z80)
}

#[test]
fn breakpoint_install_and_clear_leave_memory_unchanged() {
    let bus = TestBus::new();
    bus.mem.poke(0x0100, 0x3E);
    let mut breaks = SoftBreaks::new();

    let slot = breaks.set(None, 0x0100, 1, &bus.mem).unwrap();
    assert_eq!(bus.mem.get(0x0100), 0x76, "HALT trampoline installed");
    breaks.clear(slot, &bus.mem).unwrap();
    assert_eq!(bus.mem.get(0x0100), 0x3E, "original opcode restored");
}

#[test]
fn breakpoint_pass_counter_notifies_on_third_pass() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    // Five passes over 0x0100:
    //   LD B,5 / loop: NOP(bp) / DEC B / JP NZ,loop / HALT
    bus.load(0x0000, &[0x06, 0x05, 0xC3, 0x00, 0x01]);
    bus.load(0x0100, &[0x00, 0x05, 0xC2, 0x00, 0x01, 0x76]);

    let mut breaks = SoftBreaks::new();
    breaks.set(None, 0x0100, 3, &bus.mem).unwrap();

    let mut hits = Vec::new();
    loop {
        cpu.run(&mut bus);
        assert_eq!(cpu.ctl().cpu_error(), CpuError::OpHalt);
        match breaks.handle(&mut cpu, &mut bus) {
            BreakOutcome::Missed => break, // the final genuine HALT
            BreakOutcome::Continue => continue,
            BreakOutcome::Hit { addr, .. } => {
                hits.push((addr, cpu.regs.b));
                continue;
            }
        }
    }
    assert_eq!(hits, vec![(0x0100, 3)], "one stop, on the third pass");
    assert_eq!(cpu.regs.b, 0, "program ran to completion");
    assert_eq!(cpu.regs.pc, 0x0106);
}

#[test]
fn breakpoint_resets_pass_counter_after_hit() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    // Endless loop over the breakpoint address.
    bus.load(0x0000, &[0xC3, 0x00, 0x01]);
    bus.load(0x0100, &[0x00, 0xC3, 0x00, 0x01]); // NOP; JP 0100

    let mut breaks = SoftBreaks::new();
    breaks.set(None, 0x0100, 2, &bus.mem).unwrap();

    let mut hits = 0;
    for _ in 0..8 {
        cpu.run(&mut bus);
        match breaks.handle(&mut cpu, &mut bus) {
            BreakOutcome::Hit { .. } => hits += 1,
            BreakOutcome::Continue => {}
            BreakOutcome::Missed => panic!("unexpected genuine HALT"),
        }
    }
    assert_eq!(hits, 4, "every second pass notifies");
}

#[test]
fn history_records_and_wraps_under_execution() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.history_enabled = true;
    // A page of NOPs, then loop back.
    for a in 0..0x100u16 {
        bus.mem.poke(a, 0x00);
    }
    bus.mem.poke(0x0100, 0xC3); // JP 0000
    bus.mem.poke(0x0101, 0x00);
    bus.mem.poke(0x0102, 0x00);

    for _ in 0..10 {
        step_t(&mut cpu, &mut bus);
    }
    assert_eq!(cpu.history.len(), 10);
    assert!(!cpu.history.wrapped());
    let pcs: Vec<u16> = cpu.history.iter().map(|e| e.pc).collect();
    assert_eq!(pcs, (0..10).collect::<Vec<u16>>());

    for _ in 0..(HISIZE as u32 * 2) {
        step_t(&mut cpu, &mut bus);
    }
    assert_eq!(cpu.history.len(), HISIZE);
    assert!(cpu.history.wrapped());
}

#[test]
fn history_snapshot_is_pre_execution() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.history_enabled = true;
    cpu.regs.a = 0;
    bus.load(0, &[0x3E, 0x55]); // LD A,55

    step_t(&mut cpu, &mut bus);
    let entry = cpu.history.iter().next().unwrap();
    assert_eq!(entry.pc, 0);
    assert_eq!(entry.af >> 8, 0, "A captured before the load");
    assert_eq!(cpu.regs.a, 0x55);
}

#[test]
fn tstate_window_counts_only_inside() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.twin.set(0x0100, 0x01FF);
    bus.load(0x0000, &[0xC3, 0x00, 0x01]); // JP 0100 (outside, 10 T)
    bus.load(0x0100, &[0x00, 0x00, 0xC3, 0x00, 0x02]); // 2 NOPs + JP (inside)
    bus.load(0x0200, &[0x00]); // outside again

    for _ in 0..5 {
        step_t(&mut cpu, &mut bus);
    }
    assert_eq!(cpu.twin.total, 4 + 4 + 10, "two NOPs and the JP inside");
}
