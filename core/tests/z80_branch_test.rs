use sim80_core::cpu::{Cpu, Model, flag};

mod common;
use common::{TestBus, step_t};

fn cpu() -> Cpu {
    Cpu::new(Model::Z80)
}

#[test]
fn jp_taken_and_not_taken_cost_ten() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.f = 0;
    bus.load(0, &[0xCA, 0x00, 0x20]); // JP Z,2000 (not taken)
    bus.load(3, &[0xC3, 0x00, 0x10]); // JP 1000

    assert_eq!(step_t(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.regs.pc, 0x0003);
    assert_eq!(step_t(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.regs.pc, 0x1000);
}

#[test]
fn jr_costs_differ_by_condition() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.f = flag::C;
    bus.load(0, &[0x30, 0x10]); // JR NC,+10 (not taken)
    bus.load(2, &[0x38, 0x10]); // JR C,+10 (taken)

    assert_eq!(step_t(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.regs.pc, 0x0002);
    assert_eq!(step_t(&mut cpu, &mut bus), 12);
    assert_eq!(cpu.regs.pc, 0x0014);
}

#[test]
fn jr_backwards() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x18, 0xFE]); // JR $
    cpu.regs.pc = 0x0100;

    step_t(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.pc, 0x0100);
}

#[test]
fn djnz_loops_until_b_zero() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.b = 2;
    cpu.regs.pc = 0x0100;
    bus.load(0x0100, &[0x10, 0xFE]); // DJNZ $

    assert_eq!(step_t(&mut cpu, &mut bus), 13);
    assert_eq!(cpu.regs.pc, 0x0100);
    assert_eq!(step_t(&mut cpu, &mut bus), 8);
    assert_eq!(cpu.regs.pc, 0x0102);
    assert_eq!(cpu.regs.b, 0);
}

#[test]
fn call_and_ret() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.sp = 0x9000;
    bus.load(0, &[0xCD, 0x00, 0x10]); // CALL 1000
    bus.load(0x1000, &[0xC9]); // RET

    assert_eq!(step_t(&mut cpu, &mut bus), 17);
    assert_eq!(cpu.regs.pc, 0x1000);
    assert_eq!(cpu.regs.sp, 0x8FFE);
    assert_eq!(bus.mem.get(0x8FFE), 0x03);
    assert_eq!(bus.mem.get(0x8FFF), 0x00);

    assert_eq!(step_t(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.regs.pc, 0x0003);
    assert_eq!(cpu.regs.sp, 0x9000);
}

#[test]
fn conditional_call_and_ret_costs() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.sp = 0x9000;
    cpu.regs.f = flag::Z;
    bus.load(0, &[0xC4, 0x00, 0x10]); // CALL NZ,1000 (not taken)
    bus.load(3, &[0xC8]); // RET Z (taken)
    bus.load(0x8FFE, &[0x34, 0x12]);
    cpu.regs.sp = 0x8FFE;

    assert_eq!(step_t(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.regs.pc, 0x0003);
    assert_eq!(step_t(&mut cpu, &mut bus), 11);
    assert_eq!(cpu.regs.pc, 0x1234);

    // RET NZ with Z set: 5 T, falls through.
    cpu.regs.pc = 0x1234;
    bus.load(0x1234, &[0xC0]);
    assert_eq!(step_t(&mut cpu, &mut bus), 5);
    assert_eq!(cpu.regs.pc, 0x1235);
}

#[test]
fn rst_pushes_and_vectors() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.sp = 0x9000;
    bus.load(0, &[0xEF]); // RST 28

    assert_eq!(step_t(&mut cpu, &mut bus), 11);
    assert_eq!(cpu.regs.pc, 0x0028);
    assert_eq!(bus.mem.get(0x8FFE), 0x01);
}

#[test]
fn jp_hl_and_jp_ix() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.set_hl(0x4000);
    cpu.regs.ix = 0x5000;
    bus.load(0, &[0xE9]); // JP (HL)
    bus.load(0x4000, &[0xDD, 0xE9]); // JP (IX)

    assert_eq!(step_t(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.regs.pc, 0x4000);
    assert_eq!(step_t(&mut cpu, &mut bus), 8);
    assert_eq!(cpu.regs.pc, 0x5000);
}

#[test]
fn jp_loop_feeds_clock_calibration() {
    // The calibration command derives MHz from the refresh counter over a
    // `JP 0000H` loop at 10 T per iteration; fetches and T-states must
    // stay locked 1:10.
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    bus.load(0, &[0xC3, 0x00, 0x00]);
    let fetches0 = cpu.refresh;
    let t0 = cpu.t;

    for _ in 0..1000 {
        step_t(&mut cpu, &mut bus);
    }
    assert_eq!(cpu.refresh - fetches0, 1000);
    assert_eq!(cpu.t - t0, 10_000);
    assert_eq!(cpu.regs.pc, 0x0000);
}

#[test]
fn retn_restores_iff1() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.sp = 0x8FFE;
    cpu.regs.iff1 = false;
    cpu.regs.iff2 = true;
    bus.load(0x8FFE, &[0x00, 0x10]);
    bus.load(0, &[0xED, 0x45]); // RETN

    assert_eq!(step_t(&mut cpu, &mut bus), 14);
    assert_eq!(cpu.regs.pc, 0x1000);
    assert!(cpu.regs.iff1);
}
