use sim80_core::core::latches::CpuError;
use sim80_core::cpu::{Cpu, Model, flag};

mod common;
use common::{TestBus, step_t};

fn cpu() -> Cpu {
    Cpu::new(Model::I8080)
}

const FIXED_MASK: u8 = flag::N | flag::Y | flag::X;

fn assert_fixed_bits(f: u8) {
    assert_eq!(f & FIXED_MASK, flag::N, "bit 1 high, bits 3/5 low: {f:#04x}");
}

#[test]
fn daa_nine_b() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.a = 0x9B;
    cpu.regs.f = flag::N; // CY=0, AC=0
    bus.load(0, &[0x27]); // DAA

    step_t(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0x01);
    assert_ne!(cpu.regs.f & flag::C, 0, "CY set");
    assert_ne!(cpu.regs.f & flag::H, 0, "AC set");
    assert_fixed_bits(cpu.regs.f);
}

#[test]
fn fixed_flag_bits_survive_an_op_sweep() {
    // LD/arith/logic/rotate mix; after every op F keeps its fixed bits.
    let program: &[u8] = &[
        0x3E, 0x9B, // MVI A,9B
        0x06, 0x77, // MVI B,77
        0x80, // ADD B
        0x90, // SUB B
        0xA0, // ANA B
        0xA8, // XRA B
        0xB0, // ORA B
        0xB8, // CMP B
        0x07, // RLC
        0x3C, // INR A
        0x27, // DAA
        0x09, // DAD B
        0xFE, 0x12, // CPI 12
    ];
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.f = 0xFF; // worst case: every bit set before the fixup
    bus.load(0, program);

    let mut pc = 0;
    while (cpu.regs.pc as usize) < program.len() {
        step_t(&mut cpu, &mut bus);
        assert_ne!(cpu.regs.pc, pc, "program advances");
        pc = cpu.regs.pc;
        assert_fixed_bits(cpu.regs.f);
    }
}

#[test]
fn mov_costs() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.b = 0x55;
    cpu.regs.set_hl(0x2000);
    bus.load(0, &[0x48, 0x70, 0x7E]); // MOV C,B; MOV M,B; MOV A,M

    assert_eq!(step_t(&mut cpu, &mut bus), 5);
    assert_eq!(cpu.regs.c, 0x55);
    assert_eq!(step_t(&mut cpu, &mut bus), 7);
    assert_eq!(step_t(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.regs.a, 0x55);
}

#[test]
fn inr_keeps_carry() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.a = 0x0F;
    cpu.regs.f = flag::C | flag::N;
    bus.load(0, &[0x3C]); // INR A

    assert_eq!(step_t(&mut cpu, &mut bus), 5);
    assert_eq!(cpu.regs.a, 0x10);
    assert_ne!(cpu.regs.f & flag::C, 0, "CY untouched");
    assert_ne!(cpu.regs.f & flag::H, 0, "AC from nibble rollover");
}

#[test]
fn sub_ac_reads_inverted() {
    // 8080 AC after subtraction is the complement of the Z80 borrow.
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.a = 0x10;
    cpu.regs.b = 0x01;
    bus.load(0, &[0x90]); // SUB B

    step_t(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0x0F);
    assert_eq!(cpu.regs.f & flag::H, 0, "borrow from bit 4 clears AC");

    let mut cpu = Cpu::new(Model::I8080);
    cpu.regs.a = 0x1F;
    cpu.regs.b = 0x01;
    let mut bus = TestBus::new();
    bus.load(0, &[0x90]);
    step_t(&mut cpu, &mut bus);
    assert_ne!(cpu.regs.f & flag::H, 0, "no borrow sets AC");
}

#[test]
fn ana_ac_from_bit3() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.a = 0x08;
    cpu.regs.b = 0x00;
    bus.load(0, &[0xA0]); // ANA B

    step_t(&mut cpu, &mut bus);
    assert_ne!(cpu.regs.f & flag::H, 0, "AC from OR of bit 3");
    assert_eq!(cpu.regs.f & flag::C, 0);
}

#[test]
fn dad_touches_only_carry() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.set_hl(0xFFFF);
    cpu.regs.set_bc(0x0001);
    cpu.regs.f = flag::Z | flag::N;
    bus.load(0, &[0x09]); // DAD B

    assert_eq!(step_t(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.regs.hl(), 0x0000);
    assert_ne!(cpu.regs.f & flag::C, 0);
    assert_ne!(cpu.regs.f & flag::Z, 0, "Z preserved");
}

#[test]
fn stack_and_psw() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.sp = 0x9000;
    cpu.regs.a = 0x42;
    cpu.regs.f = flag::N | flag::C;
    bus.load(0, &[0xF5, 0xAF, 0xF1]); // PUSH PSW; XRA A; POP PSW

    assert_eq!(step_t(&mut cpu, &mut bus), 11);
    step_t(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0);
    assert_eq!(step_t(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.regs.a, 0x42);
    assert_ne!(cpu.regs.f & flag::C, 0);
    assert_fixed_bits(cpu.regs.f);
}

#[test]
fn hlt_costs_seven() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.iff1 = true;
    bus.load(0, &[0x76]);

    assert_eq!(step_t(&mut cpu, &mut bus), 7);
    assert!(cpu.halted);
}

#[test]
fn undocumented_aliases_trap_without_opt_in() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    bus.load(0, &[0x08]);

    cpu.step(&mut bus);
    assert_eq!(cpu.ctl().cpu_error(), CpuError::OpTrap1);

    let mut cpu = Cpu::new(Model::I8080);
    cpu.undoc_allowed = true;
    let mut bus = TestBus::new();
    bus.load(0, &[0xCB, 0x00, 0x10]); // shadow JMP
    cpu.step(&mut bus);
    assert_eq!(cpu.ctl().cpu_error(), CpuError::None);
    assert_eq!(cpu.regs.pc, 0x1000);
}

#[test]
fn i8080_interrupt_is_rst_style() {
    let mut cpu = cpu();
    let mut bus = TestBus::new();
    cpu.regs.pc = 0x0200;
    cpu.regs.sp = 0x9000;
    cpu.regs.iff1 = true;
    bus.int_vector = 0xFF; // RST 7
    cpu.ctl().raise_int(0xFF);

    let t = step_t(&mut cpu, &mut bus);
    assert_eq!(t, 11);
    assert_eq!(cpu.regs.pc, 0x0038);
    assert_eq!(bus.mem.get(0x8FFE), 0x00);
    assert_eq!(bus.mem.get(0x8FFF), 0x02);
}

#[test]
fn model_switch_takes_effect_in_run_loop() {
    let mut cpu = Cpu::new(Model::Z80);
    let mut bus = TestBus::new();
    // Z80 program ends in HALT with interrupts dead.
    bus.load(0, &[0x3E, 0x11, 0x76]);
    cpu.run(&mut bus);
    assert_eq!(cpu.regs.a, 0x11);

    cpu.regs.f = 0xFF;
    cpu.switch_model(Model::I8080);
    cpu.regs.pc = 0x0010;
    bus.load(0x0010, &[0x3E, 0x22, 0x76]);
    cpu.run(&mut bus);
    assert_eq!(cpu.model, Model::I8080);
    assert_eq!(cpu.regs.a, 0x22);
    assert_fixed_bits(cpu.regs.f);
}
