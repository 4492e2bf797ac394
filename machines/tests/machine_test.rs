use sim80_core::core::bus::{CPU_HLTA, CPU_M1, CPU_MEMR, CPU_WO};
use sim80_core::core::latches::CpuError;
use sim80_core::cpu::Model;
use sim80_machines::{Config, Machine};

fn machine() -> Machine {
    let mut m = Machine::new(Model::Z80, Config::default());
    m.power_on(0).unwrap();
    m
}

#[test]
fn bus_publishes_m1_status_and_leds() {
    let mut m = machine();
    m.mem.poke(0x0000, 0x3E); // LD A,42
    m.mem.poke(0x0001, 0x42);
    m.step();

    assert_eq!(m.cpu.regs.a, 0x42);
    // The last machine cycle was the operand read; the fetch before it
    // carried M1.
    assert_eq!(m.panel().cpu_bus(), CPU_WO | CPU_MEMR);
    assert_eq!(m.panel().led_address(), 0x0001);
    assert_eq!(m.panel().led_data(), 0x42);
}

#[test]
fn halt_shows_hlta() {
    let mut m = machine();
    m.cpu.regs.iff1 = true; // avoid OPHALT, idle in the halt loop
    m.mem.poke(0x0000, 0x76);
    m.step();
    assert!(m.cpu.halted);
    assert_ne!(m.panel().cpu_bus() & CPU_HLTA, 0);
}

#[test]
fn unmapped_input_traps_when_configured() {
    let mut m = machine();
    assert!(m.cfg.trap_unmapped_io);
    m.mem.poke(0x0000, 0xDB); // IN A,(10)
    m.mem.poke(0x0001, 0x10);
    m.step();

    assert_eq!(m.ctl().cpu_error(), CpuError::IoTrapIn);
    assert_eq!(m.ctl().trap_port(), 0x10);
    let msg = m.describe_error().unwrap();
    assert!(msg.contains("I/O input Trap"), "{msg}");
    assert!(msg.contains("port 10"), "{msg}");
}

#[test]
fn unmapped_io_floats_when_not_trapping() {
    let cfg = Config {
        trap_unmapped_io: false,
        ..Config::default()
    };
    let mut m = Machine::new(Model::Z80, cfg);
    m.power_on(0).unwrap();
    m.mem.poke(0x0000, 0xDB);
    m.mem.poke(0x0001, 0x10);
    m.step();

    assert_eq!(m.ctl().cpu_error(), CpuError::None);
    assert_eq!(m.cpu.regs.a, 0xFF);
}

#[test]
fn sense_port_returns_switch_row() {
    let mut m = machine();
    m.ctl().set_address_switch(0x5A00);
    m.mem.poke(0x0000, 0xDB); // IN A,(FF)
    m.mem.poke(0x0001, 0xFF);
    m.step();
    assert_eq!(m.cpu.regs.a, 0x5A);
}

#[test]
fn fp_port_seeds_the_switch_row() {
    let cfg = Config {
        fp_port: 0x0A,
        ..Config::default()
    };
    let m = Machine::new(Model::Z80, cfg);
    assert_eq!(m.ctl().address_switch(), 0x0A00);
}

#[test]
fn op_trap_report_shows_bytes() {
    let mut m = machine();
    m.mem.poke(0x0000, 0xDD); // DD 00 is not a documented encoding
    m.mem.poke(0x0001, 0x00);
    m.step();

    assert_eq!(m.ctl().cpu_error(), CpuError::OpTrap2);
    let msg = m.describe_error().unwrap();
    assert!(msg.contains("Op-code trap at 0000 dd 00"), "{msg}");
}

#[test]
fn snapshot_round_trip_through_machine() {
    let mut m = machine();
    m.cpu.regs.set_bc(0x1234);
    m.mem.poke(0x4000, 0x77);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    m.save_snapshot(&path).unwrap();

    let mut m2 = Machine::new(Model::I8080, Config::default());
    m2.load_snapshot(&path).unwrap();
    assert_eq!(m2.cpu.model, Model::Z80);
    assert_eq!(m2.cpu.regs.bc(), 0x1234);
    assert_eq!(m2.mem.get(0x4000), 0x77);
}

#[test]
fn run_executes_until_halt() {
    let mut m = machine();
    // Count down from 5 in B, then HALT.
    m.mem.poke(0x0000, 0x06); // LD B,5
    m.mem.poke(0x0001, 0x05);
    m.mem.poke(0x0002, 0x05); // DEC B
    m.mem.poke(0x0003, 0xC2); // JP NZ,0002
    m.mem.poke(0x0004, 0x02);
    m.mem.poke(0x0005, 0x00);
    m.mem.poke(0x0006, 0x76); // HALT
    m.run();

    assert_eq!(m.cpu.regs.b, 0);
    assert_eq!(m.ctl().cpu_error(), CpuError::OpHalt);
    assert_eq!(m.describe_error().unwrap(), "INT disabled and HALT Op-Code reached at 0006");
    assert!(m.describe_stats().is_some());
}
