use std::sync::mpsc;

use sim80_core::core::bus::{CPU_M1, CPU_MEMR, CPU_WO};
use sim80_core::core::latches::{CpuError, cpu_switch, reset_mode, run_state};
use sim80_core::cpu::Model;
use sim80_core::memory::PageAttr;
use sim80_machines::panel::post_event;
use sim80_machines::{Config, HeadlessPanel, Machine, SwitchEvent};

fn machine() -> Machine {
    let mut m = Machine::new(Model::Z80, Config::default());
    m.power_on(0).unwrap();
    m.handle_switch(SwitchEvent::PowerOn);
    m
}

#[test]
fn power_on_shows_pc_view() {
    let mut m = Machine::new(Model::Z80, Config::default());
    m.power_on(0x21).unwrap();
    m.cpu.regs.pc = 0x0100;
    m.handle_switch(SwitchEvent::PowerOn);

    assert!(m.ctl().power());
    assert_eq!(m.panel().cpu_bus(), CPU_WO | CPU_M1 | CPU_MEMR);
    assert_eq!(m.panel().led_address(), 0x0100);
    assert_eq!(m.panel().led_data(), 0x21);
    assert!(m.panel().led_wait());
}

#[test]
fn power_off_raises_poweroff_error() {
    let mut m = machine();
    m.handle_switch(SwitchEvent::PowerOff);
    assert!(!m.ctl().power());
    assert_eq!(m.ctl().cpu_error(), CpuError::PowerOff);
    assert_eq!(m.ctl().cpu_state(), run_state::STOPPED);
    assert_eq!(m.ctl().cpu_switch(), cpu_switch::IDLE);
}

#[test]
fn switches_do_nothing_without_power() {
    let mut m = Machine::new(Model::Z80, Config::default());
    m.power_on(0).unwrap();
    m.handle_switch(SwitchEvent::Run);
    assert_eq!(m.ctl().cpu_state(), run_state::STOPPED);
    m.handle_switch(SwitchEvent::Step);
    assert_eq!(m.ctl().cpu_switch(), cpu_switch::IDLE);
    m.handle_switch(SwitchEvent::DepositUp);
    assert_eq!(m.mem.get(0x0000), 0x00);
}

#[test]
fn run_and_stop_transitions() {
    let mut m = machine();
    m.handle_switch(SwitchEvent::Run);
    assert_eq!(m.ctl().cpu_state(), run_state::CONTIN_RUN);
    assert_eq!(m.ctl().cpu_switch(), cpu_switch::RUN);

    m.handle_switch(SwitchEvent::Stop);
    assert_eq!(m.ctl().cpu_state(), run_state::STOPPED);
    assert_eq!(m.ctl().cpu_switch(), cpu_switch::IDLE);
    assert!(m.panel().led_wait());
}

#[test]
fn step_is_refused_while_running() {
    let mut m = machine();
    m.handle_switch(SwitchEvent::Run);
    m.handle_switch(SwitchEvent::Step);
    assert_ne!(m.ctl().cpu_switch(), cpu_switch::STEP);
}

#[test]
fn examine_and_deposit() {
    let mut m = machine();
    m.ctl().set_address_switch(0x1234);
    m.handle_switch(SwitchEvent::ExamineUp);
    assert_eq!(m.cpu.regs.pc, 0x1234);
    assert_eq!(m.panel().led_address(), 0x1234);

    m.handle_switch(SwitchEvent::ExamineDown);
    assert_eq!(m.cpu.regs.pc, 0x1235);

    m.ctl().set_address_switch(0x00AA);
    m.handle_switch(SwitchEvent::DepositUp);
    assert_eq!(m.mem.get(0x1235), 0xAA);
    assert_eq!(m.panel().led_data(), 0xAA);

    m.handle_switch(SwitchEvent::DepositDown);
    assert_eq!(m.cpu.regs.pc, 0x1236);
    assert_eq!(m.mem.get(0x1236), 0xAA);
}

#[test]
fn deposit_refused_on_protected_page() {
    let mut m = machine();
    m.cpu.regs.pc = 0x8000;
    m.mem.set_attr(0x80, PageAttr::Wprot);
    m.mem.poke(0x8000, 0x11);

    m.ctl().set_address_switch(0x00AA);
    m.handle_switch(SwitchEvent::DepositUp);
    assert_eq!(m.mem.get(0x8000), 0x11, "deposit silently refused");
    assert!(m.panel().mem_wp(), "write-protect LED raised");

    m.handle_switch(SwitchEvent::DepositDown);
    assert_eq!(m.cpu.regs.pc, 0x8000, "PC not advanced on refusal");
}

#[test]
fn examine_refused_while_halted() {
    let mut m = machine();
    m.cpu.regs.iff1 = true;
    m.mem.poke(0x0000, 0x76); // HALT idles with HLTA on the bus
    m.step();
    assert!(m.cpu.halted);

    m.ctl().set_address_switch(0x1234);
    m.handle_switch(SwitchEvent::ExamineUp);
    assert_ne!(m.cpu.regs.pc, 0x1234, "examine refused during HLTA");
    m.handle_switch(SwitchEvent::DepositUp);
    assert_eq!(m.mem.get(0x0001), 0x00, "deposit refused during HLTA");
}

#[test]
fn protect_and_unprotect_page_under_pc() {
    let mut m = machine();
    m.cpu.regs.pc = 0x4000;
    m.handle_switch(SwitchEvent::ProtectUp);
    assert_eq!(m.mem.attr(0x40), PageAttr::Wprot);
    assert!(m.panel().mem_wp());

    m.handle_switch(SwitchEvent::ProtectDown);
    assert_eq!(m.mem.attr(0x40), PageAttr::Rw);
    assert!(!m.panel().mem_wp());
}

#[test]
fn protect_leaves_rom_alone() {
    let mut m = machine();
    m.cpu.regs.pc = 0x4000;
    m.mem.set_attr(0x40, PageAttr::Ro);
    m.handle_switch(SwitchEvent::ProtectUp);
    assert_eq!(m.mem.attr(0x40), PageAttr::Ro);
    m.handle_switch(SwitchEvent::ProtectDown);
    assert_eq!(m.mem.attr(0x40), PageAttr::Ro);
}

#[test]
fn reset_up_center_sequence() {
    let mut m = machine();
    m.cpu.regs.pc = 0x2000;
    m.cpu.regs.iff1 = true;
    m.handle_switch(SwitchEvent::Run);

    m.handle_switch(SwitchEvent::ResetUp);
    assert_eq!(m.ctl().reset(), reset_mode::CPU_ONLY);
    assert_ne!(
        m.ctl().cpu_state() & run_state::RESET,
        0,
        "RESET bit forces the run loop out"
    );
    assert!(!m.cpu.regs.iff1);

    m.handle_switch(SwitchEvent::ResetCenter);
    assert_eq!(m.ctl().reset(), reset_mode::NONE);
    assert_eq!(m.cpu.regs.pc, 0x0000);
    assert_eq!(m.panel().cpu_bus(), CPU_WO | CPU_M1 | CPU_MEMR);
}

#[test]
fn cold_reset_loads_boot_switch() {
    use sim80_core::memory::{MemSection, MemSegment};
    let cfg = Config {
        sections: vec![MemSection {
            segments: vec![MemSegment {
                attr: PageAttr::Rw,
                start_page: 0,
                pages: 256,
                rom_file: None,
            }],
            boot_switch: 0xFF00,
        }],
        ..Config::default()
    };
    let mut m = Machine::new(Model::Z80, cfg);
    m.power_on(0).unwrap();
    m.handle_switch(SwitchEvent::PowerOn);
    m.cpu.regs.pc = 0x2000;

    m.handle_switch(SwitchEvent::ResetDown);
    m.handle_switch(SwitchEvent::ResetCenter);
    assert_eq!(m.cpu.regs.pc, 0xFF00, "cold reset lands on the boot switch");

    // With the hold flag, PC survives the cold reset... except reset()
    // itself zeroes it; the flag only skips the boot-switch load.
    m.cfg.hold_pc_on_cold_reset = true;
    m.cpu.regs.pc = 0x2000;
    m.handle_switch(SwitchEvent::ResetDown);
    m.handle_switch(SwitchEvent::ResetCenter);
    assert_eq!(m.cpu.regs.pc, 0x0000);
}

#[test]
fn int_switch_raises_and_boots() {
    let mut m = machine();
    m.handle_switch(SwitchEvent::IntUp);
    assert!(m.ctl().int_int());
    assert_eq!(m.ctl().int_data(), -1);

    m.cpu.regs.pc = 0x2000;
    m.handle_switch(SwitchEvent::IntDown);
    assert_eq!(m.cpu.regs.pc, 0x0000, "boot switch defaults to 0");
}

#[test]
fn posted_events_split_hot_and_queued() {
    let m = machine();
    let ctl = m.ctl();
    let (tx, rx) = mpsc::channel();

    post_event(ctl, &tx, SwitchEvent::Run);
    assert_eq!(ctl.cpu_state(), run_state::CONTIN_RUN);
    assert!(rx.try_recv().is_err(), "hot-only events are not queued");

    post_event(ctl, &tx, SwitchEvent::Stop);
    assert_eq!(ctl.cpu_state(), run_state::STOPPED);

    post_event(ctl, &tx, SwitchEvent::ExamineUp);
    assert_eq!(rx.try_recv().unwrap(), SwitchEvent::ExamineUp);

    post_event(ctl, &tx, SwitchEvent::ResetUp);
    assert_eq!(ctl.reset(), reset_mode::CPU_ONLY);
    assert_eq!(
        rx.try_recv().unwrap(),
        SwitchEvent::ResetUp,
        "reset also queues for the register-file part"
    );

    post_event(ctl, &tx, SwitchEvent::PowerOff);
    assert_eq!(ctl.cpu_error(), CpuError::PowerOff);
}

#[test]
fn panel_loop_runs_a_program_and_powers_off() {
    let mut m = machine();
    // LD A,42; HALT with interrupts off ends the run with OPHALT... but
    // the session should end via POWER off, so just spin on a jump.
    m.mem.poke(0x0000, 0xC3);
    m.mem.poke(0x0001, 0x00);
    m.mem.poke(0x0002, 0x00); // JP 0000

    let ctl = std::sync::Arc::clone(m.ctl());
    let (tx, rx) = mpsc::channel();
    let poster = std::thread::spawn(move || {
        post_event(&ctl, &tx, SwitchEvent::Run);
        std::thread::sleep(std::time::Duration::from_millis(50));
        post_event(&ctl, &tx, SwitchEvent::Stop);
        std::thread::sleep(std::time::Duration::from_millis(30));
        post_event(&ctl, &tx, SwitchEvent::PowerOff);
    });

    m.panel_loop(&mut HeadlessPanel, &rx);
    poster.join().unwrap();

    assert_eq!(m.ctl().cpu_error(), CpuError::PowerOff);
    assert!(m.cpu.t > 0, "the CPU actually ran");
    assert_eq!(m.panel().led_address(), 0, "LEDs cleared on shutdown");
}
