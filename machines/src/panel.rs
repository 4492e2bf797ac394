//! Front-panel operation: switch events, the operator state machine and
//! the 10 ms panel loop.
//!
//! The renderer's input thread posts events through [`post_event`], which
//! latches the time-critical controls directly (so a running CPU observes
//! them at its next machine-cycle boundary) and queues the event for the
//! full transition on the operator thread.

use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::Duration;

use sim80_core::core::bus::{CPU_HLTA, CPU_INTA, CPU_M1, CPU_MEMR, CPU_WO};
use sim80_core::core::latches::{Control, CpuError, cpu_switch, reset_mode, run_state};

use crate::system::Machine;

/// Operator switch events. Three-position switches map to Up/Down pairs;
/// releasing to center only matters for RESET.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchEvent {
    PowerOn,
    PowerOff,
    Run,
    Stop,
    /// STEP up: one instruction.
    Step,
    /// STEP down: stop at every machine cycle, M1 included.
    StepCycle,
    ResetUp,
    ResetCenter,
    ResetDown,
    ExamineUp,
    ExamineDown,
    DepositUp,
    DepositDown,
    ProtectUp,
    ProtectDown,
    IntUp,
    IntDown,
    /// Window close; behaves like POWER off.
    WindowClosed,
}

/// Renderer driver contract. The renderer samples the `PanelState`
/// atomics itself; these hooks pace it and shut it down.
pub trait PanelDriver: Send {
    fn sample_switches(&mut self) {}
    fn sample_data(&mut self) {}
    fn framerate(&mut self, _fps: f32) {}
    fn quit(&mut self) {}
}

/// Driver for machines without a rendered panel.
pub struct HeadlessPanel;

impl PanelDriver for HeadlessPanel {}

/// Entry point for the input thread.
///
/// Latch-only controls act right here, so a CPU blocked in a run loop or
/// a wait-at-M1 spin observes them without the (possibly busy) operator
/// thread in between. Events that touch the machine itself are queued for
/// the operator loop. Nothing is both applied hot and queued: that would
/// double-apply edge-triggered controls like STEP.
pub fn post_event(ctl: &Control, tx: &Sender<SwitchEvent>, ev: SwitchEvent) {
    match ev {
        SwitchEvent::Run => {
            if ctl.power() && ctl.cpu_state() != run_state::CONTIN_RUN {
                ctl.set_cpu_state(run_state::CONTIN_RUN);
                ctl.set_cpu_switch(cpu_switch::RUN);
            }
        }
        SwitchEvent::Stop => {
            if ctl.power() {
                ctl.set_cpu_state(run_state::STOPPED);
                ctl.set_cpu_switch(cpu_switch::IDLE);
            }
        }
        SwitchEvent::Step | SwitchEvent::StepCycle => {
            if ctl.power() && ctl.cpu_state() != run_state::CONTIN_RUN {
                if ev == SwitchEvent::StepCycle {
                    ctl.set_m1_step(true);
                }
                ctl.set_cpu_switch(cpu_switch::STEP);
            }
        }
        SwitchEvent::PowerOff | SwitchEvent::WindowClosed => {
            ctl.set_power(false);
            ctl.set_cpu_switch(cpu_switch::IDLE);
            ctl.set_cpu_state(run_state::STOPPED);
            ctl.set_cpu_error(CpuError::PowerOff);
        }
        SwitchEvent::IntUp => {
            if ctl.power() {
                ctl.raise_int(-1);
            }
        }
        SwitchEvent::ResetUp => {
            if ctl.power() {
                ctl.set_reset(reset_mode::CPU_ONLY);
                ctl.raise_reset_state();
                tx.send(ev).ok();
            }
        }
        SwitchEvent::ResetDown => {
            if ctl.power() {
                ctl.set_reset(reset_mode::COLD);
                ctl.raise_reset_state();
                tx.send(ev).ok();
            }
        }
        _ => {
            tx.send(ev).ok();
        }
    }
}

impl Machine {
    /// The operator state machine: one switch event against the current
    /// latch state. Runs on the operator thread, which owns the CPU while
    /// it is stopped.
    pub fn handle_switch(&mut self, ev: SwitchEvent) {
        let ctl = std::sync::Arc::clone(self.ctl());
        let panel = std::sync::Arc::clone(self.panel());
        let powered = ctl.power();
        match ev {
            SwitchEvent::PowerOn => {
                if powered {
                    return;
                }
                ctl.set_power(true);
                panel.set_cpu_bus(CPU_WO | CPU_M1 | CPU_MEMR);
                panel.set_led_address(self.cpu.regs.pc);
                panel.set_led_data(self.mem.fp_read(self.cpu.regs.pc));
                panel.set_led_wait(true);
            }
            SwitchEvent::PowerOff | SwitchEvent::WindowClosed => {
                // Hot path already latched everything; keep this
                // idempotent for direct (non-posted) use.
                ctl.set_power(false);
                ctl.set_cpu_switch(cpu_switch::IDLE);
                ctl.set_cpu_state(run_state::STOPPED);
                ctl.set_cpu_error(CpuError::PowerOff);
            }
            SwitchEvent::Run => {
                if !powered {
                    return;
                }
                if ctl.cpu_state() != run_state::CONTIN_RUN {
                    ctl.set_cpu_state(run_state::CONTIN_RUN);
                    panel.set_led_wait(false);
                    ctl.set_cpu_switch(cpu_switch::RUN);
                }
            }
            SwitchEvent::Stop => {
                if !powered {
                    return;
                }
                ctl.set_cpu_state(run_state::STOPPED);
                panel.set_led_wait(true);
                ctl.set_cpu_switch(cpu_switch::IDLE);
            }
            SwitchEvent::Step | SwitchEvent::StepCycle => {
                if !powered || ctl.cpu_state() == run_state::CONTIN_RUN {
                    return;
                }
                if ev == SwitchEvent::StepCycle {
                    ctl.set_m1_step(true);
                }
                ctl.set_cpu_switch(cpu_switch::STEP);
            }
            SwitchEvent::ResetUp => {
                if !powered {
                    return;
                }
                ctl.set_reset(reset_mode::CPU_ONLY);
                ctl.raise_reset_state();
                self.cpu.regs.iff1 = false;
                self.cpu.regs.iff2 = false;
                ctl.set_m1_step(false);
            }
            SwitchEvent::ResetDown => {
                if !powered {
                    return;
                }
                ctl.set_reset(reset_mode::COLD);
                ctl.raise_reset_state();
                self.cpu.regs.iff1 = false;
                self.cpu.regs.iff2 = false;
                ctl.set_m1_step(false);
                self.ports.reset_all();
            }
            SwitchEvent::ResetCenter => {
                if !powered || ctl.reset() == reset_mode::NONE {
                    return;
                }
                let cold = ctl.reset() == reset_mode::COLD;
                self.cpu.reset();
                if cold && !self.cfg.hold_pc_on_cold_reset {
                    self.cpu.regs.pc = self.mem.boot_switch();
                }
                ctl.set_reset(reset_mode::NONE);
                ctl.clear_reset_state();
                let pc = self.cpu.regs.pc;
                panel.set_led_address(pc);
                panel.set_led_data(self.mem.fp_read(pc));
                panel.set_mem_wp(!self.mem.attr((pc >> 8) as u8).writable());
                panel.set_cpu_bus(CPU_WO | CPU_M1 | CPU_MEMR);
            }
            SwitchEvent::ExamineUp => {
                if self.examine_deposit_blocked() {
                    return;
                }
                let addr = ctl.address_switch();
                self.examine(addr);
            }
            SwitchEvent::ExamineDown => {
                if self.examine_deposit_blocked() {
                    return;
                }
                let addr = panel.led_address().wrapping_add(1);
                self.examine(addr);
            }
            SwitchEvent::DepositUp => {
                if self.examine_deposit_blocked() {
                    return;
                }
                let val = ctl.address_switch() as u8;
                let pc = self.cpu.regs.pc;
                if self.mem.put_operator(pc, val, &panel) {
                    panel.set_led_data(val);
                }
            }
            SwitchEvent::DepositDown => {
                if self.examine_deposit_blocked() {
                    return;
                }
                // The protection check precedes the increment, like the
                // original panel logic.
                let pc = self.cpu.regs.pc;
                if !self.mem.attr((pc >> 8) as u8).writable() {
                    panel.set_mem_wp(true);
                    return;
                }
                let pc = pc.wrapping_add(1);
                self.cpu.regs.pc = pc;
                let val = ctl.address_switch() as u8;
                panel.set_led_address(pc);
                if self.mem.put_operator(pc, val, &panel) {
                    panel.set_led_data(val);
                }
            }
            SwitchEvent::ProtectUp => {
                if !powered || ctl.cpu_state() == run_state::CONTIN_RUN {
                    return;
                }
                let page = (self.cpu.regs.pc >> 8) as u8;
                if self.mem.attr(page) == sim80_core::memory::PageAttr::Rw {
                    self.mem.set_attr(page, sim80_core::memory::PageAttr::Wprot);
                    panel.set_mem_wp(true);
                }
            }
            SwitchEvent::ProtectDown => {
                if !powered || ctl.cpu_state() == run_state::CONTIN_RUN {
                    return;
                }
                let page = (self.cpu.regs.pc >> 8) as u8;
                if self.mem.attr(page) == sim80_core::memory::PageAttr::Wprot {
                    self.mem.set_attr(page, sim80_core::memory::PageAttr::Rw);
                    panel.set_mem_wp(false);
                }
            }
            SwitchEvent::IntUp => {
                if powered {
                    ctl.raise_int(-1);
                }
            }
            SwitchEvent::IntDown => {
                if !powered {
                    return;
                }
                let boot = self.mem.boot_switch();
                self.cpu.regs.pc = boot;
                panel.set_led_address(boot);
                panel.set_led_data(self.mem.fp_read(boot));
            }
        }
    }

    fn examine_deposit_blocked(&self) -> bool {
        !self.ctl().power()
            || self.ctl().cpu_state() == run_state::CONTIN_RUN
            || self.panel().cpu_bus() & CPU_HLTA != 0
    }

    fn examine(&mut self, addr: u16) {
        self.cpu.regs.pc = addr;
        let panel = self.panel();
        panel.set_led_address(addr);
        panel.set_led_data(self.mem.fp_read(addr));
        panel.set_mem_wp(!self.mem.attr((addr >> 8) as u8).writable());
    }

    /// Refresh the LED view between CPU activities: reset override, then
    /// the PC view with the write-protect indicator and the INTA data
    /// override.
    fn refresh_leds(&self) {
        let ctl = self.ctl();
        let panel = self.panel();
        if ctl.power() {
            panel.set_led_wait(ctl.cpu_state() != run_state::CONTIN_RUN);
        }
        if ctl.reset() != reset_mode::NONE {
            panel.set_cpu_bus(0);
            panel.set_led_address(0xFFFF);
            panel.set_led_data(0xFF);
        } else if ctl.power() {
            let pc = self.cpu.regs.pc;
            panel.set_led_address(pc);
            panel.set_mem_wp(!self.mem.attr((pc >> 8) as u8).writable());
            if panel.cpu_bus() & CPU_INTA == 0 {
                panel.set_led_data(self.mem.fp_read(pc));
            } else {
                let data = ctl.int_data();
                panel.set_led_data(if data < 0 { 0xFF } else { data as u8 });
            }
        }
    }

    /// The operator loop: drain switch events, refresh the LEDs, bump the
    /// simulation clock, dispatch at most one CPU activity, sleep to the
    /// 10 ms tick. Returns when a CPU error (power-off included) ends the
    /// session; the caller owns final shutdown of the driver.
    pub fn panel_loop(&mut self, driver: &mut dyn PanelDriver, events: &Receiver<SwitchEvent>) {
        self.fp_attached = true;
        driver.framerate(self.cfg.fp_fps);
        driver.sample_switches();

        while self.ctl().cpu_error() == CpuError::None {
            while let Ok(ev) = events.try_recv() {
                self.handle_switch(ev);
            }
            self.refresh_leds();
            self.panel().tick_sim_clock();
            driver.sample_data();

            match self.ctl().cpu_switch() {
                cpu_switch::RUN => {
                    if self.ctl().reset() == reset_mode::NONE {
                        self.run();
                    }
                }
                cpu_switch::STEP => {
                    self.step();
                    if self.ctl().cpu_switch() == cpu_switch::STEP {
                        self.ctl().set_cpu_switch(cpu_switch::IDLE);
                    }
                }
                _ => {}
            }

            self.panel().tick_sim_clock();
            driver.sample_data();
            thread::sleep(Duration::from_millis(10));
        }

        // All LEDs off, give peripherals a moment, shut the renderer down.
        let panel = self.panel();
        panel.set_cpu_bus(0);
        panel.set_led_wait(false);
        panel.set_led_inten(false);
        panel.set_led_address(0);
        panel.set_led_data(0);
        self.ctl().set_bus_request(false);
        driver.sample_data();
        thread::sleep(Duration::from_millis(999));
        driver.quit();
        self.fp_attached = false;
    }
}
