//! The machine aggregate: CPU, memory fabric, port table, DMA arbiter and
//! the shared latches, plus the bus implementation that publishes status
//! and LED values at every machine cycle.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sim80_core::core::bus::{
    Bus, BusArbiter, CPU_HLTA, CPU_INP, CPU_INTA, CPU_M1, CPU_MEMR, CPU_OUT, CPU_STACK, CPU_WO,
};
use sim80_core::core::latches::{Control, CpuError, cpu_switch, run_state};
use sim80_core::core::panel::PanelState;
use sim80_core::cpu::{Cpu, Model};
use sim80_core::memory::{Memory, MemoryError};
use sim80_core::state::{Snapshot, SnapshotError};

use crate::config::Config;
use crate::io::{Ports, SensePort};

/// Front-panel input port number (sense switches).
pub const FP_PORT: u8 = 0xFF;

pub struct Machine {
    pub cpu: Cpu,
    pub mem: Arc<Memory>,
    pub ports: Ports,
    pub arbiter: BusArbiter,
    pub cfg: Config,
    ctl: Arc<Control>,
    panel: Arc<PanelState>,
    /// A panel loop is driving us: the wait-at-M1 hooks engage.
    pub(crate) fp_attached: bool,
}

impl Machine {
    pub fn new(model: Model, cfg: Config) -> Self {
        let cpu = Cpu::new(model);
        let ctl = Arc::clone(cpu.ctl());
        let panel = Arc::clone(cpu.panel());
        let mem = Arc::new(Memory::with_sections(cfg.sections.clone()));
        let mut ports = Ports::new(cfg.trap_unmapped_io);
        ports.install(FP_PORT, Box::new(SensePort::new(Arc::clone(&ctl))));
        ctl.set_address_switch(u16::from(cfg.fp_port) << 8);
        Self {
            cpu,
            mem,
            ports,
            arbiter: BusArbiter::default(),
            cfg,
            ctl,
            panel,
            fp_attached: false,
        }
    }

    pub fn ctl(&self) -> &Arc<Control> {
        &self.ctl
    }

    pub fn panel(&self) -> &Arc<PanelState> {
        &self.panel
    }

    /// Power-on initialization: memory fill/ROM load, randomized
    /// registers, active memory section.
    pub fn power_on(&mut self, fill: i32) -> Result<(), MemoryError> {
        self.mem.select_section(self.cfg.active_section)?;
        self.mem.init(fill)?;
        self.cpu.power_on_init();
        Ok(())
    }

    /// Run until the control latches stop the CPU.
    pub fn run(&mut self) {
        let Self {
            cpu,
            mem,
            ports,
            arbiter,
            ctl,
            panel,
            fp_attached,
            ..
        } = self;
        let mut bus = SysBus {
            mem: mem.as_ref(),
            ports,
            arbiter,
            ctl: ctl.as_ref(),
            panel: panel.as_ref(),
            fp_attached: *fp_attached,
        };
        cpu.run(&mut bus);
    }

    /// Execute exactly one instruction.
    pub fn step(&mut self) {
        self.with_bus(|cpu, bus| cpu.step(bus));
    }

    /// Borrow the CPU together with a live bus, for callers that drive
    /// stepping themselves (breakpoint handling, trace loops).
    pub fn with_bus<R>(&mut self, f: impl FnOnce(&mut Cpu, &mut SysBus) -> R) -> R {
        let Self {
            cpu,
            mem,
            ports,
            arbiter,
            ctl,
            panel,
            fp_attached,
            ..
        } = self;
        let mut bus = SysBus {
            mem: mem.as_ref(),
            ports,
            arbiter,
            ctl: ctl.as_ref(),
            panel: panel.as_ref(),
            fp_attached: *fp_attached,
        };
        f(cpu, &mut bus)
    }

    /// Reset the CPU; a cold reset also resets the I/O devices.
    pub fn reset(&mut self, cold: bool) {
        self.cpu.reset();
        if cold {
            self.ports.reset_all();
        }
    }

    pub fn save_snapshot(&self, path: &std::path::Path) -> Result<(), SnapshotError> {
        Snapshot::capture(&self.cpu, &self.mem).save(path)
    }

    pub fn load_snapshot(&mut self, path: &std::path::Path) -> Result<(), SnapshotError> {
        Snapshot::load(path)?.apply(&mut self.cpu, &self.mem)
    }

    /// Render the current `cpu_error` the way the operator expects to read
    /// it, or None when there is nothing to report.
    pub fn describe_error(&self) -> Option<String> {
        let pc = self.cpu.regs.pc;
        let at = |n: u16| self.mem.fp_read(pc.wrapping_sub(n));
        Some(match self.ctl.cpu_error() {
            CpuError::None => return None,
            CpuError::OpHalt => {
                format!(
                    "INT disabled and HALT Op-Code reached at {:04x}",
                    pc.wrapping_sub(1)
                )
            }
            CpuError::IoTrapIn => format!(
                "I/O input Trap at {:04x}, port {:02x}",
                pc,
                self.ctl.trap_port()
            ),
            CpuError::IoTrapOut => format!(
                "I/O output Trap at {:04x}, port {:02x}",
                pc,
                self.ctl.trap_port()
            ),
            CpuError::IoHalt => "System halted".to_string(),
            CpuError::IoError => format!("Fatal I/O Error at {pc:04x}"),
            CpuError::OpTrap1 => format!(
                "Op-code trap at {:04x} {:02x}",
                pc.wrapping_sub(1),
                at(1)
            ),
            CpuError::OpTrap2 => format!(
                "Op-code trap at {:04x} {:02x} {:02x}",
                pc.wrapping_sub(2),
                at(2),
                at(1)
            ),
            CpuError::OpTrap4 => format!(
                "Op-code trap at {:04x} {:02x} {:02x} {:02x} {:02x}",
                pc.wrapping_sub(4),
                at(4),
                at(3),
                at(2),
                at(1)
            ),
            CpuError::UserInt => format!("User Interrupt at {pc:04x}"),
            CpuError::IntError => format!(
                "Unsupported bus data during INT: {:02x}",
                self.ctl.int_data()
            ),
            CpuError::PowerOff => "System powered off".to_string(),
        })
    }

    /// Execution statistics from the most recent run.
    pub fn describe_stats(&self) -> Option<String> {
        let stats = self.cpu.stats;
        if stats.wall_us == 0 {
            return None;
        }
        Some(format!(
            "CPU ran {} ms and executed {} t-states\nClock frequency {:.2} MHz",
            stats.wall_us / 1000,
            stats.t_states,
            stats.t_states as f64 / stats.wall_us as f64
        ))
    }
}

/// The live bus view over a machine's parts. Publishes 8080-style status
/// and LED values per machine cycle and runs the single-step wait hooks.
pub struct SysBus<'a> {
    pub mem: &'a Memory,
    pub ports: &'a mut Ports,
    pub arbiter: &'a mut BusArbiter,
    pub ctl: &'a Control,
    pub panel: &'a PanelState,
    fp_attached: bool,
}

impl SysBus<'_> {
    /// Suspend inside a machine cycle while single-stepping so the
    /// operator can examine the bus. Leaves when the panel moves
    /// `cpu_switch` out of the wait state or a reset is thrown.
    fn wait_step(&mut self) {
        if !self.fp_attached {
            return;
        }
        if self.ctl.cpu_state() != run_state::SINGLE_STEP {
            self.panel.clear_cpu_bus(CPU_M1);
            self.ctl.set_m1_step(false);
            return;
        }
        // The first M1 of a step runs free unless cycle-stepping was
        // requested; later cycles of the instruction wait here.
        if self.panel.cpu_bus() & CPU_M1 != 0 && !self.ctl.m1_step() {
            self.panel.clear_cpu_bus(CPU_M1);
            return;
        }
        self.ctl.set_cpu_switch(cpu_switch::WAIT_AT_M1);
        while self.ctl.cpu_switch() == cpu_switch::WAIT_AT_M1 && self.ctl.reset() == 0 {
            // While waiting on an input cycle, keep the data LEDs live.
            if self.panel.cpu_bus() == CPU_WO | CPU_INP {
                let port = self.panel.led_address() as u8;
                if let Some(v) = self.ports.read(port) {
                    self.panel.set_led_data(v);
                }
            }
            self.panel.tick_sim_clock();
            thread::sleep(Duration::from_millis(1));
        }
        self.panel.clear_cpu_bus(CPU_M1);
        self.ctl.set_m1_step(false);
    }

    fn show_cycle(&self, status: u8, addr: u16, data: u8) {
        self.panel.set_cpu_bus(status);
        self.panel.set_led_address(addr);
        self.panel.set_led_data(data);
    }
}

impl Bus for SysBus<'_> {
    fn fetch(&mut self, addr: u16) -> u8 {
        let v = self.mem.get(addr);
        self.show_cycle(CPU_WO | CPU_M1 | CPU_MEMR, addr, v);
        self.wait_step();
        v
    }

    fn mem_read(&mut self, addr: u16) -> u8 {
        let v = self.mem.get(addr);
        self.show_cycle(CPU_WO | CPU_MEMR, addr, v);
        self.wait_step();
        v
    }

    fn mem_write(&mut self, addr: u16, val: u8) {
        self.mem.put(addr, val);
        self.show_cycle(0, addr, val);
        self.wait_step();
    }

    fn stack_read(&mut self, addr: u16) -> u8 {
        let v = self.mem.get(addr);
        self.show_cycle(CPU_WO | CPU_MEMR | CPU_STACK, addr, v);
        self.wait_step();
        v
    }

    fn stack_write(&mut self, addr: u16, val: u8) {
        self.mem.put(addr, val);
        self.show_cycle(CPU_STACK, addr, val);
        self.wait_step();
    }

    fn io_read(&mut self, port: u8) -> u8 {
        let v = match self.ports.read(port) {
            Some(v) => v,
            None if self.ports.trap_unmapped => {
                self.ctl.set_trap_port(port);
                self.ctl.set_cpu_error(CpuError::IoTrapIn);
                self.ctl.set_cpu_state(run_state::STOPPED);
                0
            }
            None => 0xFF,
        };
        let addr = (u16::from(port) << 8) | u16::from(port);
        self.show_cycle(CPU_WO | CPU_INP, addr, v);
        self.wait_step();
        v
    }

    fn io_write(&mut self, port: u8, val: u8) {
        if !self.ports.write(port, val) && self.ports.trap_unmapped {
            self.ctl.set_trap_port(port);
            self.ctl.set_cpu_error(CpuError::IoTrapOut);
            self.ctl.set_cpu_state(run_state::STOPPED);
        }
        let addr = (u16::from(port) << 8) | u16::from(port);
        self.show_cycle(CPU_OUT, addr, val);
        self.wait_step();
    }

    fn int_ack(&mut self) -> i16 {
        let data = self.ctl.int_data();
        let shown = if data < 0 { 0xFF } else { data as u8 };
        self.panel.set_cpu_bus(CPU_INTA | CPU_WO | CPU_M1);
        self.panel.set_led_data(shown);
        data
    }

    fn bus_ack(&mut self) -> u64 {
        self.arbiter.grant(self.ctl)
    }

    fn wait_int_step(&mut self) {
        if !self.fp_attached || self.ctl.cpu_state() != run_state::SINGLE_STEP {
            return;
        }
        self.ctl.set_cpu_switch(cpu_switch::WAIT_AT_M1);
        while self.ctl.cpu_switch() == cpu_switch::WAIT_AT_M1 && self.ctl.reset() == 0 {
            self.panel.tick_sim_clock();
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn set_halted(&mut self, halted: bool) {
        if halted {
            self.panel.or_cpu_bus(CPU_HLTA);
        } else {
            self.panel.clear_cpu_bus(CPU_HLTA);
        }
    }
}
