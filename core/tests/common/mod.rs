#![allow(dead_code)]

use sim80_core::core::bus::Bus;
use sim80_core::cpu::Cpu;
use sim80_core::memory::Memory;

/// Minimal bus for testing: the memory fabric plus latched I/O ports, no
/// panel hooks.
pub struct TestBus {
    pub mem: Memory,
    pub ports_in: [u8; 256],
    pub ports_out: [u8; 256],
    /// Byte driven onto the bus during INTA (-1 floats).
    pub int_vector: i16,
}

impl Default for TestBus {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            mem: Memory::new(),
            ports_in: [0; 256],
            ports_out: [0; 256],
            int_vector: -1,
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        for (i, &b) in data.iter().enumerate() {
            self.mem.poke(addr.wrapping_add(i as u16), b);
        }
    }
}

impl Bus for TestBus {
    fn fetch(&mut self, addr: u16) -> u8 {
        self.mem.get(addr)
    }

    fn mem_read(&mut self, addr: u16) -> u8 {
        self.mem.get(addr)
    }

    fn mem_write(&mut self, addr: u16, val: u8) {
        self.mem.put(addr, val);
    }

    fn io_read(&mut self, port: u8) -> u8 {
        self.ports_in[port as usize]
    }

    fn io_write(&mut self, port: u8, val: u8) {
        self.ports_out[port as usize] = val;
    }

    fn int_ack(&mut self) -> i16 {
        self.int_vector
    }
}

/// Step one instruction and return the T-states it consumed.
pub fn step_t(cpu: &mut Cpu, bus: &mut TestBus) -> u32 {
    let t0 = cpu.t;
    cpu.step(bus);
    (cpu.t - t0) as u32
}
