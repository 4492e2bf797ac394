//! Front-panel LED state.
//!
//! The renderer's refresh path samples these atomics directly; that is the
//! accessor-based replacement for the original bind-a-pointer contract.
//! Reads are relaxed — brief tearing between address and data LEDs is
//! visible for one frame at most and matches real panel behavior.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, AtomicU64, Ordering};

#[derive(Default)]
pub struct PanelState {
    /// Bus status byte (M1/MEMR/INP/OUT/HLTA/STACK/WO/INTA).
    cpu_bus: AtomicU8,
    led_address: AtomicU16,
    led_data: AtomicU8,
    led_wait: AtomicBool,
    led_inten: AtomicBool,
    /// Write-protect indicator: the page under PC is RO/WPROT, or a deposit
    /// was refused.
    mem_wp: AtomicBool,
    /// Simulation clock, bumped by the panel loop for display interpolation.
    sim_clock: AtomicU64,
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cpu_bus(&self) -> u8 {
        self.cpu_bus.load(Ordering::Relaxed)
    }
    pub fn set_cpu_bus(&self, v: u8) {
        self.cpu_bus.store(v, Ordering::Relaxed);
    }
    pub fn or_cpu_bus(&self, bits: u8) {
        self.cpu_bus.fetch_or(bits, Ordering::Relaxed);
    }
    pub fn clear_cpu_bus(&self, bits: u8) {
        self.cpu_bus.fetch_and(!bits, Ordering::Relaxed);
    }

    pub fn led_address(&self) -> u16 {
        self.led_address.load(Ordering::Relaxed)
    }
    pub fn set_led_address(&self, v: u16) {
        self.led_address.store(v, Ordering::Relaxed);
    }

    pub fn led_data(&self) -> u8 {
        self.led_data.load(Ordering::Relaxed)
    }
    pub fn set_led_data(&self, v: u8) {
        self.led_data.store(v, Ordering::Relaxed);
    }

    pub fn led_wait(&self) -> bool {
        self.led_wait.load(Ordering::Relaxed)
    }
    pub fn set_led_wait(&self, v: bool) {
        self.led_wait.store(v, Ordering::Relaxed);
    }

    pub fn led_inten(&self) -> bool {
        self.led_inten.load(Ordering::Relaxed)
    }
    pub fn set_led_inten(&self, v: bool) {
        self.led_inten.store(v, Ordering::Relaxed);
    }

    pub fn mem_wp(&self) -> bool {
        self.mem_wp.load(Ordering::Relaxed)
    }
    pub fn set_mem_wp(&self, v: bool) {
        self.mem_wp.store(v, Ordering::Relaxed);
    }

    pub fn sim_clock(&self) -> u64 {
        self.sim_clock.load(Ordering::Relaxed)
    }
    pub fn tick_sim_clock(&self) {
        self.sim_clock.fetch_add(1, Ordering::Relaxed);
    }
}
