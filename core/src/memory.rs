//! The memory fabric: a page-addressed 64 KiB space with per-page
//! attributes, optional banked memory sections and file loading.
//!
//! Bytes and attributes are atomics so the video refresh path can
//! `dma_read` and the operator thread can deposit while the CPU runs;
//! per-byte atomicity is all that is promised (torn words are fine).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::panel::PanelState;

pub const MEMSIZE: usize = 0x1_0000;
pub const PAGES: usize = 256;
/// Selectable memory sections for machines with banked ROM.
pub const MAXMEMSECT: usize = 4;
/// RAM/ROM segments per section.
pub const MAXMEMMAP: usize = 6;

/// Per-page attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PageAttr {
    /// Read/write RAM.
    #[default]
    Rw = 0,
    /// ROM: reads only, writes dropped.
    Ro = 1,
    /// Operator-protected RAM.
    Wprot = 2,
    /// Nothing decodes here; reads float to 0xFF.
    None = 3,
}

impl PageAttr {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Rw,
            1 => Self::Ro,
            2 => Self::Wprot,
            _ => Self::None,
        }
    }

    pub fn writable(self) -> bool {
        self == Self::Rw
    }
}

/// One RAM or ROM segment of a memory section, in pages.
#[derive(Clone, Debug)]
pub struct MemSegment {
    pub attr: PageAttr,
    pub start_page: u8,
    pub pages: u16,
    /// Backing image for ROM segments, already resolved to a full path.
    pub rom_file: Option<PathBuf>,
}

/// A selectable memory configuration with its own boot-switch address.
#[derive(Clone, Debug, Default)]
pub struct MemSection {
    pub segments: Vec<MemSegment>,
    pub boot_switch: u16,
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("no such memory section {0}")]
    NoSuchSection(usize),
    #[error("file exceeds memory bounds")]
    LoadTooBig,
    #[error("invalid Intel hex record at line {line}")]
    BadHexRecord { line: usize },
    #[error("hex record checksum mismatch at line {line}")]
    HexChecksum { line: usize },
    #[error("ROM image {path}: {source}")]
    RomLoad {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct Memory {
    bytes: Box<[AtomicU8]>,
    attrs: Box<[AtomicU8]>,
    sections: Vec<MemSection>,
    active: AtomicUsize,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Flat 64 KiB of RAM, no sections configured.
    pub fn new() -> Self {
        Self::with_sections(Vec::new())
    }

    pub fn with_sections(sections: Vec<MemSection>) -> Self {
        let bytes = (0..MEMSIZE).map(|_| AtomicU8::new(0)).collect();
        let attrs = (0..PAGES)
            .map(|_| AtomicU8::new(PageAttr::Rw as u8))
            .collect();
        Self {
            bytes,
            attrs,
            sections,
            active: AtomicUsize::new(0),
        }
    }

    pub fn attr(&self, page: u8) -> PageAttr {
        PageAttr::from_u8(self.attrs[page as usize].load(Ordering::Relaxed))
    }

    pub fn set_attr(&self, page: u8, attr: PageAttr) {
        self.attrs[page as usize].store(attr as u8, Ordering::Relaxed);
    }

    fn page_of(addr: u16) -> u8 {
        (addr >> 8) as u8
    }

    /// CPU read.
    pub fn get(&self, addr: u16) -> u8 {
        match self.attr(Self::page_of(addr)) {
            PageAttr::None => 0xFF,
            _ => self.bytes[addr as usize].load(Ordering::Relaxed),
        }
    }

    /// CPU write; silently dropped on non-writable pages.
    pub fn put(&self, addr: u16, val: u8) {
        if self.attr(Self::page_of(addr)).writable() {
            self.bytes[addr as usize].store(val, Ordering::Relaxed);
        }
    }

    /// Operator deposit path: a refused write raises the write-protect
    /// indicator instead of vanishing without trace.
    pub fn put_operator(&self, addr: u16, val: u8, panel: &PanelState) -> bool {
        if self.attr(Self::page_of(addr)).writable() {
            self.bytes[addr as usize].store(val, Ordering::Relaxed);
            panel.set_mem_wp(false);
            true
        } else {
            panel.set_mem_wp(true);
            false
        }
    }

    /// DMA master read; same float-to-0xFF rule as CPU reads.
    pub fn dma_read(&self, addr: u16) -> u8 {
        self.get(addr)
    }

    /// DMA master write; page attributes apply to masters too.
    pub fn dma_write(&self, addr: u16, val: u8) {
        self.put(addr, val);
    }

    /// Front-panel LED read: no bus status side effects anywhere.
    pub fn fp_read(&self, addr: u16) -> u8 {
        self.get(addr)
    }

    /// Raw access bypassing page attributes (loaders, snapshots).
    pub fn poke(&self, addr: u16, val: u8) {
        self.bytes[addr as usize].store(val, Ordering::Relaxed);
    }

    pub fn peek(&self, addr: u16) -> u8 {
        self.bytes[addr as usize].load(Ordering::Relaxed)
    }

    pub fn sections(&self) -> &[MemSection] {
        &self.sections
    }

    pub fn active_section(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Boot-switch address of the active section (0 when unconfigured).
    pub fn boot_switch(&self) -> u16 {
        self.sections
            .get(self.active_section())
            .map_or(0, |s| s.boot_switch)
    }

    /// Initialize memory contents: fill with `fill` when non-negative,
    /// otherwise with a pseudo-random pattern, then apply the active
    /// section's layout and ROM images.
    pub fn init(&self, fill: i32) -> Result<(), MemoryError> {
        use rand::Rng;
        if fill >= 0 {
            let v = fill as u8;
            for b in self.bytes.iter() {
                b.store(v, Ordering::Relaxed);
            }
        } else {
            let mut rng = rand::thread_rng();
            for b in self.bytes.iter() {
                b.store(rng.r#gen(), Ordering::Relaxed);
            }
        }
        self.apply_active_section()
    }

    /// Select a memory section and apply its page layout.
    pub fn select_section(&self, index: usize) -> Result<(), MemoryError> {
        if !self.sections.is_empty() && index >= self.sections.len() {
            return Err(MemoryError::NoSuchSection(index));
        }
        self.active.store(index, Ordering::Relaxed);
        self.apply_active_section()
    }

    /// Set page attributes from the active section and (re)load its ROM
    /// images. With no sections configured the whole space stays RW.
    fn apply_active_section(&self) -> Result<(), MemoryError> {
        let Some(section) = self.sections.get(self.active_section()) else {
            for a in self.attrs.iter() {
                a.store(PageAttr::Rw as u8, Ordering::Relaxed);
            }
            return Ok(());
        };
        for a in self.attrs.iter() {
            a.store(PageAttr::None as u8, Ordering::Relaxed);
        }
        for seg in &section.segments {
            let first = seg.start_page as usize;
            let last = (first + seg.pages as usize).min(PAGES);
            for page in first..last {
                self.attrs[page].store(seg.attr as u8, Ordering::Relaxed);
            }
            debug!(
                "{} {:04X}H - {:04X}H{}",
                if seg.attr == PageAttr::Ro { "ROM" } else { "RAM" },
                first << 8,
                (last << 8) - 1,
                seg.rom_file
                    .as_deref()
                    .map(|p| format!(" {}", p.display()))
                    .unwrap_or_default()
            );
            if seg.attr == PageAttr::Ro {
                // Unloaded ROM floats high.
                for addr in (first << 8)..(last << 8) {
                    self.bytes[addr].store(0xFF, Ordering::Relaxed);
                }
                if let Some(path) = &seg.rom_file {
                    let limit = (last << 8) - (first << 8);
                    self.load_rom(path, (first << 8) as u16, limit)?;
                }
            }
        }
        Ok(())
    }

    fn load_rom(&self, path: &Path, addr: u16, limit: usize) -> Result<(), MemoryError> {
        let data = std::fs::read(path).map_err(|source| MemoryError::RomLoad {
            path: path.display().to_string(),
            source,
        })?;
        for (i, &b) in data.iter().take(limit).enumerate() {
            self.poke(addr.wrapping_add(i as u16), b);
        }
        Ok(())
    }

    /// Load a program image. Intel hex is detected by a leading ':';
    /// anything else is raw binary placed at `addr`. Returns the number of
    /// bytes stored.
    pub fn load_file(
        &self,
        path: &Path,
        addr: u16,
        maxlen: Option<usize>,
    ) -> Result<usize, MemoryError> {
        let data = std::fs::read(path)?;
        if data.first() == Some(&b':') {
            self.load_intel_hex(&data)
        } else {
            let limit = maxlen.unwrap_or(usize::MAX);
            if data.len().min(limit) > MEMSIZE - addr as usize {
                return Err(MemoryError::LoadTooBig);
            }
            let n = data.len().min(limit);
            for (i, &b) in data[..n].iter().enumerate() {
                self.poke(addr + i as u16, b);
            }
            Ok(n)
        }
    }

    fn load_intel_hex(&self, data: &[u8]) -> Result<usize, MemoryError> {
        let text = String::from_utf8_lossy(data);
        let mut loaded = 0usize;
        for (idx, raw) in text.lines().enumerate() {
            let rec = raw.trim();
            if rec.is_empty() {
                continue;
            }
            let line = idx + 1;
            let bytes = parse_hex_record(rec).ok_or(MemoryError::BadHexRecord { line })?;
            if bytes.len() < 5 {
                return Err(MemoryError::BadHexRecord { line });
            }
            let sum: u8 = bytes.iter().fold(0u8, |a, &b| a.wrapping_add(b));
            if sum != 0 {
                return Err(MemoryError::HexChecksum { line });
            }
            let count = bytes[0] as usize;
            let addr = u16::from_be_bytes([bytes[1], bytes[2]]);
            let rectype = bytes[3];
            if bytes.len() != count + 5 {
                return Err(MemoryError::BadHexRecord { line });
            }
            match rectype {
                0x00 => {
                    for (i, &b) in bytes[4..4 + count].iter().enumerate() {
                        self.poke(addr.wrapping_add(i as u16), b);
                    }
                    loaded += count;
                }
                0x01 => break,
                // Extended-address records are beyond a 64K target.
                _ => return Err(MemoryError::BadHexRecord { line }),
            }
        }
        Ok(loaded)
    }

    /// Full contents, for snapshots.
    pub fn dump(&self) -> Vec<u8> {
        self.bytes
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect()
    }

    pub fn dump_attrs(&self) -> Vec<u8> {
        self.attrs
            .iter()
            .map(|a| a.load(Ordering::Relaxed))
            .collect()
    }

    /// Restore contents and attributes from a snapshot.
    pub fn restore(&self, bytes: &[u8], attrs: &[u8]) {
        for (cell, &b) in self.bytes.iter().zip(bytes) {
            cell.store(b, Ordering::Relaxed);
        }
        for (cell, &a) in self.attrs.iter().zip(attrs) {
            cell.store(a, Ordering::Relaxed);
        }
    }
}

fn parse_hex_record(line: &str) -> Option<Vec<u8>> {
    let hex = line.strip_prefix(':')?;
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_protect_drops_writes() {
        let mem = Memory::new();
        mem.put(0x8000, 0x11);
        mem.set_attr(0x80, PageAttr::Wprot);
        mem.put(0x8000, 0xAA);
        assert_eq!(mem.get(0x8000), 0x11);
        mem.set_attr(0x80, PageAttr::Ro);
        mem.put(0x8000, 0xAA);
        assert_eq!(mem.get(0x8000), 0x11);
        mem.set_attr(0x80, PageAttr::Rw);
        mem.put(0x8000, 0xAA);
        assert_eq!(mem.get(0x8000), 0xAA);
    }

    #[test]
    fn nonexistent_pages_float_high() {
        let mem = Memory::new();
        mem.put(0x4000, 0x55);
        mem.set_attr(0x40, PageAttr::None);
        assert_eq!(mem.get(0x4000), 0xFF);
        mem.set_attr(0x40, PageAttr::Rw);
        assert_eq!(mem.get(0x4000), 0x55);
    }

    #[test]
    fn fill_init() {
        let mem = Memory::new();
        mem.init(0x5A).unwrap();
        assert_eq!(mem.get(0x0000), 0x5A);
        assert_eq!(mem.get(0xFFFF), 0x5A);
    }

    #[test]
    fn hex_record_parse() {
        let rec = parse_hex_record(":0300300002337A1E").unwrap();
        assert_eq!(rec[0], 3);
        assert_eq!(u16::from_be_bytes([rec[1], rec[2]]), 0x0030);
        let sum: u8 = rec.iter().fold(0u8, |a, &b| a.wrapping_add(b));
        assert_eq!(sum, 0);
    }
}
