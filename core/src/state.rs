//! Machine snapshots: save the full register file, clock and memory to
//! JSON and restore them byte-identically.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpu::{Cpu, Model, Registers};
use crate::memory::Memory;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("snapshot format: {0}")]
    Format(#[from] serde_json::Error),
    #[error("snapshot memory image has wrong size")]
    BadImage,
}

#[derive(Serialize, Deserialize)]
pub struct Snapshot {
    pub model: Model,
    pub regs: Registers,
    pub t: u64,
    pub memory: Vec<u8>,
    pub page_attrs: Vec<u8>,
}

impl Snapshot {
    pub fn capture(cpu: &Cpu, mem: &Memory) -> Self {
        Self {
            model: cpu.model,
            regs: cpu.regs.clone(),
            t: cpu.t,
            memory: mem.dump(),
            page_attrs: mem.dump_attrs(),
        }
    }

    pub fn apply(&self, cpu: &mut Cpu, mem: &Memory) -> Result<(), SnapshotError> {
        if self.memory.len() != crate::memory::MEMSIZE
            || self.page_attrs.len() != crate::memory::PAGES
        {
            return Err(SnapshotError::BadImage);
        }
        cpu.model = self.model;
        cpu.regs = self.regs.clone();
        cpu.t = self.t;
        mem.restore(&self.memory, &self.page_attrs);
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}
