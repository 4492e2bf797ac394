//! `system.conf` parsing.
//!
//! Line-oriented, `#` comments, whitespace/comma separated tokens. Memory
//! layout comes in `[MEMORY n]` sections of `ram`/`rom`/`boot` lines with
//! page-granular addressing. Invalid values are warned about and skipped;
//! only a missing ROM image is fatal, and that surfaces later when the
//! memory fabric loads it.

use std::path::{Path, PathBuf};

use log::warn;

use sim80_core::memory::{MAXMEMMAP, MAXMEMSECT, MemSection, MemSegment, PageAttr};

#[derive(Clone, Copy, Debug)]
pub struct SioConfig {
    pub upper_case: bool,
    pub strip_parity: bool,
    pub drop_nulls: bool,
    pub baud_rate: u32,
}

impl Default for SioConfig {
    fn default() -> Self {
        Self {
            upper_case: false,
            strip_parity: false,
            drop_nulls: false,
            baud_rate: 9600,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Serial channels 0..2 for the terminal collaborators.
    pub sio: [SioConfig; 3],
    pub sio0_revision: u8,
    pub sio3_baud_rate: u32,
    /// Initial front-panel input port value.
    pub fp_port: u8,
    pub fp_fps: f32,
    pub fp_size: u32,
    pub vdm_bg: [u8; 3],
    pub vdm_fg: [u8; 3],
    pub vdm_scanlines: bool,
    /// Banked memory sections; empty means 64 KiB flat RAM.
    pub sections: Vec<MemSection>,
    /// Unmapped I/O raises IOTRAPIN/IOTRAPOUT instead of floating high.
    pub trap_unmapped_io: bool,
    /// Keep PC across a cold reset instead of loading the boot switch.
    pub hold_pc_on_cold_reset: bool,
    /// Memory section selected at startup.
    pub active_section: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sio: [SioConfig::default(); 3],
            sio0_revision: 0,
            sio3_baud_rate: 9600,
            fp_port: 0,
            fp_fps: 30.0,
            fp_size: 800,
            vdm_bg: [0x00, 0x00, 0x00],
            vdm_fg: [0x00, 0xFF, 0x00],
            vdm_scanlines: false,
            sections: Vec::new(),
            trap_unmapped_io: true,
            hold_pc_on_cold_reset: false,
            active_section: 0,
        }
    }
}

impl Config {
    /// Parse a configuration file; a missing file yields the defaults.
    pub fn parse(path: &Path) -> Self {
        let mut cfg = Config::default();
        let Ok(text) = std::fs::read_to_string(path) else {
            return cfg;
        };
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut section = 0usize;
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tok = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|s| !s.is_empty());
            let Some(key) = tok.next() else { continue };
            match key {
                "sio0_upper_case" => set_bool(&mut cfg.sio[0].upper_case, key, tok.next()),
                "sio1_upper_case" => set_bool(&mut cfg.sio[1].upper_case, key, tok.next()),
                "sio2_upper_case" => set_bool(&mut cfg.sio[2].upper_case, key, tok.next()),
                "sio0_strip_parity" => set_bool(&mut cfg.sio[0].strip_parity, key, tok.next()),
                "sio1_strip_parity" => set_bool(&mut cfg.sio[1].strip_parity, key, tok.next()),
                "sio2_strip_parity" => set_bool(&mut cfg.sio[2].strip_parity, key, tok.next()),
                "sio0_drop_nulls" => set_bool(&mut cfg.sio[0].drop_nulls, key, tok.next()),
                "sio1_drop_nulls" => set_bool(&mut cfg.sio[1].drop_nulls, key, tok.next()),
                "sio2_drop_nulls" => set_bool(&mut cfg.sio[2].drop_nulls, key, tok.next()),
                "sio0_revision" => match tok.next() {
                    Some("0") => cfg.sio0_revision = 0,
                    Some("1") => cfg.sio0_revision = 1,
                    v => warn_value(key, v),
                },
                "sio0_baud_rate" => set_u32(&mut cfg.sio[0].baud_rate, key, tok.next()),
                "sio1_baud_rate" => set_u32(&mut cfg.sio[1].baud_rate, key, tok.next()),
                "sio2_baud_rate" => set_u32(&mut cfg.sio[2].baud_rate, key, tok.next()),
                "sio3_baud_rate" => set_u32(&mut cfg.sio3_baud_rate, key, tok.next()),
                "fp_port" => match tok.next().and_then(|v| u8::from_str_radix(v, 16).ok()) {
                    Some(v) => cfg.fp_port = v,
                    None => warn_value(key, None),
                },
                "fp_fps" => match tok.next().and_then(|v| v.parse::<f32>().ok()) {
                    Some(v) if v > 0.0 => cfg.fp_fps = v,
                    v => warn_value(key, v.map(|_| "out of range")),
                },
                "fp_size" => set_u32(&mut cfg.fp_size, key, tok.next()),
                "vdm_bg" => set_rgb(&mut cfg.vdm_bg, key, tok.next()),
                "vdm_fg" => set_rgb(&mut cfg.vdm_fg, key, tok.next()),
                "vdm_scanlines" => cfg.vdm_scanlines = tok.next() != Some("0"),
                "[MEMORY" => match parse_section_header(tok.next()) {
                    Some(n) => {
                        section = n - 1;
                        while cfg.sections.len() <= section {
                            cfg.sections.push(MemSection::default());
                        }
                        cfg.sections[section].segments.clear();
                    }
                    None => warn!("system.conf: invalid MEMORY section header: {line}"),
                },
                "ram" | "rom" => {
                    let attr = if key == "ram" { PageAttr::Rw } else { PageAttr::Ro };
                    if cfg.sections.is_empty() {
                        cfg.sections.push(MemSection::default());
                    }
                    let idx = section.min(cfg.sections.len() - 1);
                    let segs = &mut cfg.sections[idx].segments;
                    if segs.len() >= MAXMEMMAP {
                        warn!("system.conf: too many ram/rom statements");
                        continue;
                    }
                    let start = tok.next().and_then(parse_int);
                    let size = tok.next().and_then(parse_int);
                    match (start, size) {
                        (Some(start), Some(size))
                            if start <= 255 && size >= 1 && start + size <= 256 =>
                        {
                            let rom_file = (attr == PageAttr::Ro)
                                .then(|| tok.next())
                                .flatten()
                                .map(|f| resolve(&base, f));
                            segs.push(MemSegment {
                                attr,
                                start_page: start as u8,
                                pages: size as u16,
                                rom_file,
                            });
                        }
                        _ => warn!("system.conf: invalid {key} statement: {line}"),
                    }
                }
                "boot" => {
                    if cfg.sections.is_empty() {
                        cfg.sections.push(MemSection::default());
                    }
                    match tok.next().and_then(parse_int) {
                        Some(addr) if addr <= 0xFFFF => {
                            let idx = section.min(cfg.sections.len() - 1);
                            cfg.sections[idx].boot_switch = addr as u16;
                        }
                        _ => warn!("system.conf: invalid boot address: {line}"),
                    }
                }
                "io_trap" => set_bool(&mut cfg.trap_unmapped_io, key, tok.next()),
                _ => warn!("system.conf: unknown command: {line}"),
            }
        }
        if cfg.sections.len() > MAXMEMSECT {
            warn!(
                "system.conf: more than {MAXMEMSECT} memory sections, extra ones ignored"
            );
            cfg.sections.truncate(MAXMEMSECT);
        }
        cfg
    }
}

/// "n]" from a `[MEMORY n]` header, 1-based and bounded.
fn parse_section_header(tok: Option<&str>) -> Option<usize> {
    let digits = tok?.strip_suffix(']')?;
    let n: usize = digits.parse().ok()?;
    (1..=MAXMEMSECT).contains(&n).then_some(n)
}

/// Accept decimal or 0x-prefixed hex, like strtol with base 0.
fn parse_int(tok: &str) -> Option<usize> {
    if let Some(hex) = tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).ok()
    } else {
        tok.parse().ok()
    }
}

fn resolve(base: &Path, file: &str) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

fn set_bool(dst: &mut bool, key: &str, val: Option<&str>) {
    match val {
        Some("0") => *dst = false,
        Some("1") => *dst = true,
        v => warn_value(key, v),
    }
}

fn set_u32(dst: &mut u32, key: &str, val: Option<&str>) {
    match val.and_then(|v| v.parse().ok()) {
        Some(v) => *dst = v,
        None => warn_value(key, val),
    }
}

fn set_rgb(dst: &mut [u8; 3], key: &str, val: Option<&str>) {
    let parsed = val.filter(|v| v.len() == 6).and_then(|v| {
        let r = u8::from_str_radix(&v[0..2], 16).ok()?;
        let g = u8::from_str_radix(&v[2..4], 16).ok()?;
        let b = u8::from_str_radix(&v[4..6], 16).ok()?;
        Some([r, g, b])
    });
    match parsed {
        Some(rgb) => *dst = rgb,
        None => warn_value(key, val),
    }
}

fn warn_value(key: &str, val: Option<&str>) {
    warn!(
        "system.conf: invalid value for {key}: {}",
        val.unwrap_or("(missing)")
    );
}
