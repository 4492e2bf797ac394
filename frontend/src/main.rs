//! sim80 — Z80/8080 system simulator with an ICE-style debugging shell.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::warn;

use sim80_core::cpu::{Model, Throttle};
use sim80_machines::{Config, Machine};

mod ice;
mod term;

#[derive(Parser)]
#[command(name = "sim80", version, about = "Z80/8080 system simulator")]
struct Args {
    /// Alternate configuration file
    #[arg(short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Load a program image (binary or Intel hex) and set PC to 0
    #[arg(short = 'x', value_name = "FILE")]
    program: Option<PathBuf>,

    /// Memory fill byte; negative fills with a random pattern
    #[arg(short = 'm', value_name = "BYTE", default_value_t = -1, allow_hyphen_values = true)]
    fill: i32,

    /// CPU frequency cap in MHz (0 = unthrottled)
    #[arg(short = 'f', value_name = "MHZ", default_value_t = 0.0)]
    mhz: f64,

    /// Execute undocumented opcodes instead of trapping them
    #[arg(short = 'u')]
    undoc: bool,

    /// Save a machine snapshot to FILE on exit
    #[arg(short = 's', value_name = "FILE")]
    save: Option<PathBuf>,

    /// Load a machine snapshot from FILE at startup
    #[arg(short = 'l', value_name = "FILE")]
    load: Option<PathBuf>,

    /// Select the memory section configured as [MEMORY n]
    #[arg(short = 'M', value_name = "N", default_value_t = 1)]
    section: usize,

    /// Keep PC across a cold reset instead of loading the boot switch
    #[arg(short = 'R')]
    hold_pc: bool,

    /// Emulate an Intel 8080 instead of a Z80
    #[arg(long)]
    i8080: bool,

    /// Run the loaded program to completion instead of entering the shell
    #[arg(long)]
    run: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    match run_main() {
        Ok(errors) if errors == 0 => ExitCode::SUCCESS,
        Ok(errors) => ExitCode::from(errors.min(255) as u8),
        Err(e) => {
            eprintln!("sim80: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_main() -> anyhow::Result<u32> {
    let args = Args::parse();
    let mut errors = 0u32;

    let conf_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut cfg = Config::parse(&conf_path);
    cfg.hold_pc_on_cold_reset |= args.hold_pc;
    if args.section >= 1 {
        cfg.active_section = args.section - 1;
    }

    let model = if args.i8080 { Model::I8080 } else { Model::Z80 };
    let mut m = Machine::new(model, cfg);
    m.cpu.undoc_allowed = args.undoc;
    m.cpu.history_enabled = true;
    if args.mhz > 0.0 {
        m.cpu.throttle = Some(Throttle::new(args.mhz));
    }

    // A ROM image that fails to load is the one fatal configuration
    // problem; everything else was warned about and skipped.
    m.power_on(args.fill)
        .with_context(|| format!("memory initialization ({})", conf_path.display()))?;

    if let Some(snap) = &args.load {
        if let Err(e) = m.load_snapshot(snap) {
            warn!("snapshot {}: {e}", snap.display());
            errors += 1;
        }
    }

    if let Some(program) = &args.program {
        let n = m
            .mem
            .load_file(program, 0, None)
            .with_context(|| format!("loading {}", program.display()))?;
        m.cpu.regs.pc = 0;
        println!("Loader statistics for file {}: {n} bytes", program.display());
    }

    println!(
        "sim80 {} — {} simulation",
        env!("CARGO_PKG_VERSION"),
        if args.i8080 { "8080" } else { "Z80" }
    );

    if args.run {
        m.run();
        if let Some(msg) = m.describe_error() {
            println!("\n{msg}");
        }
        if let Some(stats) = m.describe_stats() {
            println!("{stats}");
        }
    } else {
        ice::Ice::new(&mut m).cmd_loop(false);
    }

    if let Some(snap) = &args.save {
        if let Err(e) = m.save_snapshot(snap) {
            warn!("snapshot {}: {e}", snap.display());
            errors += 1;
        }
    }

    Ok(errors)
}

/// `-c` wins; otherwise a per-user config, then `./system.conf`.
fn default_config_path() -> PathBuf {
    if let Some(dir) = dirs::config_dir() {
        let p = dir.join("sim80").join("system.conf");
        if p.exists() {
            return p;
        }
    }
    PathBuf::from("system.conf")
}
