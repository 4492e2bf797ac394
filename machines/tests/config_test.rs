use std::io::Write;

use sim80_core::memory::PageAttr;
use sim80_machines::Config;

fn parse(text: &str) -> Config {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(text.as_bytes()).unwrap();
    Config::parse(f.path())
}

#[test]
fn missing_file_yields_defaults() {
    let cfg = Config::parse(std::path::Path::new("/nonexistent/system.conf"));
    assert!(cfg.sections.is_empty());
    assert_eq!(cfg.fp_fps, 30.0);
}

#[test]
fn sio_and_panel_keys() {
    let cfg = parse(
        "# serial setup\n\
         sio0_upper_case 1\n\
         sio0_strip_parity 0\n\
         sio1_drop_nulls 1\n\
         sio0_revision 1\n\
         sio0_baud_rate 110\n\
         sio3_baud_rate 1200\n\
         fp_port a5\n\
         fp_fps 60\n\
         fp_size 1024\n\
         vdm_bg 303030\n\
         vdm_fg e0e0e0\n\
         vdm_scanlines 1\n",
    );
    assert!(cfg.sio[0].upper_case);
    assert!(!cfg.sio[0].strip_parity);
    assert!(cfg.sio[1].drop_nulls);
    assert_eq!(cfg.sio0_revision, 1);
    assert_eq!(cfg.sio[0].baud_rate, 110);
    assert_eq!(cfg.sio3_baud_rate, 1200);
    assert_eq!(cfg.fp_port, 0xA5);
    assert_eq!(cfg.fp_fps, 60.0);
    assert_eq!(cfg.fp_size, 1024);
    assert_eq!(cfg.vdm_bg, [0x30, 0x30, 0x30]);
    assert_eq!(cfg.vdm_fg, [0xE0, 0xE0, 0xE0]);
    assert!(cfg.vdm_scanlines);
}

#[test]
fn memory_sections() {
    let cfg = parse(
        "[MEMORY 1]\n\
         ram 0,64\n\
         rom 255,1\n\
         boot 0xff00\n\
         [MEMORY 2]\n\
         ram 0,256\n\
         boot 0\n",
    );
    assert_eq!(cfg.sections.len(), 2);
    let s1 = &cfg.sections[0];
    assert_eq!(s1.segments.len(), 2);
    assert_eq!(s1.segments[0].attr, PageAttr::Rw);
    assert_eq!(s1.segments[0].start_page, 0);
    assert_eq!(s1.segments[0].pages, 64);
    assert_eq!(s1.segments[1].attr, PageAttr::Ro);
    assert_eq!(s1.segments[1].start_page, 255);
    assert_eq!(s1.boot_switch, 0xFF00);
    assert_eq!(cfg.sections[1].segments[0].pages, 256);
    assert_eq!(cfg.sections[1].boot_switch, 0);
}

#[test]
fn rom_file_resolves_against_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    let conf = dir.path().join("system.conf");
    std::fs::write(&conf, "rom 0,1,boot.bin\n").unwrap();
    let cfg = Config::parse(&conf);
    assert_eq!(
        cfg.sections[0].segments[0].rom_file.as_deref(),
        Some(dir.path().join("boot.bin").as_path())
    );
}

#[test]
fn invalid_entries_are_skipped() {
    let cfg = parse(
        "ram 300,4\n\
         ram 0,0\n\
         ram 200,100\n\
         rom banana,1\n\
         [MEMORY 99]\n\
         sio0_upper_case 7\n\
         frobnicate 1\n\
         ram 0,16\n",
    );
    // Only the final, valid ram line survives.
    let segs: usize = cfg.sections.iter().map(|s| s.segments.len()).sum();
    assert_eq!(segs, 1);
    assert_eq!(cfg.sections[0].segments[0].pages, 16);
    assert!(!cfg.sio[0].upper_case, "invalid value leaves the default");
}

#[test]
fn tabs_and_commas_both_separate() {
    let cfg = parse("ram\t0 , 32\nboot 0x0100\n");
    assert_eq!(cfg.sections[0].segments[0].pages, 32);
    assert_eq!(cfg.sections[0].boot_switch, 0x0100);
}
