//! Terminal raw-mode handling.
//!
//! Raw mode is scoped: the guard restores the terminal on drop, so every
//! exit path (early return, panic unwinding, fatal error) puts the
//! terminal back.

use std::io;

use crossterm::event::{Event, KeyCode, KeyEventKind, read};
use crossterm::terminal;

pub struct RawMode(());

impl RawMode {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self(()))
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Read a single key press, raw, without echo. Used by pagers.
pub fn getkey() -> io::Result<char> {
    let _raw = RawMode::enter()?;
    loop {
        if let Event::Key(key) = read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char(c) => return Ok(c),
                KeyCode::Enter => return Ok('\n'),
                KeyCode::Esc => return Ok('\x1b'),
                _ => {}
            }
        }
    }
}
