//! Terminal key input for the study runner.
//!
//! Keys are read in raw mode so single presses arrive without Enter. Raw mode
//! also turns off output post-processing, hence [`CrLfWriter`] for anything
//! printed while a session is running.

use std::io::{self, Write};
use std::thread;

use crossbeam_channel::{unbounded, Receiver};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::{debug, warn};

use crate::session::ESCAPE;

/// Puts the terminal into raw mode and restores it on drop.
pub struct RawModeGuard(());

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self(()))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Failed to restore terminal: {e}");
        }
    }
}

/// Map a terminal key event to the character the session understands.
///
/// Ctrl+C is reported as `q` because raw mode swallows SIGINT.
pub fn key_char(key: &KeyEvent) -> Option<char> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some('q'),
        KeyCode::Char(c) => Some(c),
        KeyCode::Esc => Some(ESCAPE),
        _ => None,
    }
}

/// Keys read from the terminal on a background thread.
pub struct KeySource {
    keys: Receiver<char>,
    _raw_mode: RawModeGuard,
}

impl KeySource {
    pub fn spawn() -> io::Result<Self> {
        let raw_mode = RawModeGuard::enable()?;
        let (tx, keys) = unbounded();

        thread::Builder::new()
            .name("key-reader".to_string())
            .spawn(move || loop {
                match event::read() {
                    Ok(Event::Key(key)) => {
                        if let Some(c) = key_char(&key) {
                            debug!("Key {c:?}");
                            if tx.send(c).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Failed to read terminal input: {e}");
                        break;
                    }
                }
            })?;

        Ok(Self {
            keys,
            _raw_mode: raw_mode,
        })
    }

    pub fn receiver(&self) -> &Receiver<char> {
        &self.keys
    }
}

/// Translates `\n` into `\r\n` for terminals in raw mode.
pub struct CrLfWriter<W: Write>(W);

impl<W: Write> CrLfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self(inner)
    }

    pub fn into_inner(self) -> W {
        self.0
    }
}

impl<W: Write> Write for CrLfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for chunk in buf.split_inclusive(|&b| b == b'\n') {
            match chunk.strip_suffix(b"\n") {
                Some(line) => {
                    self.0.write_all(line)?;
                    self.0.write_all(b"\r\n")?;
                }
                None => self.0.write_all(chunk)?,
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

/// Stdout with raw-mode line endings, for `tracing_subscriber`'s `with_writer`.
pub fn crlf_stdout() -> CrLfWriter<io::Stdout> {
    CrLfWriter::new(io::stdout())
}
