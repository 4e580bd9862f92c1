//! Raw mode handling of the terminal the emulator runs in.
use crossterm::terminal;
use log::{debug, warn};
use std::io;
use std::io::Write;

/// Keeps the terminal in raw mode until dropped.
#[derive(Debug)]
pub struct RawLock {
    enabled: bool,
}

impl Drop for RawLock {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        // terminal stays in raw mode but no means to repair
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Error resetting terminal {e}");
        } else {
            debug!("Terminal restored");
        }
    }
}

/// Set terminal to raw in best-effort mode, only log on failure, since it does not work when
/// stdin is not a terminal.
///
/// Raw mode disables line buffering and echo and delivers CTRL-C as a key press.
#[must_use]
pub fn set_terminal_raw() -> RawLock {
    match terminal::enable_raw_mode() {
        Ok(()) => {
            debug!("Terminal set to raw mode");
            RawLock { enabled: true }
        }
        Err(e) => {
            warn!("Could not set terminal to raw mode: {e}");
            RawLock { enabled: false }
        }
    }
}

/// Output for a terminal in raw mode where a line feed does not return the cursor to the start
/// of the line, every `\n` not preceded by `\r` is written as `\r\n`.
#[derive(Debug)]
pub struct RawModeWriter<W: Write> {
    inner: W,
    last_was_carriage_return: bool,
}

impl<W: Write> RawModeWriter<W> {
    pub const fn new(inner: W) -> Self {
        Self {
            inner,
            last_was_carriage_return: false,
        }
    }
}

impl<W: Write> Write for RawModeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut start = 0;
        for (idx, b) in buf.iter().enumerate() {
            if *b == b'\n' && !self.last_was_carriage_return {
                self.inner.write_all(&buf[start..idx])?;
                self.inner.write_all(b"\r")?;
                start = idx;
            }
            self.last_was_carriage_return = *b == b'\r';
        }
        self.inner.write_all(&buf[start..])?;
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Program output for `stdout`, newlines are only translated for a terminal, pipes and files
/// get the bytes as written by the program.
pub fn console_writer<W: Write + 'static>(stdout: W, is_terminal: bool) -> Box<dyn Write> {
    if is_terminal {
        Box::new(RawModeWriter::new(stdout))
    } else {
        Box::new(stdout)
    }
}
