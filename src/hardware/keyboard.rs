use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, trace};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// Providing Keyboard Input independent of an implementation.
///
/// Also carries the cancellation request of the user, the emulator polls
/// [`KeyboardInputProvider::is_interrupted`] and stops cooperatively.
pub trait KeyboardInputProvider {
    /// Checks if input is available, does not block and does not consume the character.
    ///
    /// # Errors
    /// - polling the underlying input failed
    fn check_input_available(&mut self) -> io::Result<Option<u8>>;
    /// Drops the character last reported by `check_input_available`.
    fn consume_input(&mut self);
    /// Blocks until a character is available and consumes it.
    ///
    /// # Errors
    /// - reading the underlying input failed
    /// - [`io::ErrorKind::Interrupted`] if the user requested termination while waiting
    fn read_input_character(&mut self) -> io::Result<u8>;
    /// True if CTRL-C was triggered
    fn is_interrupted(&mut self) -> bool;
}

/// Keyboard input from the terminal, expects raw mode to be active so that key presses arrive
/// one by one and CTRL-C is delivered as a key event instead of a signal.
#[derive(Debug, Default)]
pub struct TerminalInputProvider {
    pending: VecDeque<u8>,
    is_interrupted: bool,
}
impl TerminalInputProvider {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            is_interrupted: false,
        }
    }

    /// Moves all events available without blocking into the pending queue.
    fn drain_events(&mut self) -> io::Result<()> {
        while event::poll(Duration::ZERO)? {
            self.handle_event(&event::read()?);
        }
        Ok(())
    }

    fn handle_event(&mut self, event: &Event) {
        let Event::Key(key) = event else {
            return;
        };
        if key.kind == KeyEventKind::Release {
            return;
        }
        if is_ctrl_c(key) {
            debug!("CTRL-C received, requesting interrupt");
            self.is_interrupted = true;
            return;
        }
        if let Some(b) = key_to_byte(key) {
            trace!("key press {b:#04X}");
            self.pending.push_back(b);
        }
    }
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c' | 'C'))
}

fn key_to_byte(key: &KeyEvent) -> Option<u8> {
    match key.code {
        KeyCode::Char(c) => {
            let b = u8::try_from(c).ok().filter(u8::is_ascii)?;
            if key.modifiers.contains(KeyModifiers::CONTROL) && b.is_ascii_alphabetic() {
                Some(b.to_ascii_lowercase() - b'a' + 1)
            } else {
                Some(b)
            }
        }
        KeyCode::Enter => Some(b'\n'),
        KeyCode::Tab => Some(b'\t'),
        KeyCode::Backspace => Some(0x08),
        KeyCode::Esc => Some(0x1B),
        _ => None,
    }
}

impl KeyboardInputProvider for TerminalInputProvider {
    fn check_input_available(&mut self) -> io::Result<Option<u8>> {
        if self.pending.is_empty() {
            self.drain_events()?;
        }
        Ok(self.pending.front().copied())
    }
    fn consume_input(&mut self) {
        self.pending.pop_front();
    }
    fn read_input_character(&mut self) -> io::Result<u8> {
        loop {
            if self.is_interrupted {
                return Err(io::ErrorKind::Interrupted.into());
            }
            if let Some(b) = self.pending.pop_front() {
                return Ok(b);
            }
            self.handle_event(&event::read()?);
        }
    }
    fn is_interrupted(&mut self) -> bool {
        if !self.is_interrupted
            && let Err(e) = self.drain_events()
        {
            debug!("polling terminal events failed: {e}");
        }
        self.is_interrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use googletest::prelude::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    #[gtest]
    fn test_key_events_are_queued() {
        let mut sut = TerminalInputProvider::new();
        sut.handle_event(&key(KeyCode::Char('a'), KeyModifiers::NONE));
        sut.handle_event(&key(KeyCode::Enter, KeyModifiers::NONE));
        sut.handle_event(&key(KeyCode::F(1), KeyModifiers::NONE));
        expect_that!(Vec::from(sut.pending.clone()), eq(&vec![b'a', b'\n']));
        expect_that!(sut.is_interrupted, eq(false));
    }
    #[gtest]
    fn test_ctrl_c_interrupts() {
        let mut sut = TerminalInputProvider::new();
        sut.handle_event(&key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        expect_that!(sut.pending.is_empty(), eq(true));
        expect_that!(sut.is_interrupted, eq(true));
        expect_that!(
            sut.read_input_character().unwrap_err().kind(),
            eq(io::ErrorKind::Interrupted)
        );
    }
    #[gtest]
    fn test_other_control_keys() {
        let mut sut = TerminalInputProvider::new();
        sut.handle_event(&key(KeyCode::Char('d'), KeyModifiers::CONTROL));
        expect_that!(Vec::from(sut.pending.clone()), eq(&vec![0x04]));
    }
}
