use crate::emulator::Emulator;
use crate::hardware::keyboard::KeyboardInputProvider;
use crate::hardware::memory::Memory;
use crate::hardware::registers::Registers;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::io::Write;
use std::rc::Rc;

/// Collects everything written, clones share the same buffer.
#[derive(Clone, Default)]
pub struct StringWriter {
    vec: Rc<RefCell<Vec<u8>>>,
}
impl Write for StringWriter {
    fn write(&mut self, data: &[u8]) -> Result<usize, io::Error> {
        self.vec.borrow_mut().write(data)
    }
    fn flush(&mut self) -> Result<(), io::Error> {
        Ok(())
    }
}
impl StringWriter {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn get_string(&self) -> String {
        String::from_utf8(self.vec.borrow().clone()).unwrap()
    }
}

#[derive(Default)]
struct FakeKeyboardState {
    input: VecDeque<u8>,
    read_error: Option<String>,
    is_interrupted: bool,
}

/// Keyboard replaying scripted input, clones share the same input.
#[derive(Clone, Default)]
pub struct FakeKeyboardInputProvider {
    state: Rc<RefCell<FakeKeyboardState>>,
}
impl FakeKeyboardInputProvider {
    pub fn new(input: &str) -> Self {
        let res = Self::default();
        res.state.borrow_mut().input.extend(input.bytes());
        res
    }
}
impl KeyboardInputProvider for FakeKeyboardInputProvider {
    fn check_input_available(&mut self) -> io::Result<Option<u8>> {
        Ok(self.state.borrow().input.front().copied())
    }
    fn consume_input(&mut self) {
        self.state.borrow_mut().input.pop_front();
    }
    fn read_input_character(&mut self) -> io::Result<u8> {
        let mut state = self.state.borrow_mut();
        if state.is_interrupted {
            return Err(io::ErrorKind::Interrupted.into());
        }
        if let Some(message) = &state.read_error {
            return Err(io::Error::other(message.clone()));
        }
        state
            .input
            .pop_front()
            .ok_or_else(|| io::ErrorKind::UnexpectedEof.into())
    }
    fn is_interrupted(&mut self) -> bool {
        self.state.borrow().is_interrupted
    }
}

/// Emulator with scripted keyboard and captured output, program placed at `0x3000`.
pub struct FakeEmulator {
    inner: Emulator,
    keyboard: FakeKeyboardInputProvider,
    stdout: StringWriter,
}
impl FakeEmulator {
    pub fn new(program_no_header: &[u16]) -> Self {
        let bytes: Vec<u8> = std::iter::once(0x3000u16)
            .chain(program_no_header.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect();
        let keyboard = FakeKeyboardInputProvider::default();
        let stdout = StringWriter::new();
        let mut inner = Emulator::with_io(Box::new(keyboard.clone()), Box::new(stdout.clone()));
        inner.load_program_bytes(&bytes).unwrap();
        Self {
            inner,
            keyboard,
            stdout,
        }
    }
    pub fn add_stdin_input(&mut self, input: &str) -> &mut Self {
        self.keyboard
            .state
            .borrow_mut()
            .input
            .extend(input.bytes());
        self
    }
    pub fn fail_stdin_with(&mut self, message: &str) -> &mut Self {
        self.keyboard.state.borrow_mut().read_error = Some(message.to_string());
        self
    }
    pub fn interrupt(&mut self) -> &mut Self {
        self.keyboard.state.borrow_mut().is_interrupted = true;
        self
    }
    pub const fn inner(&self) -> &Emulator {
        &self.inner
    }
    pub const fn inner_mut(&mut self) -> &mut Emulator {
        &mut self.inner
    }
    pub fn output(&self) -> String {
        self.stdout.get_string()
    }
    pub fn get_parts(&mut self) -> (&mut Registers, &mut Memory, &mut StringWriter) {
        (
            &mut self.inner.registers,
            &mut self.inner.memory,
            &mut self.stdout,
        )
    }
}
