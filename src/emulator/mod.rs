//! The fetch, decode and execute loop of the LC-3.
pub mod instruction;
pub mod opcodes;
#[cfg(test)]
pub(crate) mod test_helpers;
pub mod trap_routines;

use crate::emulator::instruction::{Instruction, Opcode};
use crate::errors::{ExecutionError, LoadProgramError};
use crate::hardware::keyboard::{KeyboardInputProvider, TerminalInputProvider};
use crate::hardware::memory::{LoadedImage, Memory};
use crate::hardware::registers::Registers;
use crate::terminal;
use log::{error, info, trace};
use std::fmt::{Debug, Formatter};
use std::fs::File;
use std::io;
use std::io::{BufReader, IsTerminal, Write};
use std::ops::ControlFlow;
use std::path::Path;

/// Number of executed instructions between two checks for a user interrupt.
pub const INTERRUPT_CHECK_INTERVAL: u32 = 0x1000;

/// Execution state of the CPU, `Halted` is only reached by the HALT trap.
///
/// `Faulted` follows an illegal opcode and is final as well, only
/// [`Emulator::reset_registers`] leaves it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CpuState {
    Running,
    Halted,
    Faulted,
}

/// The public facing emulator used to run LC-3 programs.
pub struct Emulator {
    pub(crate) registers: Registers,
    pub(crate) memory: Memory,
    stdout: Box<dyn Write>,
    state: CpuState,
    fault: Option<ExecutionError>,
}

impl Debug for Emulator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emulator")
            .field("state", &self.state)
            .field("registers", &self.registers)
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}
impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates an emulator attached to the terminal and loads the program image at `path`.
///
/// # Errors
/// See [`Emulator::load_program_file`]
pub fn from_program(path: impl AsRef<Path>) -> Result<Emulator, LoadProgramError> {
    let mut emu = Emulator::new();
    emu.load_program_file(path)?;
    Ok(emu)
}

/// Creates an emulator attached to the terminal and loads the program image in `program`.
///
/// # Errors
/// See [`Emulator::load_program_bytes`]
pub fn from_program_bytes(program: &[u8]) -> Result<Emulator, LoadProgramError> {
    let mut emu = Emulator::new();
    emu.load_program_bytes(program)?;
    Ok(emu)
}

impl Emulator {
    /// Emulator reading the keyboard from the terminal and writing to stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_io(
            Box::new(TerminalInputProvider::new()),
            terminal::console_writer(io::stdout(), io::stdout().is_terminal()),
        )
    }

    /// Emulator with the given console, all registers and memory cells zeroed, PC at `0x3000`.
    #[must_use]
    pub fn with_io(keyboard: Box<dyn KeyboardInputProvider>, stdout: Box<dyn Write>) -> Self {
        Self {
            registers: Registers::new(),
            memory: Memory::new(keyboard),
            stdout,
            state: CpuState::Running,
            fault: None,
        }
    }

    /// Loads the program image file at `path`, see [`Memory::load_image`] for the format.
    ///
    /// # Errors
    /// - File cannot be opened or read
    /// - Program is missing valid .ORIG header
    pub fn load_program_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<LoadedImage, LoadProgramError> {
        let path = path.as_ref();
        let not_readable = |source| LoadProgramError::ProgramNotReadable {
            path: path.display().to_string(),
            source,
        };
        let file = File::open(path).map_err(not_readable)?;
        let loaded = self
            .memory
            .load_image(BufReader::new(file))
            .map_err(|e| match e {
                LoadProgramError::ImageReadError(source) => not_readable(source),
                other => other,
            })?;
        info!(
            "Loaded {} words from {} at {:#06X}",
            loaded.word_count,
            path.display(),
            loaded.origin
        );
        Ok(loaded)
    }

    /// Loads a program image held in memory.
    ///
    /// # Errors
    /// - Program is missing valid .ORIG header
    pub fn load_program_bytes(&mut self, program: &[u8]) -> Result<LoadedImage, LoadProgramError> {
        self.memory.load_image(program)
    }

    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.registers
    }
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }
    #[must_use]
    pub const fn state(&self) -> CpuState {
        self.state
    }
    /// Resets registers and state to their initial values to run the program again,
    /// memory is kept as is.
    pub fn reset_registers(&mut self) {
        self.registers = Registers::new();
        self.state = CpuState::Running;
        self.fault = None;
    }

    /// Runs until the program halts.
    ///
    /// # Errors
    /// - Illegal opcode
    /// - Console input or output failed
    /// - User interrupted the execution
    pub fn execute(&mut self) -> Result<(), ExecutionError> {
        let mut since_interrupt_check = 0u32;
        loop {
            since_interrupt_check += 1;
            if since_interrupt_check >= INTERRUPT_CHECK_INTERVAL {
                since_interrupt_check = 0;
                if self.memory.keyboard_mut().is_interrupted() {
                    info!("Interrupted at {:#06X}", self.registers.pc().as_binary());
                    return Err(ExecutionError::Interrupted);
                }
            }
            if let ControlFlow::Break(result) = self.step() {
                return result;
            }
        }
    }

    /// Fetches, decodes and executes a single instruction.
    ///
    /// Breaks with `Ok` once the program is halted and with the same illegal opcode error
    /// again once it faulted.
    pub fn step(&mut self) -> ControlFlow<Result<(), ExecutionError>> {
        match self.state {
            CpuState::Halted => return ControlFlow::Break(Ok(())),
            CpuState::Faulted => {
                if let Some(fault) = &self.fault {
                    return ControlFlow::Break(Err(fault.clone()));
                }
            }
            CpuState::Running => {}
        }
        let address = self.registers.pc().as_binary();
        let i = Instruction::from(self.memory.read(address));
        self.registers.inc_pc();
        trace!("{address:#06X}: {i:?}");

        let regs = &mut self.registers;
        let mem = &mut self.memory;
        match i.op_code() {
            Opcode::Br => opcodes::br(i, regs),
            Opcode::Add => opcodes::add(i, regs),
            Opcode::Ld => opcodes::ld(i, regs, mem),
            Opcode::St => opcodes::st(i, regs, mem),
            Opcode::Jsr => opcodes::jsr(i, regs),
            Opcode::And => opcodes::and(i, regs),
            Opcode::Ldr => opcodes::ldr(i, regs, mem),
            Opcode::Str => opcodes::str(i, regs, mem),
            Opcode::Not => opcodes::not(i, regs),
            Opcode::Ldi => opcodes::ldi(i, regs, mem),
            Opcode::Sti => opcodes::sti(i, regs, mem),
            Opcode::Jmp => opcodes::jmp_or_ret(i, regs),
            Opcode::Lea => opcodes::lea(i, regs),
            Opcode::Trap => {
                let res = trap_routines::trap(i, regs, mem, &mut self.stdout);
                if matches!(res, ControlFlow::Break(Ok(()))) {
                    self.state = CpuState::Halted;
                }
                return res;
            }
            opcode @ (Opcode::Rti | Opcode::Res) => {
                error!("Illegal opcode {opcode:?} at {address:#06X}");
                let fault = ExecutionError::IllegalOpcode {
                    opcode,
                    instruction: i.get_bit_range(0, 15),
                    address,
                };
                self.state = CpuState::Faulted;
                self.fault = Some(fault.clone());
                return ControlFlow::Break(Err(fault));
            }
        }
        ControlFlow::Continue(())
    }
}
