//! # LC-3 VM.
//!
//! `lc3-vm` interprets program images for the LC-3, a 16 bit educational computer.
//! Usage starts with loading one or more program images, e.g. via `emulator::from_program`,
//! followed by `Emulator::execute` which runs until the program halts.
//!
//!  # Example
//! ```no_run
//! use lc3_vm::emulator;
//! let mut emu = emulator::from_program("rogue.obj").unwrap();
//! let _lock = lc3_vm::terminal::set_terminal_raw();
//! emu.execute().unwrap();
//! ```
//! # Errors
//! - Program image cannot be read or is missing its `.ORIG` header
//! - Program executes an illegal opcode
//! - Console input or output fails
//! - User interrupts the execution with CTRL-C

pub mod emulator;
pub mod errors;
pub mod hardware;
pub(crate) mod numbers;
pub mod terminal;
