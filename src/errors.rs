//! Errors reported while loading program images or executing them.
use crate::emulator::instruction::Opcode;
use displaydoc::Display;
use std::io;
use thiserror::Error;

/// Errors while loading a program image into memory.
#[derive(Display, Error, Debug)]
pub enum LoadProgramError {
    /// failed to load image: {path}: {source}
    ProgramNotReadable {
        path: String,
        #[source]
        source: io::Error,
    },
    /// Program is missing valid .ORIG header
    ProgramMissingOrigHeader,
    /// Error reading program image: {0}
    ImageReadError(#[source] io::Error),
}

/// Errors ending the execution of a loaded program other than by HALT.
#[derive(Display, Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Illegal opcode {opcode:?} in instruction {instruction:#06X} at address {address:#06X}
    IllegalOpcode {
        opcode: Opcode,
        instruction: u16,
        address: u16,
    },
    /// Error during reading Stdin or writing program output to Stdout: {0}
    IOInputOutputError(String),
    /// Execution interrupted by user
    Interrupted,
}

impl From<io::Error> for ExecutionError {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::Interrupted {
            Self::Interrupted
        } else {
            Self::IOInputOutputError(error.to_string())
        }
    }
}
