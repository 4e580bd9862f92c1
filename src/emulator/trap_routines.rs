//! Console services invoked by the TRAP instruction, R0 is parameter and return channel.
use crate::emulator::instruction::Instruction;
use crate::errors::ExecutionError;
use crate::hardware::memory::{MEMORY_SIZE_U16, Memory};
use crate::hardware::registers::{Registers, from_binary};
use log::{debug, warn};
use std::io;
use std::io::Write;
use std::ops::ControlFlow;

/// Trap vectors with a service routine.
#[repr(u8)]
#[derive(enumn::N, Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrapVector {
    GetC = 0x20,
    Out = 0x21,
    PutS = 0x22,
    In = 0x23,
    PutSp = 0x24,
    Halt = 0x25,
}

/// TRAP: saves PC in R7 and runs the service routine for the vector in bits [7:0].
/// ```text
///  15__12__11__8___7_______0_
/// | 1111 | 0000 | trapvect8 |
///  -------------------------
/// ```
/// Unknown vectors are ignored.
pub fn trap(
    i: Instruction,
    regs: &mut Registers,
    mem: &mut Memory,
    stdout: &mut impl Write,
) -> ControlFlow<Result<(), ExecutionError>> {
    regs.set(7, regs.pc());
    let Some(vector) = TrapVector::n(i.trap_vector()) else {
        warn!(
            "Ignoring unknown trap vector {:#04X} before {:#06X}",
            i.trap_vector(),
            regs.pc().as_binary()
        );
        return ControlFlow::Continue(());
    };
    match vector {
        TrapVector::GetC => get_c(regs, mem),
        TrapVector::Out => out(regs, stdout),
        TrapVector::PutS => put_s(regs, mem, stdout),
        TrapVector::In => in_trap(regs, mem, stdout),
        TrapVector::PutSp => put_sp(regs, mem, stdout),
        TrapVector::Halt => halt(stdout),
    }
}

fn read_character_from_console(
    regs: &mut Registers,
    mem: &mut Memory,
) -> ControlFlow<Result<(), ExecutionError>, u8> {
    match mem.read_keyboard_character() {
        Ok(c) => {
            regs.set(0, from_binary(u16::from(c)));
            regs.update_conditional_register(0);
            ControlFlow::Continue(c)
        }
        Err(e) => wrap_io_error_in_cf(e),
    }
}

/// GETC: Read a single character from the keyboard. The character is not echoed onto the console.
///
/// Its ASCII code is copied into R0. The high eight bits of R0 are cleared.
pub fn get_c(regs: &mut Registers, mem: &mut Memory) -> ControlFlow<Result<(), ExecutionError>> {
    read_character_from_console(regs, mem)?;
    ControlFlow::Continue(())
}

/// IN: Print a prompt on the screen and read a single character echoed back from the keyboard.
///
/// Otherwise, like 0x20 GETC.
pub fn in_trap(
    regs: &mut Registers,
    mem: &mut Memory,
    stdout: &mut impl Write,
) -> ControlFlow<Result<(), ExecutionError>> {
    write_out(b"Enter a character: ", stdout)?;
    let c = read_character_from_console(regs, mem)?;
    write_out(&[c], stdout)
}

/// OUT: Write a character in R0[7:0] to the console display.
pub fn out(regs: &Registers, stdout: &mut impl Write) -> ControlFlow<Result<(), ExecutionError>> {
    let [low, _high] = regs.get(0).as_binary().to_le_bytes();
    write_out(&[low], stdout)
}

fn put_one_char_per_u16(input: u16, append_to: &mut Vec<u8>) {
    let [low, _high] = input.to_le_bytes();
    append_to.push(low);
}

fn put_two_chars_per_u16(input: u16, append_to: &mut Vec<u8>) {
    let [low, high] = input.to_le_bytes();
    append_to.push(low);
    if high != 0 {
        append_to.push(high);
    }
}

fn put(
    regs: &Registers,
    mem: &Memory,
    stdout: &mut impl Write,
    handle_char: fn(u16, &mut Vec<u8>),
) -> ControlFlow<Result<(), ExecutionError>> {
    let mut address = regs.get(0).as_binary();
    let mut s = Vec::with_capacity(120);
    // bounded, a string without terminator would otherwise cycle through the address space
    for _ in 0..MEMORY_SIZE_U16 {
        if mem[address] == 0 {
            break;
        }
        handle_char(mem[address], &mut s);
        address = address.wrapping_add(1);
    }
    write_out(&s, stdout)
}

/// PUTS: print null-delimited char* from register 0's address
pub fn put_s(
    regs: &Registers,
    mem: &Memory,
    stdout: &mut impl Write,
) -> ControlFlow<Result<(), ExecutionError>> {
    put(regs, mem, stdout, put_one_char_per_u16)
}

/// PUTSP: Packed version of PUTS
///
/// The ASCII code contained in bits [7:0] of a memory location is written to the console first.
/// The second character of the last memory location can be 0x00.
/// Writing terminates with a 0x000 char.
pub fn put_sp(
    regs: &Registers,
    mem: &Memory,
    stdout: &mut impl Write,
) -> ControlFlow<Result<(), ExecutionError>> {
    put(regs, mem, stdout, put_two_chars_per_u16)
}

/// HALT: End program and stdout a message
pub fn halt(stdout: &mut impl Write) -> ControlFlow<Result<(), ExecutionError>> {
    write_out(b"HALT\n", stdout)?;
    debug!("Program halted");
    ControlFlow::Break(Ok(()))
}

fn write_out(message: &[u8], stdout: &mut impl Write) -> ControlFlow<Result<(), ExecutionError>> {
    match stdout.write_all(message).and_then(|()| stdout.flush()) {
        Ok(()) => ControlFlow::Continue(()),
        Err(e) => wrap_io_error_in_cf(e),
    }
}

fn wrap_io_error_in_cf<C>(error: io::Error) -> ControlFlow<Result<(), ExecutionError>, C> {
    ControlFlow::Break(Err(ExecutionError::from(error)))
}
