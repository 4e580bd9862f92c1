use crate::errors::LoadProgramError;
use crate::hardware::keyboard::KeyboardInputProvider;
use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, warn};
use std::fmt::{Debug, Formatter};
use std::io;
use std::io::Read;
use std::ops::{Index, IndexMut};

pub const PROGRAM_SECTION_START: u16 = 0x3000;
/// Number of addressable `u16` cells, the complete range of a `u16` address.
pub const MEMORY_SIZE_U16: usize = 1 << 16;

/// Memory regions mapped to IO functionality.
#[repr(u16)]
#[derive(enumn::N, Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemoryMappedIOLocations {
    /// Keyboard Status Register
    Kbsr = 0xFE00,
    /// Keyboard Data Register
    Kbdr = 0xFE02,
}

/// Placement of a loaded program image.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub origin: u16,
    pub word_count: usize,
}

/// An abstraction for the LC-3 memory including the memory mapped keyboard but excluding registers.
///
/// Indexing accesses the plain cells, [`Memory::read`] additionally runs the device logic.
pub struct Memory {
    /// Index equals memory address
    data: Box<[u16]>,
    keyboard: Box<dyn KeyboardInputProvider>,
}

impl Debug for Memory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let used = self.data.iter().filter(|cell| **cell != 0).count();
        write!(f, "Memory cells: {}, non-zero: {used}", self.data.len())
    }
}
impl Index<u16> for Memory {
    type Output = u16;
    fn index(&self, index: u16) -> &Self::Output {
        &self.data[usize::from(index)]
    }
}
impl IndexMut<u16> for Memory {
    fn index_mut(&mut self, index: u16) -> &mut Self::Output {
        &mut self.data[usize::from(index)]
    }
}
impl Index<MemoryMappedIOLocations> for Memory {
    type Output = u16;
    fn index(&self, index: MemoryMappedIOLocations) -> &Self::Output {
        &self[index as u16]
    }
}
impl IndexMut<MemoryMappedIOLocations> for Memory {
    fn index_mut(&mut self, index: MemoryMappedIOLocations) -> &mut Self::Output {
        &mut self[index as u16]
    }
}

impl Memory {
    pub const KEYBOARD_STATUS_REGISTER_SET: u16 = 1 << 15;
    pub const KEYBOARD_STATUS_REGISTER_UNSET: u16 = 0;

    #[must_use]
    pub fn new(keyboard: Box<dyn KeyboardInputProvider>) -> Self {
        Self {
            data: vec![0x0u16; MEMORY_SIZE_U16].into_boxed_slice(),
            keyboard,
        }
    }

    pub fn keyboard_mut(&mut self) -> &mut dyn KeyboardInputProvider {
        &mut *self.keyboard
    }

    /// Reads the cell at `address` the way a load instruction does.
    ///
    /// Reading the keyboard status register polls the keyboard without blocking and refreshes
    /// the status and data registers. The pending character stays available until the data
    /// register is read.
    pub fn read(&mut self, address: u16) -> u16 {
        match MemoryMappedIOLocations::n(address) {
            Some(MemoryMappedIOLocations::Kbsr) => self.refresh_keyboard_registers(),
            Some(MemoryMappedIOLocations::Kbdr) => {
                if self[MemoryMappedIOLocations::Kbsr] & Self::KEYBOARD_STATUS_REGISTER_SET != 0 {
                    self.keyboard.consume_input();
                    self[MemoryMappedIOLocations::Kbsr] = Self::KEYBOARD_STATUS_REGISTER_UNSET;
                }
            }
            None => {}
        }
        self[address]
    }

    /// Stores `value` at `address`, no address is write protected.
    pub fn write(&mut self, address: u16, value: u16) {
        self[address] = value;
    }

    /// Blocks until a key is pressed and consumes it.
    ///
    /// A character reported by the status register before is consumed as well, so the status
    /// register is cleared until the next poll.
    ///
    /// # Errors
    /// - see [`KeyboardInputProvider::read_input_character`]
    pub fn read_keyboard_character(&mut self) -> io::Result<u8> {
        let c = self.keyboard.read_input_character()?;
        self[MemoryMappedIOLocations::Kbsr] = Self::KEYBOARD_STATUS_REGISTER_UNSET;
        Ok(c)
    }

    fn refresh_keyboard_registers(&mut self) {
        let available = self.keyboard.check_input_available().unwrap_or_else(|e| {
            warn!("Polling keyboard failed, reporting no input: {e}");
            None
        });
        if let Some(c) = available {
            self[MemoryMappedIOLocations::Kbsr] = Self::KEYBOARD_STATUS_REGISTER_SET;
            self[MemoryMappedIOLocations::Kbdr] = u16::from(c);
        } else {
            self[MemoryMappedIOLocations::Kbsr] = Self::KEYBOARD_STATUS_REGISTER_UNSET;
        }
    }

    /// Loads a program image: a big endian `.ORIG` address followed by big endian words that
    /// are placed contiguously from there on.
    ///
    /// Words that would end up beyond address `0xFFFF` are dropped, as is a trailing odd byte.
    ///
    /// # Errors
    /// - Image is shorter than the two byte `.ORIG` header
    /// - Reading from `image` failed
    pub fn load_image(&mut self, mut image: impl Read) -> Result<LoadedImage, LoadProgramError> {
        let origin = match image.read_u16::<BigEndian>() {
            Ok(origin) => origin,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(LoadProgramError::ProgramMissingOrigHeader);
            }
            Err(e) => return Err(LoadProgramError::ImageReadError(e)),
        };
        let mut address = usize::from(origin);
        loop {
            let word = match image.read_u16::<BigEndian>() {
                Ok(word) => word,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(LoadProgramError::ImageReadError(e)),
            };
            if address >= MEMORY_SIZE_U16 {
                warn!("Program at {origin:#06X} exceeds the address space, truncated at 0xFFFF");
                break;
            }
            self.data[address] = word;
            address += 1;
        }
        let loaded = LoadedImage {
            origin,
            word_count: address - usize::from(origin),
        };
        debug!("Loaded {loaded:?}");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::test_helpers::FakeKeyboardInputProvider;
    use googletest::prelude::*;

    fn memory_with_input(input: &str) -> Memory {
        Memory::new(Box::new(FakeKeyboardInputProvider::new(input)))
    }

    fn image(origin: u16, words: &[u16]) -> Vec<u8> {
        std::iter::once(origin)
            .chain(words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    #[gtest]
    fn test_load_image() {
        let mut mem = memory_with_input("");
        mem[0x2FFF] = 0x1111;
        mem[0x3003] = 0x2222;
        let loaded = mem
            .load_image(image(0x3000, &[0xABCD, 0x0102, 0xF025]).as_slice())
            .unwrap();
        expect_that!(loaded, eq(LoadedImage { origin: 0x3000, word_count: 3 }));
        expect_that!(mem[0x2FFF], eq(0x1111));
        expect_that!(mem[0x3000], eq(0xABCD));
        expect_that!(mem[0x3001], eq(0x0102));
        expect_that!(mem[0x3002], eq(0xF025));
        expect_that!(mem[0x3003], eq(0x2222));
    }
    #[gtest]
    fn test_load_image_overwrites_previous_image() {
        let mut mem = memory_with_input("");
        mem.load_image(image(0x3000, &[1, 2, 3]).as_slice()).unwrap();
        mem.load_image(image(0x3001, &[9]).as_slice()).unwrap();
        expect_that!(mem[0x3000], eq(1));
        expect_that!(mem[0x3001], eq(9));
        expect_that!(mem[0x3002], eq(3));
    }
    #[gtest]
    fn test_load_image_empty() {
        let mut mem = memory_with_input("");
        let err = mem.load_image([0x30u8].as_slice()).unwrap_err();
        expect_that!(err.to_string(), eq("Program is missing valid .ORIG header"));
    }
    #[gtest]
    fn test_load_image_only_header() {
        let mut mem = memory_with_input("");
        let loaded = mem.load_image(image(0x4000, &[]).as_slice()).unwrap();
        expect_that!(loaded.word_count, eq(0));
    }
    #[gtest]
    fn test_load_image_odd_trailing_byte_ignored() {
        let mut mem = memory_with_input("");
        let mut bytes = image(0x3000, &[0x1234]);
        bytes.push(0x56);
        let loaded = mem.load_image(bytes.as_slice()).unwrap();
        expect_that!(loaded.word_count, eq(1));
        expect_that!(mem[0x3001], eq(0));
    }
    #[gtest]
    fn test_load_image_truncated_at_end_of_address_space() {
        let mut mem = memory_with_input("");
        let loaded = mem
            .load_image(image(0xFFFE, &[1, 2, 3, 4]).as_slice())
            .unwrap();
        expect_that!(loaded.word_count, eq(2));
        expect_that!(mem[0xFFFE], eq(1));
        expect_that!(mem[0xFFFF], eq(2));
        expect_that!(mem[0x0000], eq(0));
    }
    #[gtest]
    fn test_read_write_plain_cells() {
        let mut mem = memory_with_input("");
        mem.write(0xFFFF, 0xBEEF);
        mem.write(0xFE01, 7);
        expect_that!(mem.read(0xFFFF), eq(0xBEEF));
        expect_that!(mem.read(0xFE01), eq(7));
    }
    #[gtest]
    fn test_keyboard_status_without_input() {
        let mut mem = memory_with_input("");
        mem[0xFE00] = 0x8000;
        expect_that!(mem.read(0xFE00), eq(0));
    }
    #[gtest]
    fn test_keyboard_status_with_input() {
        let mut mem = memory_with_input("xy");
        expect_that!(mem.read(0xFE00), eq(0x8000));
        expect_that!(mem[0xFE02], eq(u16::from(b'x')));
        // polling again does not consume the character
        expect_that!(mem.read(0xFE00), eq(0x8000));
        expect_that!(mem[0xFE02], eq(u16::from(b'x')));
        // reading the data register does
        expect_that!(mem.read(0xFE02), eq(u16::from(b'x')));
        expect_that!(mem.read(0xFE00), eq(0x8000));
        expect_that!(mem.read(0xFE02), eq(u16::from(b'y')));
        expect_that!(mem.read(0xFE00), eq(0));
    }
    #[gtest]
    fn test_blocking_read_clears_keyboard_status() {
        let mut mem = memory_with_input("xy");
        expect_that!(mem.read(0xFE00), eq(0x8000));
        expect_that!(mem.read_keyboard_character().unwrap(), eq(b'x'));
        expect_that!(mem[0xFE00], eq(0));
        // data register keeps the last reported character without consuming 'y'
        expect_that!(mem.read(0xFE02), eq(u16::from(b'x')));
        expect_that!(mem.read_keyboard_character().unwrap(), eq(b'y'));
    }
}
