use crate::hardware::memory::PROGRAM_SECTION_START;
use crate::numbers;
use std::fmt::{Debug, Formatter};

/// Content of a single 16 bit register, interpreted as two's complement where needed.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct Register(u16);

impl Register {
    #[must_use]
    pub const fn from_binary(value: u16) -> Self {
        Self(value)
    }
    #[must_use]
    pub const fn from_decimal(value: i16) -> Self {
        Self(value.cast_unsigned())
    }
    #[must_use]
    pub const fn as_binary(self) -> u16 {
        self.0
    }
    #[must_use]
    pub const fn as_decimal(self) -> i16 {
        numbers::twos_complement_to_decimal(self.0)
    }
}
impl Debug for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06X} ({})", self.0, self.as_decimal())
    }
}

#[must_use]
pub const fn from_binary(value: u16) -> Register {
    Register::from_binary(value)
}
#[must_use]
pub const fn from_decimal(value: i16) -> Register {
    Register::from_decimal(value)
}

/// The LC-3 register file: R0 to R7, the program counter and the condition register.
#[derive(Clone, PartialEq, Eq)]
pub struct Registers {
    general_purpose: [Register; 8],
    pc: Register,
    cond: ConditionFlag,
}
impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
impl Debug for Registers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PC: {:#06X}, COND: {:?}", self.pc.0, self.cond)?;
        for (idx, r) in self.general_purpose.iter().enumerate() {
            write!(f, ", R{idx}: {:#06X}", r.0)?;
        }
        Ok(())
    }
}

impl Registers {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            general_purpose: [Register(0); 8],
            pc: Register(PROGRAM_SECTION_START),
            cond: ConditionFlag::Zero,
        }
    }

    /// # Panics
    /// - register number greater than 7
    #[must_use]
    pub fn get(&self, r: u8) -> Register {
        assert!(r <= 7, "Invalid general purpose register get: {r}");
        self.general_purpose[usize::from(r)]
    }
    /// Sets a general purpose register without touching the condition register.
    ///
    /// # Panics
    /// - register number greater than 7
    pub fn set(&mut self, r: u8, value: Register) {
        assert!(r <= 7, "Invalid general purpose register set: {r}");
        self.general_purpose[usize::from(r)] = value;
    }
    #[must_use]
    pub const fn pc(&self) -> Register {
        self.pc
    }
    pub const fn set_pc(&mut self, value: u16) {
        self.pc = Register(value);
    }
    /// Advances PC past the instruction just fetched, wrapping at the end of the address space.
    pub const fn inc_pc(&mut self) {
        self.pc = Register(self.pc.0.wrapping_add(1));
    }
    #[must_use]
    pub const fn get_conditional_register(&self) -> ConditionFlag {
        self.cond
    }
    /// Derives the condition flag from the current value of register `r`.
    pub fn update_conditional_register(&mut self, r: u8) {
        self.cond = ConditionFlag::from(self.get(r).as_binary());
    }
}

/// Sign of the last value written to a general purpose register.
///
/// Exactly one flag is set at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ConditionFlag {
    Pos = 1 << 0,
    Zero = 1 << 1,
    Neg = 1 << 2,
}
impl ConditionFlag {
    /// Bit as used in the `nzp` field of BR.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self as u16
    }
}

impl From<u16> for ConditionFlag {
    fn from(value: u16) -> Self {
        if value == 0 {
            Self::Zero
        } else if value >> 15 == 1 {
            // leftmost bit is 1 for negative numbers
            Self::Neg
        } else {
            Self::Pos
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use proptest::prelude::*;

    #[gtest]
    fn test_initial_state() {
        let regs = Registers::new();
        expect_that!(regs.pc(), eq(from_binary(0x3000)));
        expect_that!(regs.get_conditional_register(), eq(ConditionFlag::Zero));
        for r in 0..8 {
            expect_that!(regs.get(r), eq(from_binary(0)));
        }
    }
    #[gtest]
    fn test_inc_pc_wraps() {
        let mut regs = Registers::new();
        regs.set_pc(0xFFFF);
        regs.inc_pc();
        expect_that!(regs.pc(), eq(from_binary(0)));
    }
    #[gtest]
    #[should_panic(expected = "Invalid general purpose register get: 8")]
    fn test_get_invalid_register() {
        let _ = Registers::new().get(8);
    }
    #[gtest]
    fn test_register_conversions() {
        expect_that!(from_decimal(-1).as_binary(), eq(0xFFFF));
        expect_that!(from_binary(0xFF80).as_decimal(), eq(-128));
    }

    proptest! {
        #[test]
        fn condition_flag_matches_sign(value in any::<u16>()) {
            let mut regs = Registers::new();
            regs.set(3, from_binary(value));
            regs.update_conditional_register(3);
            let expected = if value == 0 {
                ConditionFlag::Zero
            } else if value >= 0x8000 {
                ConditionFlag::Neg
            } else {
                ConditionFlag::Pos
            };
            prop_assert_eq!(regs.get_conditional_register(), expected);
        }
    }
}
