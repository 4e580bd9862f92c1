use crate::numbers;
use std::fmt::{Debug, Formatter};

/// The 16 LC-3 operations, selected by the 4 most significant bits of an instruction.
#[repr(u8)]
#[derive(enumn::N, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Opcode {
    Br = 0,
    Add,
    Ld,
    St,
    Jsr,
    And,
    Ldr,
    Str,
    /// Return from interrupt, not supported without supervisor mode
    Rti,
    Not,
    Ldi,
    Sti,
    Jmp,
    /// Reserved
    Res,
    Lea,
    Trap,
}

/// Wrapper for LC-3 u16 instruction.
/// format is: `OOOO_DDD_P_PPPP_PPPP`
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Instruction(u16);

impl Instruction {
    /// Gives the value of only the specified bit range.
    ///
    /// # Parameters
    /// - `from`: starting index
    /// - `to`: end index (inclusive), mut be greater or equal to `from`
    ///
    /// # Panics
    /// - asserts that to is greater or equal from and both are valid indexes
    #[expect(
        clippy::cast_possible_truncation,
        reason = "mask is at most 16 bits wide"
    )]
    #[must_use]
    pub fn get_bit_range(self, from: u8, to: u8) -> u16 {
        debug_assert!(
            to >= from,
            "wrong direction of from: {from:?} and to: {to:?}"
        );
        debug_assert!(
            (00..u16::BITS).contains(&u32::from(to)),
            "index: {to:?} to u16 is greater than maximum value {:?}",
            u16::BITS - 1
        );
        let width = u32::from(to - from) + 1;
        (self.0 >> from) & (((1u32 << width) - 1) as u16)
    }
    /// Register number (0 to 7) stored in the three bits starting at `from`.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "three bits always fit into u8"
    )]
    #[must_use]
    fn register_number(self, from: u8) -> u8 {
        self.get_bit_range(from, from + 2) as u8
    }
    #[must_use]
    pub fn get_bit(self, index: u8) -> bool {
        self.get_bit_range(index, index) & 1 != 0
    }
    /// Decoded operation, every 4 bit value names one.
    #[must_use]
    pub fn op_code(self) -> Opcode {
        #[expect(clippy::cast_possible_truncation, reason = "4 bits fit into u8")]
        let bits = self.get_bit_range(12, 15) as u8;
        Opcode::n(bits).unwrap_or(Opcode::Res)
    }
    /// Destination register, also the source register for the store operations.
    #[must_use]
    pub fn dr_number(self) -> u8 {
        self.register_number(9)
    }
    #[must_use]
    pub fn sr1_number(self) -> u8 {
        self.register_number(6)
    }
    /// Same bits as `sr1`, named after their use in JMP, JSRR, LDR and STR.
    #[must_use]
    pub fn base_r_number(self) -> u8 {
        self.register_number(6)
    }
    #[must_use]
    pub fn sr2_number(self) -> u8 {
        self.register_number(0)
    }
    #[must_use]
    pub fn is_immediate(self) -> bool {
        self.get_bit(5)
    }
    /// Sign extended `imm5`.
    #[must_use]
    pub fn get_immediate(self) -> u16 {
        numbers::sign_extend(self.get_bit_range(0, 4), 5)
    }
    /// The `nzp` bits of BR, lined up with [`crate::hardware::registers::ConditionFlag::bits`].
    #[must_use]
    pub fn nzp(self) -> u16 {
        self.get_bit_range(9, 11)
    }
    /// Offset of `len` bits to add to the program counter or a base register.
    /// Sign extended, so adding it with wrap around subtracts for negative offsets.
    #[must_use]
    pub fn pc_offset(self, len: u8) -> u16 {
        numbers::sign_extend(self.get_bit_range(0, len - 1), len)
    }
    #[expect(clippy::cast_possible_truncation, reason = "masked to 8 bits")]
    #[must_use]
    pub fn trap_vector(self) -> u8 {
        self.get_bit_range(0, 7) as u8
    }
}

impl Debug for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:#06X} Op: {:?}, DR: {:03b}, PC_Off: {:09b}",
            self.0,
            self.op_code(),
            self.dr_number(),
            self.get_bit_range(0, 8)
        )
    }
}

impl From<u16> for Instruction {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}
