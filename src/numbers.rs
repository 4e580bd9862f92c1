//! Bit-level helpers for 16 bit two's complement arithmetic.

/// Implements sign extension as described at [Sign extension](https://en.wikipedia.org/wiki/Sign_extension).
///
/// Only the lowest `valid_bits` of `bits` are considered, everything above is replaced by
/// copies of bit `valid_bits - 1`.
///
/// # Panics
/// - in debug builds if `valid_bits` is not in `1..=16`
#[must_use]
pub const fn sign_extend(bits: u16, valid_bits: u8) -> u16 {
    debug_assert!(valid_bits >= 1 && valid_bits <= 16, "invalid field width");
    if valid_bits >= 16 {
        return bits;
    }
    let field = bits & ((1 << valid_bits) - 1);
    if (field >> (valid_bits - 1)) & 1 == 1 {
        // negative: 1-extend
        field | (0xFFFF << valid_bits)
    } else {
        // positive, already 0-extended
        field
    }
}

/// Interprets the binary representation as a signed number.
#[must_use]
pub const fn twos_complement_to_decimal(bin_rep: u16) -> i16 {
    bin_rep.cast_signed()
}
