//! Hardware backends.

#[cfg(decorated_storage)]
mod e200z4;

#[cfg(decorated_storage)]
pub use e200z4::E200z4;

/// Decoration: plain load or store of the full operand.
#[allow(dead_code)]
pub(crate) const DEC_PLAIN: u32 = 0x0000_0000;

/// Decoration: XOR store.
#[allow(dead_code)]
pub(crate) const DEC_XOR: u32 = 0xF000_0000;

/// Decoration: conditional store (CAST).
const DEC_CAST: u32 = 0x9000_0000;

/// Decoration: load and set one bit (LAS1).
const DEC_LAS1: u32 = 0x6000_0000;

/// Number of low bits of the CAST decoration which carry the compare value. The upper byte
/// holds the decoration itself.
pub(crate) const CAST_CMP_BITS: u32 = 24;

/// The CAST decoration for compare value `cmp`, which must fit into [`CAST_CMP_BITS`].
#[allow(dead_code)]
#[inline(always)]
pub(crate) const fn cast_decoration(cmp: u32) -> u32 {
    debug_assert!(cmp >> CAST_CMP_BITS == 0, "compare value exceeds 24 bits");
    DEC_CAST | cmp
}

/// The LAS1 decoration setting bit `bit` of a byte, LSB = 0. The decoration numbers the bits
/// big endian, from the MSB, in its bits 22..27.
#[allow(dead_code)]
#[inline(always)]
pub(crate) const fn las1_decoration(bit: u32) -> u32 {
    debug_assert!(bit < 8);
    DEC_LAS1 | ((7 - bit) << 22)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_carries_compare_value() {
        assert_eq!(cast_decoration(0), 0x9000_0000);
        assert_eq!(cast_decoration(0x00FF_FFFF), 0x90FF_FFFF);
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn cast_rejects_wide_compare_value() {
        // Bits 24..27 would corrupt the decoration field.
        cast_decoration(0x0100_0000);
    }

    #[test]
    fn las1_numbers_from_msb() {
        assert_eq!(las1_decoration(0), 0x6000_0000 | (7 << 22));
        assert_eq!(las1_decoration(7), 0x6000_0000);
    }
}
