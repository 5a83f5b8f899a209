//! The decorated storage controller of the e200z4/e200z7 cores.
//!
//! Decorated loads and stores take the decoration in `rA` and the address in `rB`. The
//! decoration register must not be `r0`, which the instructions would read as literal zero.

use core::arch::asm;

use super::{cast_decoration, las1_decoration, DEC_PLAIN, DEC_XOR};
use crate::{
    cell::{SharedByte, SharedWord},
    interrupt::{InterruptState, LocalInterrupts},
    storage::AtomicStorage,
};

/// Backend for the MPC57xx application cores.
pub struct E200z4;

impl AtomicStorage for E200z4 {
    #[inline(always)]
    fn load_word(word: &SharedWord) -> u32 {
        let value: u32;
        unsafe {
            asm!(
                "lwdcbx {0}, {1}, {2}",
                out(reg) value,
                in(reg_nonzero) DEC_PLAIN,
                in(reg) word.as_ptr(),
                options(nostack, preserves_flags),
            );
        }
        value
    }

    #[inline(always)]
    fn store_word(value: u32, word: &SharedWord) {
        unsafe {
            asm!(
                "stwdcbx {0}, {1}, {2}",
                in(reg) value,
                in(reg_nonzero) DEC_PLAIN,
                in(reg) word.as_ptr(),
                options(nostack, preserves_flags),
            );
        }
    }

    #[inline(always)]
    fn cmp_and_store_word(value: u32, cmp: u32, word: &SharedWord) {
        // The compare operand shares the register with the decoration.
        let decoration = cast_decoration(cmp);
        unsafe {
            asm!(
                "stwdcbx {0}, {1}, {2}",
                in(reg) value,
                in(reg_nonzero) decoration,
                in(reg) word.as_ptr(),
                options(nostack, preserves_flags),
            );
        }
    }

    #[inline(always)]
    fn load_byte(byte: &SharedByte) -> u8 {
        let value: u32;
        unsafe {
            asm!(
                "lbdcbx {0}, {1}, {2}",
                out(reg) value,
                in(reg_nonzero) DEC_PLAIN,
                in(reg) byte.as_ptr(),
                options(nostack, preserves_flags),
            );
        }
        value as u8
    }

    #[inline(always)]
    fn set_bit_in_byte(bit: u32, byte: &SharedByte) -> u8 {
        let decoration = las1_decoration(bit);
        let prior: u32;
        unsafe {
            asm!(
                "lbdcbx {0}, {1}, {2}",
                out(reg) prior,
                in(reg_nonzero) decoration,
                in(reg) byte.as_ptr(),
                options(nostack, preserves_flags),
            );
        }
        prior as u8
    }

    #[inline(always)]
    fn xor_byte(operand: u8, byte: &SharedByte) {
        unsafe {
            asm!(
                "stbdcbx {0}, {1}, {2}",
                in(reg) operand as u32,
                in(reg_nonzero) DEC_XOR,
                in(reg) byte.as_ptr(),
                options(nostack, preserves_flags),
            );
        }
    }

    #[inline(always)]
    fn full_barrier() {
        unsafe { asm!("msync", options(nostack, preserves_flags)) };
    }

    #[inline(always)]
    fn core_id() -> usize {
        let pir: u32;
        // SPR 286 is PIR, the processor ID register.
        unsafe { asm!("mfspr {0}, 286", out(reg) pir, options(nomem, nostack, preserves_flags)) };
        pir as usize
    }
}

impl LocalInterrupts for E200z4 {
    #[inline(always)]
    fn suspend() -> InterruptState {
        let msr: u32;
        unsafe {
            asm!(
                "mfmsr {0}",
                "wrteei 0",
                out(reg) msr,
                options(nostack, preserves_flags),
            );
        }
        InterruptState::from_bits_retain(msr)
    }

    #[inline(always)]
    unsafe fn restore(state: InterruptState) {
        // wrtee only transfers MSR[EE], the other bits are left alone.
        unsafe { asm!("wrtee {0}", in(reg) state.bits(), options(nostack, preserves_flags)) };
    }
}
