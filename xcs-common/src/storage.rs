//! The atomic storage contract.

use crate::cell::{SharedByte, SharedWord};

/// Atomic, cache-bypassing memory operations on shared cells, plus core identity.
///
/// Implementors are zero-sized backends; all operations are associated functions so the
/// synchronization types built on top can be `const`-constructed as statics.
///
/// ## Correctness
///
/// Every operation acts on the memory behind the given cell directly, never on a cached copy.
/// [`cmp_and_store_word`](AtomicStorage::cmp_and_store_word) intentionally does not report
/// whether it stored: the hardware keeps this information to itself, and a read back is not
/// atomic with the store. The mutex types therefore build on
/// [`set_bit_in_byte`](AtomicStorage::set_bit_in_byte), which does report the prior value.
pub trait AtomicStorage {
    /// Load a word.
    fn load_word(word: &SharedWord) -> u32;

    /// Store a word.
    fn store_word(value: u32, word: &SharedWord);

    /// Store `value` if the word currently equals `cmp`. Success is not reported.
    ///
    /// `cmp` travels in the decoration and must fit into 24 bits.
    fn cmp_and_store_word(value: u32, cmp: u32, word: &SharedWord);

    /// Load a byte.
    fn load_byte(byte: &SharedByte) -> u8;

    /// Set bit `bit` (0 is the least significant bit) and return the byte as it was before.
    fn set_bit_in_byte(bit: u32, byte: &SharedByte) -> u8;

    /// XOR the byte with `operand`.
    fn xor_byte(operand: u8, byte: &SharedByte);

    /// Full memory barrier: every memory operation issued before it completes before any
    /// issued after it.
    fn full_barrier();

    /// Zero based index of the executing core, `0..Derivative::num_cores()`.
    fn core_id() -> usize;
}
