//! Storage cells for state shared between cores.
//!
//! A cell is only the *address* the [`AtomicStorage`](crate::AtomicStorage) primitives
//! operate on; it has no operations of its own apart from construction. Every cell must be
//! placed in memory that all cores can reach and that is not behind a per-core data cache.
//! That placement is a linker-script matter owned by the integrator.

#[cfg(loom)]
use loom::sync::atomic::{AtomicU32, AtomicU8};

#[cfg(not(loom))]
use portable_atomic::{AtomicU32, AtomicU8};

/// A byte in shared, uncached memory.
#[repr(transparent)]
pub struct SharedByte(AtomicU8);

/// A 32 bit word in shared, uncached memory.
#[repr(transparent)]
pub struct SharedWord(AtomicU32);

impl SharedByte {
    /// Create a new shared byte.
    #[cfg(not(loom))]
    pub const fn new(value: u8) -> Self {
        Self(AtomicU8::new(value))
    }

    /// Create a new shared byte.
    #[cfg(loom)]
    pub fn new(value: u8) -> Self {
        Self(AtomicU8::new(value))
    }

    /// The address of the byte, as handed to the decorated storage instructions.
    #[cfg(not(loom))]
    #[inline(always)]
    pub fn as_ptr(&self) -> *mut u8 {
        self.0.as_ptr()
    }

    #[allow(dead_code)]
    #[inline(always)]
    pub(crate) fn atomic(&self) -> &AtomicU8 {
        &self.0
    }
}

impl SharedWord {
    /// Create a new shared word.
    #[cfg(not(loom))]
    pub const fn new(value: u32) -> Self {
        Self(AtomicU32::new(value))
    }

    /// Create a new shared word.
    #[cfg(loom)]
    pub fn new(value: u32) -> Self {
        Self(AtomicU32::new(value))
    }

    /// The address of the word, as handed to the decorated storage instructions.
    #[cfg(not(loom))]
    #[inline(always)]
    pub fn as_ptr(&self) -> *mut u32 {
        self.0.as_ptr()
    }

    #[allow(dead_code)]
    #[inline(always)]
    pub(crate) fn atomic(&self) -> &AtomicU32 {
        &self.0
    }
}

impl core::fmt::Debug for SharedByte {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SharedByte({:#04x})", self.0.load(core::sync::atomic::Ordering::Relaxed))
    }
}

impl core::fmt::Debug for SharedWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SharedWord({:#010x})", self.0.load(core::sync::atomic::Ordering::Relaxed))
    }
}
