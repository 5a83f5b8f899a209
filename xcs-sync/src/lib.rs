//! Cross-core mutual exclusion for multi-core MPC57xx microcontrollers.
//!
//! All primitives are spin based and built on the decorated storage operations of an
//! [`AtomicStorage`](xcs_common::AtomicStorage) backend. They are meant to be placed in
//! `static`s which live in memory shared by all cores and bypassing the per-core caches; the
//! placement is up to the integrator.
//!
//! - [`mutex::Mutex`], a single test-and-set lock bit.
//! - [`nested::NestedMutex`], a mutex which the owning core can re-enter.
//! - [`critical_section::IntercoreCriticalSection`], a nestable section which additionally
//!   keeps all other contexts of the calling core out.
//! - [`allocator::ResourceAllocator`], exclusive ownership of enumerated resources such as
//!   DMA channels and MCU ports.
//!
//! There is no fairness between competing cores and no timeout; callers which need to bound
//! their waiting use the non-blocking forms and build their own retry policy.

#![no_std]
#![deny(missing_docs)]

#[macro_use]
mod fmt;

pub mod allocator;
pub mod critical_section;
pub mod mutex;
pub mod nested;

pub use xcs_common;

#[cfg(feature = "defmt-03")]
use defmt_03 as defmt;

#[cfg(test)]
#[macro_use]
extern crate std;

#[inline(always)]
fn relax() {
    #[cfg(loom)]
    loom::thread::yield_now();
    #[cfg(not(loom))]
    core::hint::spin_loop();
}
