//! Hardware contract shared by the cross-core synchronization crates.
//!
//! The MPC57xx family has no ordinary compare-and-swap. What it offers instead is the
//! decorated storage controller: uncached load/store instructions with an encoded modifier
//! (plain, conditional store, load-and-set-bit, XOR) plus a full memory barrier. This crate
//! wraps that narrow primitive set behind [`AtomicStorage`], together with the core-local
//! interrupt control in [`LocalInterrupts`] and the per-derivative constants in
//! [`Derivative`].
//!
//! Two backends are provided:
//!
//! - [`backend::E200z4`], the real decorated storage instructions (PowerPC targets with one of
//!   the derivative features enabled).
//! - [`sim::SimCore`], ordinary atomics plus thread-tagged core identities for host testing
//!   (`std` feature, or `--cfg loom` for model checking).

#![no_std]
#![deny(missing_docs)]
#![cfg_attr(decorated_storage, feature(asm_experimental_arch))]

#[cfg(any(test, feature = "std", loom))]
#[macro_use]
extern crate std;

#[cfg(feature = "defmt-03")]
use defmt_03 as defmt;

pub mod backend;
pub mod cell;
pub mod derivative;
pub mod interrupt;
#[cfg(any(test, feature = "std", loom))]
pub mod sim;
pub mod storage;

pub use cell::{SharedByte, SharedWord};
pub use derivative::Derivative;
pub use interrupt::{InterruptState, LocalInterrupts};
pub use storage::AtomicStorage;

/// The largest number of cores of any supported derivative. Per-core bookkeeping is sized by
/// this constant.
pub const MAX_CORES: usize = 3;
