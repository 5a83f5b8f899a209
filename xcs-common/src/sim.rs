//! A simulated multi-core backend for testing on the host.
//!
//! Each thread plays one execution context on a *simulated core*. The core a thread belongs
//! to is a thread local, set with [`run_on`] or [`spawn_on`]; likewise the simulated
//! `MSR[EE]` is a thread local, enabled by default. The decorated storage primitives map to
//! sequentially consistent atomics.
//!
//! Build with `RUSTFLAGS="--cfg loom"` to run the same harness under `loom`, which then
//! explores the interleavings of the simulated cores.
//!
//! Two threads must never claim the same core at the same time unless the test means to
//! model one of them preempting the other; the per-core counters of the nested primitives
//! assume that contexts of one core never run in parallel.

use crate::{
    backend::CAST_CMP_BITS,
    cell::{SharedByte, SharedWord},
    interrupt::{InterruptState, LocalInterrupts},
    storage::AtomicStorage,
    MAX_CORES,
};

#[cfg(loom)]
use loom::{
    cell::Cell,
    sync::{atomic::fence, Arc},
    thread,
};

#[cfg(not(loom))]
use core::{cell::Cell, sync::atomic::fence};
#[cfg(not(loom))]
use std::{sync::Arc, thread};

use std::vec::Vec;

use core::sync::atomic::Ordering::SeqCst;

#[cfg(loom)]
loom::thread_local! {
    static CORE_ID: Cell<usize> = Cell::new(0);
    static MSR: Cell<u32> = Cell::new(InterruptState::EE.bits());
}

#[cfg(not(loom))]
std::thread_local! {
    static CORE_ID: Cell<usize> = const { Cell::new(0) };
    static MSR: Cell<u32> = const { Cell::new(InterruptState::EE.bits()) };
}

/// The simulated core backend.
pub struct SimCore;

impl AtomicStorage for SimCore {
    fn load_word(word: &SharedWord) -> u32 {
        word.atomic().load(SeqCst)
    }

    fn store_word(value: u32, word: &SharedWord) {
        word.atomic().store(value, SeqCst)
    }

    fn cmp_and_store_word(value: u32, cmp: u32, word: &SharedWord) {
        debug_assert!(cmp >> CAST_CMP_BITS == 0, "compare value exceeds 24 bits");
        // Like the hardware, swallow the outcome.
        let _ = word.atomic().compare_exchange(cmp, value, SeqCst, SeqCst);
    }

    fn load_byte(byte: &SharedByte) -> u8 {
        byte.atomic().load(SeqCst)
    }

    fn set_bit_in_byte(bit: u32, byte: &SharedByte) -> u8 {
        debug_assert!(bit < 8);
        byte.atomic().fetch_or(1 << bit, SeqCst)
    }

    fn xor_byte(operand: u8, byte: &SharedByte) {
        byte.atomic().fetch_xor(operand, SeqCst);
    }

    fn full_barrier() {
        fence(SeqCst);
    }

    fn core_id() -> usize {
        CORE_ID.with(|id| id.get())
    }
}

impl LocalInterrupts for SimCore {
    fn suspend() -> InterruptState {
        MSR.with(|msr| {
            let prior = msr.get();
            msr.set(prior & !InterruptState::EE.bits());
            InterruptState::from_bits_retain(prior)
        })
    }

    unsafe fn restore(state: InterruptState) {
        MSR.with(|msr| {
            let kept = msr.get() & !InterruptState::EE.bits();
            msr.set(kept | (state.bits() & InterruptState::EE.bits()));
        })
    }
}

/// Run `f` on the calling thread as a context of `core`. The previous core assignment of the
/// thread is restored afterwards.
pub fn run_on<R>(core: usize, f: impl FnOnce() -> R) -> R {
    assert!(core < MAX_CORES, "simulated core {} out of range", core);

    let previous = CORE_ID.with(|id| {
        let previous = id.get();
        id.set(core);
        previous
    });
    let r = f();
    CORE_ID.with(|id| id.set(previous));
    r
}

/// Spawn a thread which runs `f` as a context of `core`.
pub fn spawn_on<F, R>(core: usize, f: F) -> thread::JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    thread::spawn(move || run_on(core, f))
}

/// Run `f` once on each of the simulated cores `0..n`, in parallel, and collect the results
/// in core order. A panic on any core is propagated.
pub fn cores<F, R>(n: usize, f: F) -> Vec<R>
where
    F: Fn(usize) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    let f = Arc::new(f);

    let handles: Vec<_> = (0..n)
        .map(|core| {
            let f = f.clone();
            spawn_on(core, move || f(core))
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
        .collect()
}

/// The core the calling thread currently plays.
pub fn current_core() -> usize {
    SimCore::core_id()
}

/// `true` if the simulated `MSR[EE]` of the calling context is set.
pub fn interrupts_enabled() -> bool {
    MSR.with(|msr| InterruptState::from_bits_retain(msr.get()).enabled())
}

/// Force the simulated `MSR[EE]` of the calling context.
pub fn set_interrupts_enabled(enabled: bool) {
    MSR.with(|msr| {
        let kept = msr.get() & !InterruptState::EE.bits();
        msr.set(if enabled {
            kept | InterruptState::EE.bits()
        } else {
            kept
        });
    })
}
