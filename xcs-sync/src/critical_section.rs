//! A nestable critical section spanning all cores.
//!
//! A context inside the section is the only one on all cores inside it: contexts on the
//! calling core are kept out by suspending the external interrupts, contexts on the other
//! cores spin in [`enter`](IntercoreCriticalSection::enter) until the section is left.
//!
//! Example usage:
//!
//! ```rust
//! use xcs_common::sim::SimCore;
//! use xcs_sync::critical_section::IntercoreCriticalSection;
//!
//! static CS: IntercoreCriticalSection<SimCore> = IntercoreCriticalSection::new();
//!
//! CS.enter();
//! CS.with(|| {
//!     // Nested, interrupts stay suspended until the outermost `leave`.
//! });
//! CS.leave();
//! ```
//!
//! Holding two different sections at a time is not supported and generally deadlocks.

use xcs_common::{AtomicStorage, InterruptState, LocalInterrupts, SharedWord, MAX_CORES};

use crate::mutex::Mutex;

#[cfg(feature = "critical-section-impl")]
#[doc(hidden)]
pub use ::critical_section;

/// A cross-core critical section.
///
/// Entering suspends the external interrupts of the calling core. The interrupt state from
/// before the outermost [`enter`](Self::enter) is kept in the section and put back by the
/// matching outermost [`leave`](Self::leave); nested pairs leave the interrupts suspended.
///
/// The section suspends all local interrupt processing while spinning for and while holding
/// it. Keep it short.
pub struct IntercoreCriticalSection<B> {
    mutex: Mutex<B>,
    depth: [SharedWord; MAX_CORES],
    saved: SharedWord,
}

impl<B: AtomicStorage + LocalInterrupts> IntercoreCriticalSection<B> {
    /// Create a new critical section, not entered by anyone.
    #[cfg(not(loom))]
    pub const fn new() -> Self {
        Self {
            mutex: Mutex::new(),
            depth: [const { SharedWord::new(0) }; MAX_CORES],
            saved: SharedWord::new(0),
        }
    }

    /// Create a new critical section, not entered by anyone.
    #[cfg(loom)]
    pub fn new() -> Self {
        Self {
            mutex: Mutex::new(),
            depth: core::array::from_fn(|_| SharedWord::new(0)),
            saved: SharedWord::new(0),
        }
    }

    fn counter(&self) -> &SharedWord {
        let core = B::core_id();
        debug_assert!(core < MAX_CORES, "core index {} out of range", core);
        &self.depth[core]
    }

    /// Enter the critical section, spinning while another core is inside. Returns at once if
    /// the calling core is inside already.
    ///
    /// Returns the new nesting depth of the calling core; `1` for the outermost entry.
    pub fn enter(&self) -> u32 {
        let state = B::suspend();

        // The counter belongs to this core and interrupts are off, so nobody races us on it.
        let counter = self.counter();
        let depth = B::load_word(counter);
        if depth == 0 {
            self.mutex.acquire(true);
            B::store_word(state.bits(), &self.saved);
        }
        B::store_word(depth + 1, counter);

        depth + 1
    }

    /// Leave the critical section. The outermost `leave` opens the section for the other
    /// cores and restores the interrupt state from before the outermost
    /// [`enter`](Self::enter).
    ///
    /// Returns the remaining nesting depth of the calling core.
    pub fn leave(&self) -> u32 {
        let counter = self.counter();
        let depth = B::load_word(counter);
        debug_assert!(depth > 0, "leave without matching enter");
        let depth = depth.wrapping_sub(1);
        B::store_word(depth, counter);

        if depth == 0 {
            // Read before release, the next owner overwrites it.
            let state = InterruptState::from_bits_retain(B::load_word(&self.saved));
            self.mutex.release();

            // SAFETY: `state` was captured by the outermost `enter` of this core.
            unsafe { B::restore(state) };
        }

        depth
    }

    /// Run `f` inside the critical section.
    pub fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        self.enter();
        let r = f();
        self.leave();
        r
    }

    /// Nesting depth of the calling core; `0` if it is not inside the section.
    pub fn depth(&self) -> u32 {
        B::load_word(self.counter())
    }

    /// `true` if some core is inside the section. The answer may be outdated by the time it
    /// is returned.
    pub fn is_entered(&self) -> bool {
        self.mutex.is_acquired()
    }
}

#[cfg(not(loom))]
impl<B: AtomicStorage + LocalInterrupts> Default for IntercoreCriticalSection<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> core::fmt::Debug for IntercoreCriticalSection<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IntercoreCriticalSection")
            .field("mutex", &self.mutex)
            .field("depth", &self.depth)
            .field("saved", &self.saved)
            .finish()
    }
}

/// Bind a `static` [`IntercoreCriticalSection`] as the global `critical_section`
/// implementation, making every `critical_section::with` in the program a cross-core
/// critical section.
///
/// ```ignore
/// use xcs_common::backend::E200z4;
/// use xcs_sync::critical_section::IntercoreCriticalSection;
///
/// static SECTION: IntercoreCriticalSection<E200z4> = IntercoreCriticalSection::new();
///
/// xcs_sync::set_critical_section_impl!(SECTION);
/// ```
#[cfg(feature = "critical-section-impl")]
#[macro_export]
macro_rules! set_critical_section_impl {
    ($section:path) => {
        struct XcsCriticalSection;
        $crate::critical_section::critical_section::set_impl!(XcsCriticalSection);

        unsafe impl $crate::critical_section::critical_section::Impl for XcsCriticalSection {
            unsafe fn acquire() -> bool {
                // Nested acquisitions report `true` and are not released individually.
                if $section.depth() > 0 {
                    true
                } else {
                    $section.enter();
                    false
                }
            }

            unsafe fn release(nested_cs: bool) {
                if !nested_cs {
                    $section.leave();
                }
            }
        }
    };
}

#[cfg(test)]
#[cfg(not(loom))]
mod tests {
    use super::*;
    use xcs_common::sim::{self, SimCore};

    #[test]
    fn nested_enter_restores_first_state() {
        let cs = IntercoreCriticalSection::<SimCore>::new();

        assert!(sim::interrupts_enabled());

        assert_eq!(cs.enter(), 1);
        assert!(!sim::interrupts_enabled());

        // Whatever the nested pair sees in between must not leak out.
        sim::set_interrupts_enabled(true);
        assert_eq!(cs.enter(), 2);
        assert!(!sim::interrupts_enabled());
        assert_eq!(cs.leave(), 1);
        assert!(!sim::interrupts_enabled());

        assert_eq!(cs.leave(), 0);
        assert!(sim::interrupts_enabled());
        assert!(!cs.is_entered());
    }

    #[test]
    fn disabled_stays_disabled() {
        let cs = IntercoreCriticalSection::<SimCore>::new();

        sim::set_interrupts_enabled(false);
        cs.with(|| cs.with(|| assert_eq!(cs.depth(), 2)));
        assert!(!sim::interrupts_enabled());

        sim::set_interrupts_enabled(true);
        cs.with(|| assert!(!sim::interrupts_enabled()));
        assert!(sim::interrupts_enabled());
    }

    #[test]
    fn other_core_kept_out() {
        static CS: IntercoreCriticalSection<SimCore> = IntercoreCriticalSection::new();

        CS.enter();
        let h = sim::spawn_on(2, || CS.mutex.try_acquire());
        assert!(!h.join().unwrap());
        CS.leave();

        let h = sim::spawn_on(2, || {
            let depth = CS.with(|| CS.depth());
            (depth, sim::interrupts_enabled())
        });
        assert_eq!(h.join().unwrap(), (1, true));
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn unmatched_leave() {
        let cs = IntercoreCriticalSection::<SimCore>::new();
        cs.leave();
    }
}

#[cfg(test)]
#[cfg(not(loom))]
mod stress_test {
    use super::IntercoreCriticalSection;
    use core::sync::atomic::{AtomicU32, Ordering};
    use xcs_common::{sim, sim::SimCore, MAX_CORES};

    #[test]
    fn stress_critical_section() {
        const NUM_RUNS: u32 = 5_000;

        static CS: IntercoreCriticalSection<SimCore> = IntercoreCriticalSection::new();
        static COUNT: AtomicU32 = AtomicU32::new(0);

        let enabled = sim::cores(MAX_CORES, |core| {
            // Core 1 runs with interrupts off throughout.
            sim::set_interrupts_enabled(core != 1);

            for _ in 0..NUM_RUNS {
                CS.with(|| {
                    assert!(!sim::interrupts_enabled());
                    let c = COUNT.load(Ordering::Relaxed);
                    COUNT.store(c + 1, Ordering::Relaxed);
                });
            }

            sim::interrupts_enabled()
        });

        assert_eq!(enabled, [true, false, true]);
        assert_eq!(COUNT.load(Ordering::Relaxed), NUM_RUNS * MAX_CORES as u32);
    }
}

#[cfg(loom)]
mod loom_tests {
    use super::IntercoreCriticalSection;
    use loom::sync::Arc;
    use xcs_common::sim::{self, SimCore};

    #[test]
    fn saved_state_is_per_owner() {
        loom::model(|| {
            let cs = Arc::new(IntercoreCriticalSection::<SimCore>::new());

            let handles: std::vec::Vec<_> = [true, false]
                .into_iter()
                .enumerate()
                .map(|(core, enabled)| {
                    let cs = cs.clone();
                    sim::spawn_on(core, move || {
                        sim::set_interrupts_enabled(enabled);
                        cs.with(|| cs.with(|| ()));
                        sim::interrupts_enabled()
                    })
                })
                .collect();

            let after: std::vec::Vec<bool> =
                handles.into_iter().map(|h| h.join().unwrap()).collect();

            assert_eq!(after, [true, false]);
        });
    }
}
