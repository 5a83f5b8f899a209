//! A mutex which the owning core may acquire again.

use xcs_common::{AtomicStorage, LocalInterrupts, SharedWord, MAX_CORES};

use crate::mutex::Mutex;

/// A re-entrant cross-core mutex.
///
/// Each core keeps an invocation counter; the underlying [`Mutex`] is taken when the counter
/// of the calling core leaves zero and given back when it returns to zero. At most one core
/// has a non-zero counter at any time.
///
/// All contexts of one core count as the same owner. The mutex therefore does not keep a
/// preempting interrupt of the owning core out of the protected section; code which needs
/// that uses an [`IntercoreCriticalSection`](crate::critical_section::IntercoreCriticalSection)
/// or suspends the local interrupts itself. Acquisition and release themselves are safe
/// against preemption on the same core, external interrupts are briefly suspended while the
/// counter is updated.
pub struct NestedMutex<B> {
    mutex: Mutex<B>,
    depth: [SharedWord; MAX_CORES],
}

impl<B: AtomicStorage + LocalInterrupts> NestedMutex<B> {
    /// Create a new, free mutex.
    #[cfg(not(loom))]
    pub const fn new() -> Self {
        Self {
            mutex: Mutex::new(),
            depth: [const { SharedWord::new(0) }; MAX_CORES],
        }
    }

    /// Create a new, free mutex.
    #[cfg(loom)]
    pub fn new() -> Self {
        Self {
            mutex: Mutex::new(),
            depth: core::array::from_fn(|_| SharedWord::new(0)),
        }
    }

    fn counter(&self) -> &SharedWord {
        let core = B::core_id();
        debug_assert!(core < MAX_CORES, "core index {} out of range", core);
        &self.depth[core]
    }

    /// Acquire the mutex, spinning while another core holds it. Returns at once if the
    /// calling core holds it already.
    pub fn acquire(&self) {
        let state = B::suspend();

        let counter = self.counter();
        let depth = B::load_word(counter);
        if depth == 0 {
            self.mutex.acquire(true);
        }
        B::store_word(depth + 1, counter);

        // SAFETY: `state` is the snapshot taken on entry of this function.
        unsafe { B::restore(state) };
    }

    /// Undo one [`acquire`](Self::acquire) of the calling core. The mutex becomes free for
    /// the other cores once all acquisitions of the calling core have been undone.
    pub fn release(&self) {
        let state = B::suspend();

        let counter = self.counter();
        let depth = B::load_word(counter);
        debug_assert!(depth > 0, "release without matching acquire");
        let depth = depth.wrapping_sub(1);
        B::store_word(depth, counter);
        if depth == 0 {
            self.mutex.release();
        }

        // SAFETY: `state` is the snapshot taken on entry of this function.
        unsafe { B::restore(state) };
    }

    /// Acquire the mutex, run `f` and release the mutex again.
    pub fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        self.acquire();
        let r = f();
        self.release();
        r
    }

    /// How often the calling core currently holds the mutex.
    pub fn depth(&self) -> u32 {
        B::load_word(self.counter())
    }

    /// `true` if some core holds the mutex. The answer may be outdated by the time it is
    /// returned.
    pub fn is_acquired(&self) -> bool {
        self.mutex.is_acquired()
    }
}

#[cfg(not(loom))]
impl<B: AtomicStorage + LocalInterrupts> Default for NestedMutex<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> core::fmt::Debug for NestedMutex<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NestedMutex")
            .field("mutex", &self.mutex)
            .field("depth", &self.depth)
            .finish()
    }
}



#[cfg(loom)]
mod loom_tests {
    use super::NestedMutex;
    use loom::sync::Arc;
    use xcs_common::sim::{self, SimCore};

    #[test]
    fn free_only_after_matching_releases() {
        loom::model(|| {
            let m = Arc::new(NestedMutex::<SimCore>::new());

            let owner = {
                let m = m.clone();
                sim::spawn_on(0, move || {
                    m.acquire();
                    m.acquire();
                    m.release();
                    m.release();
                })
            };

            let other = {
                let m = m.clone();
                sim::spawn_on(1, move || {
                    m.acquire();
                    assert_eq!(m.depth(), 1);
                    m.release();
                })
            };

            owner.join().unwrap();
            other.join().unwrap();

            assert!(!m.is_acquired());
        });
    }
}
