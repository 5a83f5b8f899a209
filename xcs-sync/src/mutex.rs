//! A single-bit, test-and-set spin lock shared between cores.
//!
//! Example usage:
//!
//! ```rust
//! use xcs_common::sim::SimCore;
//! use xcs_sync::mutex::Mutex;
//!
//! static MUTEX: Mutex<SimCore> = Mutex::new();
//!
//! if MUTEX.try_acquire() {
//!     // Exclusive access to whatever the mutex guards.
//!     MUTEX.release();
//! }
//!
//! let sum = MUTEX.with(|| 1 + 1);
//! assert_eq!(sum, 2);
//! ```

use core::marker::PhantomData;

use xcs_common::{AtomicStorage, SharedByte};

/// The lock bit in the mutex byte.
const LOCKED: u8 = 0x01;

/// A cross-core mutex.
///
/// The mutex is not re-entrant and knows nothing about its owner: a second acquisition by
/// the owner deadlocks and a release by anyone else corrupts the lock. See
/// [`NestedMutex`](crate::nested::NestedMutex) for the re-entrant variant.
pub struct Mutex<B> {
    lock: SharedByte,
    _backend: PhantomData<fn() -> B>,
}

impl<B: AtomicStorage> Mutex<B> {
    /// Create a new, free mutex.
    #[cfg(not(loom))]
    pub const fn new() -> Self {
        Self {
            lock: SharedByte::new(0),
            _backend: PhantomData,
        }
    }

    /// Create a new, free mutex.
    #[cfg(loom)]
    pub fn new() -> Self {
        Self {
            lock: SharedByte::new(0),
            _backend: PhantomData,
        }
    }

    /// Create a mutex which is already acquired, e.g. to block other cores until the owner
    /// has finished its start-up.
    #[cfg(not(loom))]
    pub const fn new_acquired() -> Self {
        Self {
            lock: SharedByte::new(LOCKED),
            _backend: PhantomData,
        }
    }

    /// Create a mutex which is already acquired, e.g. to block other cores until the owner
    /// has finished its start-up.
    #[cfg(loom)]
    pub fn new_acquired() -> Self {
        Self {
            lock: SharedByte::new(LOCKED),
            _backend: PhantomData,
        }
    }

    /// Try to acquire the mutex, without waiting. Returns `true` on success.
    #[inline]
    pub fn try_acquire(&self) -> bool {
        if B::set_bit_in_byte(0, &self.lock) & LOCKED == 0 {
            // Nothing done inside the section may complete before the lock is held.
            B::full_barrier();
            true
        } else {
            false
        }
    }

    /// Acquire the mutex. With `wait` set, spin until the mutex is ours; the result is
    /// `true` then. Without, this is a single [`try_acquire`](Self::try_acquire).
    pub fn acquire(&self, wait: bool) -> bool {
        loop {
            if self.try_acquire() {
                return true;
            }

            if !wait {
                return false;
            }

            crate::relax();
        }
    }

    /// Release the mutex. Only the current owner may call this.
    #[inline]
    pub fn release(&self) {
        debug_assert!(self.is_acquired(), "release of a free mutex");

        // Everything done inside the section completes before the lock is dropped.
        B::full_barrier();
        B::xor_byte(LOCKED, &self.lock);
    }

    /// `true` if some core holds the mutex. The answer may be outdated by the time it is
    /// returned.
    #[inline]
    pub fn is_acquired(&self) -> bool {
        B::load_byte(&self.lock) & LOCKED != 0
    }

    /// Spin until the mutex is acquired, run `f` and release the mutex again.
    pub fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        self.acquire(true);
        let r = f();
        self.release();
        r
    }
}

#[cfg(not(loom))]
impl<B: AtomicStorage> Default for Mutex<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> core::fmt::Debug for Mutex<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Mutex").field("lock", &self.lock).finish()
    }
}



#[cfg(loom)]
mod loom_tests {
    use super::Mutex;
    use loom::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use xcs_common::sim::{self, SimCore};

    struct Data(loom::cell::UnsafeCell<u32>);

    unsafe impl Sync for Data {}

    #[test]
    fn at_most_one_winner() {
        loom::model(|| {
            let m = Arc::new(Mutex::<SimCore>::new());
            let wins = Arc::new(AtomicUsize::new(0));

            let handles: std::vec::Vec<_> = (0..2)
                .map(|core| {
                    let m = m.clone();
                    let wins = wins.clone();
                    sim::spawn_on(core, move || {
                        if m.try_acquire() {
                            wins.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }

            assert_eq!(wins.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn exclusive_section() {
        loom::model(|| {
            let m = Arc::new(Mutex::<SimCore>::new());
            let data = Arc::new(Data(loom::cell::UnsafeCell::new(0)));

            let handles: std::vec::Vec<_> = (0..2)
                .map(|core| {
                    let m = m.clone();
                    let data = data.clone();
                    sim::spawn_on(core, move || {
                        m.with(|| data.0.with_mut(|d| unsafe { *d += 1 }));
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }

            assert_eq!(data.0.with(|d| unsafe { *d }), 2);
        });
    }
}
