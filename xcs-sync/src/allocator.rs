//! Exclusive allocation of enumerated hardware resources.
//!
//! A [`ResourceAllocator`] records, for each resource of a fixed set, whether it is in use.
//! It does not record *who* uses it: the caller that got a resource is responsible for giving
//! it back. [`DmaChannels`] and [`Ports`] are the two instances the MPC57xx drivers need; they
//! only differ in how a resource is mapped to an index.

use xcs_common::{AtomicStorage, Derivative, LocalInterrupts, SharedWord};

use crate::critical_section::IntercoreCriticalSection;

#[cfg(feature = "defmt-03")]
use crate::defmt;

const BITS_PER_WORD: usize = u32::BITS as usize;

/// The number of words a bit vector for `capacity` resources needs.
pub const fn words_for(capacity: usize) -> usize {
    capacity.div_ceil(BITS_PER_WORD)
}

/// An allocation table for up to `WORDS * 32` resources, safe to use from all cores.
///
/// ```rust
/// use xcs_common::sim::SimCore;
/// use xcs_sync::allocator::ResourceAllocator;
///
/// static TABLE: ResourceAllocator<SimCore, 1> = ResourceAllocator::new(8);
///
/// assert!(TABLE.acquire(3));
/// assert!(!TABLE.acquire(3));
/// assert!(!TABLE.is_available(3));
///
/// TABLE.release(3);
/// assert!(TABLE.is_available(3));
/// ```
pub struct ResourceAllocator<B, const WORDS: usize> {
    section: IntercoreCriticalSection<B>,
    in_use: [SharedWord; WORDS],
    capacity: usize,
}

#[inline]
fn locate(index: usize) -> (usize, u32) {
    (index / BITS_PER_WORD, 1 << (index % BITS_PER_WORD))
}

impl<B: AtomicStorage + LocalInterrupts, const WORDS: usize> ResourceAllocator<B, WORDS> {
    /// Create an allocator for the resources `0..capacity`, all of them available.
    ///
    /// # Panics
    ///
    /// If `capacity` exceeds `WORDS * 32`. In a `static` this is a compile time error.
    #[cfg(not(loom))]
    pub const fn new(capacity: usize) -> Self {
        assert!(capacity <= WORDS * BITS_PER_WORD, "capacity exceeds the bit vector");

        Self {
            section: IntercoreCriticalSection::new(),
            in_use: [const { SharedWord::new(0) }; WORDS],
            capacity,
        }
    }

    /// Create an allocator for the resources `0..capacity`, all of them available.
    ///
    /// # Panics
    ///
    /// If `capacity` exceeds `WORDS * 32`.
    #[cfg(loom)]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity <= WORDS * BITS_PER_WORD, "capacity exceeds the bit vector");

        Self {
            section: IntercoreCriticalSection::new(),
            in_use: core::array::from_fn(|_| SharedWord::new(0)),
            capacity,
        }
    }

    /// Number of managed resources.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Try to get resource `index`. Returns `false` if it is in use or if there is no such
    /// resource.
    pub fn acquire(&self, index: usize) -> bool {
        if index >= self.capacity {
            warn!("resource {} out of range", index);
            return false;
        }

        let (word, mask) = locate(index);
        let word = &self.in_use[word];

        self.section.with(|| {
            let bits = B::load_word(word);
            if bits & mask == 0 {
                B::store_word(bits | mask, word);
                true
            } else {
                false
            }
        })
    }

    /// `true` if resource `index` exists and is not in use.
    ///
    /// The answer is advisory: another core may take the resource right after.
    pub fn is_available(&self, index: usize) -> bool {
        if index >= self.capacity {
            return false;
        }

        let (word, mask) = locate(index);
        B::load_word(&self.in_use[word]) & mask == 0
    }

    /// Give resource `index` back. Only the holder of the resource may call this.
    pub fn release(&self, index: usize) {
        debug_assert!(index < self.capacity, "resource {} out of range", index);
        if index >= self.capacity {
            warn!("resource {} out of range", index);
            return;
        }

        let (word, mask) = locate(index);
        let word = &self.in_use[word];

        self.section.with(|| {
            let bits = B::load_word(word);
            let held = bits & mask != 0;
            if !held {
                warn!("release of free resource {}", index);
            }
            debug_assert!(held, "release of free resource {}", index);
            B::store_word(bits & !mask, word);
        });
    }

    /// Mark all resources available again, as after construction.
    pub fn reset(&self) {
        self.section.with(|| {
            for word in &self.in_use {
                B::store_word(0, word);
            }
        });
    }
}

impl<B, const WORDS: usize> core::fmt::Debug for ResourceAllocator<B, WORDS> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResourceAllocator")
            .field("capacity", &self.capacity)
            .field("in_use", &self.in_use)
            .finish()
    }
}

/// Number of bit vector words for the DMA channels of the largest derivative.
pub const DMA_CHANNEL_WORDS: usize = words_for(128);

/// Number of bit vector words for the ports of the largest derivative.
pub const PORT_WORDS: usize = words_for(416);

/// Allocation of the channels of all eDMA devices.
///
/// A channel is named by its device and its index on that device.
pub struct DmaChannels<B, const WORDS: usize = DMA_CHANNEL_WORDS> {
    table: ResourceAllocator<B, WORDS>,
    devices: usize,
    channels_per_device: usize,
}

impl<B: AtomicStorage + LocalInterrupts, const WORDS: usize> DmaChannels<B, WORDS> {
    /// Channel allocation for `devices` eDMA devices of `channels_per_device` channels each.
    #[cfg(not(loom))]
    pub const fn new(devices: usize, channels_per_device: usize) -> Self {
        Self {
            table: ResourceAllocator::new(devices * channels_per_device),
            devices,
            channels_per_device,
        }
    }

    /// Channel allocation for `devices` eDMA devices of `channels_per_device` channels each.
    #[cfg(loom)]
    pub fn new(devices: usize, channels_per_device: usize) -> Self {
        Self {
            table: ResourceAllocator::new(devices * channels_per_device),
            devices,
            channels_per_device,
        }
    }

    /// Channel allocation for the eDMA devices of `derivative`.
    #[cfg(not(loom))]
    pub const fn for_derivative(derivative: Derivative) -> Self {
        Self::new(
            derivative.dma_devices(),
            derivative.dma_channels_per_device(),
        )
    }

    fn index(&self, device: usize, channel: usize) -> Option<usize> {
        if device < self.devices && channel < self.channels_per_device {
            Some(device * self.channels_per_device + channel)
        } else {
            warn!("DMA channel {}.{} out of range", device, channel);
            None
        }
    }

    /// Try to get channel `channel` of eDMA device `device`.
    pub fn acquire(&self, device: usize, channel: usize) -> bool {
        self.index(device, channel)
            .is_some_and(|index| self.table.acquire(index))
    }

    /// `true` if the channel exists and is not in use. Advisory only.
    pub fn is_available(&self, device: usize, channel: usize) -> bool {
        device < self.devices
            && channel < self.channels_per_device
            && self
                .table
                .is_available(device * self.channels_per_device + channel)
    }

    /// Give a channel back.
    pub fn release(&self, device: usize, channel: usize) {
        if let Some(index) = self.index(device, channel) {
            self.table.release(index);
        }
    }

    /// Number of eDMA devices.
    pub const fn devices(&self) -> usize {
        self.devices
    }

    /// Number of channels per eDMA device.
    pub const fn channels_per_device(&self) -> usize {
        self.channels_per_device
    }

    /// The underlying allocation table, indexed by `device * channels_per_device + channel`.
    pub fn table(&self) -> &ResourceAllocator<B, WORDS> {
        &self.table
    }
}

/// Allocation of the MCU ports (pads), by their flat index.
pub struct Ports<B, const WORDS: usize = PORT_WORDS> {
    table: ResourceAllocator<B, WORDS>,
}

impl<B: AtomicStorage + LocalInterrupts, const WORDS: usize> Ports<B, WORDS> {
    /// Allocation for `count` ports.
    #[cfg(not(loom))]
    pub const fn new(count: usize) -> Self {
        Self {
            table: ResourceAllocator::new(count),
        }
    }

    /// Allocation for `count` ports.
    #[cfg(loom)]
    pub fn new(count: usize) -> Self {
        Self {
            table: ResourceAllocator::new(count),
        }
    }

    /// Allocation for the ports of `derivative`.
    #[cfg(not(loom))]
    pub const fn for_derivative(derivative: Derivative) -> Self {
        Self::new(derivative.num_ports())
    }

    /// Try to get port `port`.
    pub fn acquire(&self, port: usize) -> bool {
        self.table.acquire(port)
    }

    /// `true` if the port exists and is not in use. Advisory only.
    pub fn is_available(&self, port: usize) -> bool {
        self.table.is_available(port)
    }

    /// Give a port back.
    pub fn release(&self, port: usize) {
        self.table.release(port)
    }

    /// Number of ports.
    pub const fn count(&self) -> usize {
        self.table.capacity()
    }
}

#[cfg(test)]
#[cfg(not(loom))]
mod tests {
    use super::*;
    use xcs_common::sim::{self, SimCore};

    #[test]
    fn capacity_eight() {
        let a = ResourceAllocator::<SimCore, 1>::new(8);

        for i in 0..8 {
            assert!(a.acquire(i), "resource {}", i);
        }

        assert!(!a.acquire(3));
        assert!(!a.acquire(8));
        assert!(!a.is_available(8));

        a.release(3);
        assert!(a.is_available(3));
        assert!(a.acquire(3));
    }

    #[test]
    fn spans_words() {
        let a = ResourceAllocator::<SimCore, 3>::new(70);

        assert!(a.acquire(31));
        assert!(a.acquire(32));
        assert!(a.acquire(69));
        assert!(!a.acquire(70));

        assert!(a.is_available(30));
        assert!(a.is_available(33));
        assert!(!a.is_available(32));

        assert_eq!(SimCore::load_word(&a.in_use[0]), 1 << 31);
        assert_eq!(SimCore::load_word(&a.in_use[1]), 1);
        assert_eq!(SimCore::load_word(&a.in_use[2]), 1 << 5);
    }

    #[test]
    fn round_trip_restores_bits() {
        let a = ResourceAllocator::<SimCore, 1>::new(32);
        assert!(a.acquire(1));

        let before = SimCore::load_word(&a.in_use[0]);
        assert!(a.acquire(17));
        a.release(17);

        assert_eq!(SimCore::load_word(&a.in_use[0]), before);
    }

    #[test]
    fn reset_frees_all() {
        let a = ResourceAllocator::<SimCore, 2>::new(40);
        for i in 0..40 {
            assert!(a.acquire(i));
        }

        a.reset();

        assert!((0..40).all(|i| a.is_available(i)));
    }

    #[test]
    fn interrupts_restored() {
        let a = ResourceAllocator::<SimCore, 1>::new(4);

        assert!(a.acquire(0));
        assert!(sim::interrupts_enabled());
        a.release(0);
        assert!(sim::interrupts_enabled());
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn over_release() {
        let a = ResourceAllocator::<SimCore, 1>::new(4);
        a.release(2);
    }

    #[test]
    fn dma_channel_mapping() {
        let dma = DmaChannels::<SimCore>::for_derivative(Derivative::Mpc5775b);

        assert_eq!(dma.devices(), 2);
        assert_eq!(dma.channels_per_device(), 64);
        assert_eq!(dma.table().capacity(), 128);

        assert!(dma.acquire(1, 3));
        assert!(!dma.table().is_available(67));
        assert!(dma.table().is_available(3));
        assert!(!dma.acquire(1, 3));
        assert!(dma.acquire(0, 3));

        assert!(!dma.acquire(2, 0));
        assert!(!dma.acquire(0, 64));
        assert!(!dma.is_available(0, 64));

        dma.release(1, 3);
        assert!(dma.is_available(1, 3));
    }

    #[test]
    fn single_dma_device() {
        let dma = DmaChannels::<SimCore>::for_derivative(Derivative::Mpc5748g);

        assert_eq!(dma.table().capacity(), 32);
        assert!(dma.acquire(0, 31));
        assert!(!dma.acquire(1, 0));
    }

    #[test]
    fn ports() {
        static PORTS: Ports<SimCore> = Ports::for_derivative(Derivative::Mpc5748g);

        assert_eq!(PORTS.count(), 264);
        assert!(PORTS.acquire(263));
        assert!(!PORTS.acquire(264));

        let h = sim::spawn_on(1, || PORTS.acquire(263));
        assert!(!h.join().unwrap());

        PORTS.release(263);
        let h = sim::spawn_on(1, || PORTS.acquire(263));
        assert!(h.join().unwrap());
    }
}

#[cfg(test)]
#[cfg(not(loom))]
mod stress_test {
    use super::ResourceAllocator;
    use core::sync::atomic::{AtomicU32, Ordering};
    use xcs_common::{sim, sim::SimCore, MAX_CORES};

    #[test]
    fn stress_allocator() {
        const NUM_RUNS: usize = 2_000;
        const RESOURCES: usize = 40;

        static TABLE: ResourceAllocator<SimCore, 2> = ResourceAllocator::new(RESOURCES);
        static HELD: [AtomicU32; RESOURCES] = [const { AtomicU32::new(0) }; RESOURCES];

        sim::cores(MAX_CORES, |core| {
            for i in 0..NUM_RUNS {
                let r = (i * 7 + core) % RESOURCES;
                if TABLE.acquire(r) {
                    assert_eq!(HELD[r].fetch_add(1, Ordering::SeqCst), 0);
                    HELD[r].fetch_sub(1, Ordering::SeqCst);
                    TABLE.release(r);
                }
            }
        });

        assert!((0..RESOURCES).all(|r| TABLE.is_available(r)));
    }
}

#[cfg(loom)]
mod loom_tests {
    use super::ResourceAllocator;
    use loom::sync::Arc;
    use xcs_common::sim::{self, SimCore};

    #[test]
    fn single_owner() {
        loom::model(|| {
            let a = Arc::new(ResourceAllocator::<SimCore, 1>::new(2));

            let handles: std::vec::Vec<_> = (0..2)
                .map(|core| {
                    let a = a.clone();
                    sim::spawn_on(core, move || a.acquire(1))
                })
                .collect();

            let won = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|&won| won)
                .count();

            assert_eq!(won, 1);
            assert!(a.is_available(0));
        });
    }
}
