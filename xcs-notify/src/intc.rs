//! The software set/clear interrupt registers (`INTC_SSCIRn`) of the MPC57xx INTC.

use xcs_common::Derivative;

#[cfg(feature = "defmt-03")]
use crate::defmt;

use crate::interrupt::SoftwareInterrupts;

/// Write value which sets the pending flag (`SETn`).
const SET: u8 = 0x02;
/// Write value which clears the pending flag (`CLRn`).
const CLEAR: u8 = 0x01;

/// The `INTC_SSCIRn` register block.
///
/// The registers are byte wide; reading one yields the pending flag in `CLRn`. Accesses to
/// interrupts past [`len`](Self::len) touch no register: they read as not pending and
/// writes are dropped.
#[derive(Debug)]
pub struct Intc {
    sscir: *mut u8,
    count: usize,
}

// SAFETY: The registers are shared by all cores, single byte accesses are atomic.
unsafe impl Send for Intc {}
unsafe impl Sync for Intc {}

impl Intc {
    /// The register block of `derivative`.
    ///
    /// # Safety
    ///
    /// Only valid on the given derivative.
    pub const unsafe fn for_derivative(derivative: Derivative) -> Self {
        Self {
            sscir: (derivative.intc_base() + derivative.sscir_offset()) as *mut u8,
            count: derivative.sw_interrupts(),
        }
    }

    /// The register block of the derivative selected by the crate features.
    ///
    /// # Safety
    ///
    /// The program must run on the selected derivative.
    pub const unsafe fn configured() -> Option<Self> {
        match Derivative::configured() {
            Some(d) => Some(Self::for_derivative(d)),
            None => None,
        }
    }

    /// A register block of `count` registers at `sscir`.
    ///
    /// # Safety
    ///
    /// `sscir` must point to `count` bytes which stay valid and behave like the
    /// `INTC_SSCIRn` registers.
    pub const unsafe fn from_ptr(sscir: *mut u8, count: usize) -> Self {
        Self { sscir, count }
    }

    /// Number of software settable interrupts.
    pub const fn len(&self) -> usize {
        self.count
    }

    /// `true` if there are no software settable interrupts.
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn register(&self, irq: usize) -> Option<*mut u8> {
        if irq >= self.count {
            warn!("software interrupt {} out of range", irq);
            return None;
        }
        // SAFETY: In bounds, checked above.
        Some(unsafe { self.sscir.add(irq) })
    }
}

impl SoftwareInterrupts for Intc {
    fn is_pending(&self, irq: usize) -> bool {
        // SAFETY: Valid register, see construction.
        self.register(irq).is_some_and(|r| unsafe { r.read_volatile() } != 0)
    }

    fn raise(&self, irq: usize) {
        if let Some(r) = self.register(irq) {
            // SAFETY: Valid register, see construction.
            unsafe { r.write_volatile(SET) }
        }
    }

    fn acknowledge(&self, irq: usize) {
        if let Some(r) = self.register(irq) {
            // SAFETY: Valid register, see construction.
            unsafe { r.write_volatile(CLEAR) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_addresses() {
        let intc = unsafe { Intc::for_derivative(Derivative::Mpc5748g) };
        assert_eq!(intc.len(), 24);
        assert_eq!(intc.register(0).map(|r| r as usize), Some(0xFC04_0040));
        assert_eq!(intc.register(23).map(|r| r as usize), Some(0xFC04_0057));
        assert_eq!(intc.register(24), None);

        let intc = unsafe { Intc::for_derivative(Derivative::Mpc5775b) };
        assert_eq!(intc.len(), 8);
        assert_eq!(intc.register(7).map(|r| r as usize), Some(0xFFF4_8027));
    }

    #[test]
    fn writes_set_and_clear() {
        let mut regs = [0u8; 4];
        let intc = unsafe { Intc::from_ptr(regs.as_mut_ptr(), regs.len()) };

        assert!(!intc.is_pending(2));

        intc.raise(2);
        assert!(intc.is_pending(2));

        intc.acknowledge(2);

        // A plain memory cell keeps the last write rather than clearing.
        assert_eq!(regs, [0, 0, CLEAR, 0]);
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut regs = [0u8; 3];
        let intc = unsafe { Intc::from_ptr(regs.as_mut_ptr(), 2) };

        intc.raise(2);
        assert!(!intc.is_pending(2));
        intc.acknowledge(2);

        assert_eq!(regs, [0; 3]);
    }
}
