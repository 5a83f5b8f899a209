//! Core-local interrupt control.

use bitflags::bitflags;

#[cfg(feature = "defmt-03")]
use crate::defmt;

bitflags! {
    /// Snapshot of the machine state register, as far as interrupt handling is concerned.
    ///
    /// Only [`EE`](InterruptState::EE) is interpreted; all other bits are carried along
    /// unchanged so a snapshot can be written back verbatim.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InterruptState: u32 {
        /// `MSR[EE]`, processing of external interrupts is enabled.
        const EE = 1 << 15;

        const _ = !0;
    }
}

#[cfg(feature = "defmt-03")]
impl defmt::Format for InterruptState {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "InterruptState({=u32:#x})", self.bits())
    }
}

impl InterruptState {
    /// `true` if external interrupts are enabled in this snapshot.
    #[inline]
    pub const fn enabled(self) -> bool {
        self.bits() & Self::EE.bits() != 0
    }
}

/// Suspension and restoration of the external interrupt delivery on the calling core.
pub trait LocalInterrupts {
    /// Disable the delivery of external interrupts on the calling core and return the state
    /// from before. Calling this with interrupts already disabled is fine, the returned
    /// snapshot says so.
    fn suspend() -> InterruptState;

    /// Write `state` back, re-enabling interrupts if the snapshot had them enabled.
    ///
    /// # Safety
    ///
    /// `state` must come from the matching, outermost [`suspend`](LocalInterrupts::suspend)
    /// on the same core. Restoring early re-opens any critical section built on the
    /// suspension.
    unsafe fn restore(state: InterruptState);
}
