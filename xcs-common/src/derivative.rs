//! Per-derivative constants.

#[cfg(feature = "defmt-03")]
use crate::defmt;

/// The supported MCU derivatives.
///
/// The generic algorithms never look at the derivative themselves; they are handed the
/// numbers below once at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Derivative {
    /// MPC5748G: two e200z4 cores and one e200z2 core.
    Mpc5748g,
    /// MPC5775B/E: two e200z7 cores.
    Mpc5775b,
}

impl Derivative {
    /// The derivative selected by the `mpc5748g`/`mpc5775b` features, if any.
    pub const fn configured() -> Option<Self> {
        if cfg!(feature = "mpc5748g") {
            Some(Self::Mpc5748g)
        } else if cfg!(feature = "mpc5775b") {
            Some(Self::Mpc5775b)
        } else {
            None
        }
    }

    /// Number of cores which take part in the cross-core protocols.
    pub const fn num_cores(self) -> usize {
        match self {
            Self::Mpc5748g => 3,
            Self::Mpc5775b => 2,
        }
    }

    /// Number of eDMA devices.
    pub const fn dma_devices(self) -> usize {
        match self {
            Self::Mpc5748g => 1,
            Self::Mpc5775b => 2,
        }
    }

    /// Number of channels of each eDMA device.
    pub const fn dma_channels_per_device(self) -> usize {
        match self {
            Self::Mpc5748g => 32,
            Self::Mpc5775b => 64,
        }
    }

    /// Total number of DMA channels, across all devices.
    pub const fn dma_channels(self) -> usize {
        self.dma_devices() * self.dma_channels_per_device()
    }

    /// Number of arbitrated MCU ports (pads).
    ///
    /// For the MPC5775B the device header claims 512 configuration registers while the
    /// reference manual documents 416 ports; the smaller number is used.
    pub const fn num_ports(self) -> usize {
        match self {
            Self::Mpc5748g => 264,
            Self::Mpc5775b => 416,
        }
    }

    /// Number of software settable interrupts of the interrupt controller.
    pub const fn sw_interrupts(self) -> usize {
        match self {
            Self::Mpc5748g => 24,
            Self::Mpc5775b => 8,
        }
    }

    /// Vector number of the first software settable interrupt; the others follow gapless.
    pub const fn first_sw_interrupt_vector(self) -> usize {
        0
    }

    /// Base address of the interrupt controller's register file.
    pub const fn intc_base(self) -> usize {
        match self {
            Self::Mpc5748g => 0xFC04_0000,
            Self::Mpc5775b => 0xFFF4_8000,
        }
    }

    /// Offset of the first software set/clear interrupt register (`INTC_SSCIR0`) in the
    /// interrupt controller's register file. The registers are byte wide and gapless.
    pub const fn sscir_offset(self) -> usize {
        match self {
            Self::Mpc5748g => 0x40,
            Self::Mpc5775b => 0x20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_count_fits_bookkeeping() {
        for d in [Derivative::Mpc5748g, Derivative::Mpc5775b] {
            assert!(d.num_cores() <= crate::MAX_CORES);
            assert!(d.num_cores() > 0);
        }
    }

    #[test]
    fn dma_channel_totals() {
        assert_eq!(Derivative::Mpc5748g.dma_channels(), 32);
        assert_eq!(Derivative::Mpc5775b.dma_channels(), 128);
    }

    #[test]
    fn no_derivative_on_host() {
        if !cfg!(any(feature = "mpc5748g", feature = "mpc5775b")) {
            assert_eq!(Derivative::configured(), None);
        }
    }
}
