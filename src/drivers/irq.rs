// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The always-on interrupt controller (R_INTC) as a wake-IRQ source.
//!
//! While the system is off or asleep, the firmware polls the pending
//! registers instead of taking interrupts. The controller also reports
//! which power rails must stay up for the currently-enabled wake IRQs to
//! fire, which bounds the reachable suspend depth.

use crate::mmio::Mmio;

const NUM_MUX_REGS: usize = 4;

fn irq_pend_reg(n: usize) -> usize {
    0x0010 + 4 * n
}

fn mux_en_reg(n: usize) -> usize {
    0x00c0 + 4 * n
}

/// An R_INTC instance.
pub struct SunxiRIntc {
    regs: Mmio,
    irq_reg_count: usize,
    mux_needs_avcc: [u32; NUM_MUX_REGS],
    mux_needs_vdd_sys: [u32; NUM_MUX_REGS],
}

impl SunxiRIntc {
    /// Creates an R_INTC instance.
    ///
    /// The mux masks name the external interrupt lines that stop working
    /// when the AVCC or VDD-SYS rail is gated.
    pub const fn new(
        regs: Mmio,
        irq_reg_count: usize,
        mux_needs_avcc: [u32; NUM_MUX_REGS],
        mux_needs_vdd_sys: [u32; NUM_MUX_REGS],
    ) -> Self {
        Self {
            regs,
            irq_reg_count,
            mux_needs_avcc,
            mux_needs_vdd_sys,
        }
    }

    /// Returns a nonzero value if any wake IRQ is pending.
    pub fn poll(&self) -> u32 {
        let mut pending = 0;

        for i in 0..self.irq_reg_count {
            pending |= self.regs.read_32(irq_pend_reg(i));
        }

        pending
    }

    /// Returns the enabled wake IRQs that require AVCC to stay powered.
    pub fn needs_avcc(&self) -> u32 {
        let mut enabled = 0;

        // Only read registers with relevant bits.
        for (i, mask) in self.mux_needs_avcc.iter().enumerate() {
            if *mask != 0 {
                enabled |= self.regs.read_32(mux_en_reg(i)) & mask;
            }
        }

        enabled
    }

    /// Returns the enabled wake IRQs that require VDD-SYS to stay
    /// powered.
    pub fn needs_vdd_sys(&self) -> u32 {
        let mut enabled = 0;

        for (i, mask) in self.mux_needs_vdd_sys.iter().enumerate() {
            if *mask != 0 {
                enabled |= self.regs.read_32(mux_en_reg(i)) & mask;
            }
        }

        enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_intc() -> (SunxiRIntc, Mmio) {
        let backing = Box::leak(Box::new([0u32; 64]));
        // SAFETY: The leaked array backs the register window.
        let regs = unsafe { Mmio::new(backing.as_mut_ptr() as usize) };
        let intc = SunxiRIntc::new(
            regs,
            2,
            [0; NUM_MUX_REGS],
            [0, 1 << 19 | 1 << 21 | 1 << 22 | 1 << 27, 0, 0],
        );
        (intc, regs)
    }

    #[test]
    fn poll_aggregates_pending_registers() {
        let (intc, regs) = make_intc();

        assert_eq!(intc.poll(), 0);
        regs.write_32(0x14, 1 << 5);
        assert_ne!(intc.poll(), 0);
    }

    #[test]
    fn rail_masks_consider_only_enabled_muxes() {
        let (intc, regs) = make_intc();

        assert_eq!(intc.needs_vdd_sys(), 0);
        // Enable a port IRQ that depends on VDD-SYS, plus an unrelated one.
        regs.write_32(0xc4, 1 << 19 | 1 << 3);
        assert_eq!(intc.needs_vdd_sys(), 1 << 19);
        assert_eq!(intc.needs_avcc(), 0);
    }
}
