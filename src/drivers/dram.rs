// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The DRAM controller, self-refresh policy, and retained-memory
//! checksum.

use crate::counter::udelay;
use crate::drivers::clock::ClockHandle;
use crate::mmio::Mmio;
use crate::steps;
use core::sync::atomic::{AtomicU32, Ordering::Relaxed};

const MC_MAER0: usize = 0x0020;
const MC_MAER0_VALUE: u32 = 0xffff_ffff;
const MC_MAER1: usize = 0x0024;
const MC_MAER1_VALUE: u32 = 0x0000_07ff;
const MC_MAER2: usize = 0x0028;
const MC_MAER2_VALUE: u32 = 0x0000_ffff;

const STATR: usize = 0x0004;
const STATR_OP_MODE: u32 = 0x7;
const STATR_OP_MODE_NORMAL: u32 = 0x1;
const STATR_OP_MODE_SELFREF: u32 = 0x3;

const CLKEN: usize = 0x000c;
const CLKEN_VALUE: u32 = 0x0000_8100;

const PWRCTL: usize = 0x0030;
const PWRCTL_SELFREF_EN: u32 = 1 << 0;

const PGCR3: usize = 0x001c;
const PGCR3_CKEN: u32 = 0xf << 16;
const PGCR3_CKEN_DISABLED: u32 = 0x0 << 16;
const PGCR3_CKEN_NORMAL: u32 = 0xa << 16;
const PGCR3_CKNEN: u32 = 0xf << 20;
const PGCR3_CKNEN_DISABLED: u32 = 0x0 << 20;
const PGCR3_CKNEN_NORMAL: u32 = 0xa << 20;

/// The DRAM controller and its power-management policy.
pub struct Dram {
    com: Mmio,
    ctl: Mmio,
    phy: Mmio,
    bus_clock: ClockHandle,
    dram_clock: ClockHandle,
    mbus_clock: ClockHandle,
    window: Mmio,
    checksum_limit: u32,
    saved_checksum: AtomicU32,
}

impl Dram {
    /// Creates a DRAM controller instance.
    ///
    /// `window` is a readable view of retained memory and
    /// `checksum_limit` the doubling-offset bound used when sampling it.
    pub const fn new(
        com: Mmio,
        ctl: Mmio,
        phy: Mmio,
        bus_clock: ClockHandle,
        dram_clock: ClockHandle,
        mbus_clock: ClockHandle,
        window: Mmio,
        checksum_limit: u32,
    ) -> Self {
        Self {
            com,
            ctl,
            phy,
            bus_clock,
            dram_clock,
            mbus_clock,
            window,
            checksum_limit,
            saved_checksum: AtomicU32::new(0),
        }
    }

    /// References the clocks the boot loader left running.
    pub fn init(&self) {
        let _ = self.mbus_clock.get();
        let _ = self.dram_clock.get();
    }

    /// Puts DRAM into self-refresh and stops the controller clocks.
    pub fn suspend(&self) {
        // Enable DRAM controller register access.
        let _ = self.bus_clock.get();

        // Disable all controller masters.
        self.com.write_32(MC_MAER0, 0);
        self.com.write_32(MC_MAER1, 0);
        self.com.write_32(MC_MAER2, 0);
        // Enable DRAM self-refresh.
        self.ctl.set_32(PWRCTL, PWRCTL_SELFREF_EN);
        // Wait until the DRAM controller enters self-refresh.
        self.ctl.polleq_32(STATR, STATR_OP_MODE, STATR_OP_MODE_SELFREF);

        // Disable CKEN and CKNEN.
        self.phy.clrset_32(
            PGCR3,
            PGCR3_CKEN | PGCR3_CKNEN,
            PGCR3_CKEN_DISABLED | PGCR3_CKNEN_DISABLED,
        );

        // Disable DRAM controller clocks.
        self.ctl.write_32(CLKEN, 0);
        self.dram_clock.put();
        self.mbus_clock.put();

        // Disable further DRAM controller register access.
        self.bus_clock.put();
    }

    /// Restarts the controller clocks and takes DRAM out of self-refresh.
    pub fn resume(&self) {
        // Enable DRAM controller register access.
        let _ = self.bus_clock.get();

        // Enable DRAM controller clocks.
        let _ = self.mbus_clock.get();
        let _ = self.dram_clock.get();
        udelay(10);
        self.ctl.write_32(CLKEN, CLKEN_VALUE);
        udelay(10);

        // Enable CKEN and CKNEN.
        self.phy.clrset_32(
            PGCR3,
            PGCR3_CKEN | PGCR3_CKNEN,
            PGCR3_CKEN_NORMAL | PGCR3_CKNEN_NORMAL,
        );

        // Disable DRAM self-refresh.
        self.ctl.clr_32(PWRCTL, PWRCTL_SELFREF_EN);
        // Wait until the DRAM controller exits self-refresh.
        self.ctl.polleq_32(STATR, STATR_OP_MODE, STATR_OP_MODE_NORMAL);
        // Enable all controller masters.
        self.com.write_32(MC_MAER0, MC_MAER0_VALUE);
        self.com.write_32(MC_MAER1, MC_MAER1_VALUE);
        self.com.write_32(MC_MAER2, MC_MAER2_VALUE);

        // Disable further DRAM controller register access.
        self.bus_clock.put();
    }

    fn checksum(&self) -> u32 {
        let mut checksum: u32 = 0;
        let mut offset: u32 = 4;

        // Sample sparsely with doubling strides so the whole window is
        // touched without reading every word.
        while offset < self.checksum_limit {
            checksum = checksum.wrapping_add(self.window.read_32(offset as usize));
            checksum = checksum.wrapping_add(self.window.read_32(3 * offset as usize));
            checksum = checksum.wrapping_add(1).wrapping_mul(!offset);
            offset <<= 1;
        }

        checksum
    }

    /// Records the retained-memory checksum before entering suspend.
    pub fn save_checksum(&self) {
        self.saved_checksum.store(self.checksum(), Relaxed);
    }

    /// Panics if retained memory changed across suspend.
    pub fn verify_checksum(&self) {
        steps::record(steps::RESUME_DRAM_CHECKSUM);
        if self.checksum() != self.saved_checksum.load(Relaxed) {
            panic!("DRAM checksum mismatch!");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ccu::{self, Ccu, CcuClockDesc};
    use crate::drivers::clock::ClockHandle;
    use core::sync::atomic::AtomicU8;

    fn fixed_rate(_ccu: &Ccu, _id: u8, _parent: u32) -> u32 {
        24_000_000
    }

    const CLOCKS: [CcuClockDesc; 1] = [CcuClockDesc::new(ccu::parent_none, fixed_rate)];

    fn make_dram() -> (Dram, Mmio) {
        let window = Box::leak(Box::new([0u32; 64]));
        // SAFETY: The leaked array backs all the register windows.
        let window = unsafe { Mmio::new(window.as_mut_ptr() as usize) };
        const ZERO: AtomicU8 = AtomicU8::new(0);
        let refcounts = Box::leak(Box::new([ZERO; 1]));
        let ctrl = Box::leak(Box::new(Ccu::new("dram-ccu", window, &CLOCKS, refcounts)));
        let clock = ClockHandle::new(ctrl, 0);

        (
            Dram::new(window, window, window, clock, clock, clock, window, 0x20),
            window,
        )
    }

    #[test]
    fn checksum_round_trips_over_unchanged_memory() {
        let _guard = crate::platform::host::test_lock();
        let (dram, window) = make_dram();

        window.write_32(0x08, 0xdead_beef);
        dram.save_checksum();
        dram.verify_checksum();
    }

    #[test]
    #[should_panic = "DRAM checksum mismatch"]
    fn checksum_detects_corruption() {
        let _guard = crate::platform::host::test_lock();
        let (dram, window) = make_dram();

        dram.save_checksum();
        // Flip a sampled word while "suspended".
        window.write_32(0x08, 1);
        dram.verify_checksum();
    }
}
