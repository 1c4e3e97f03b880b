// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The descriptor-table clock controller driver.
//!
//! Each controller instance is a table of [`CcuClockDesc`] entries, one
//! per clock id, giving hooks to find the parent and compute the rate,
//! plus register-bitmap positions for the clock gate, module reset, PLL
//! lock bit, and configuration-update bit. A bitmap index of zero means
//! the bit is not present.

use crate::device::{Device, Driver};
use crate::drivers::clock::{ClockHandle, ClockState};
use crate::mmio::{Mmio, bitfield_get};
use core::sync::atomic::{AtomicU8, Ordering::Relaxed};

/// Hook returning the parent of a clock, if it has one.
pub type ParentHook = fn(&'static Ccu, u8) -> Option<ClockHandle>;

/// Hook computing a clock's rate from its parent's rate.
pub type RateHook = fn(&Ccu, u8, u32) -> u32;

/// The per-clock descriptor within a controller's table.
#[derive(Clone, Copy, Debug)]
pub struct CcuClockDesc {
    get_parent: ParentHook,
    get_rate: RateHook,
    reg: usize,
    lock: u8,
    update: u8,
    gate: u16,
    reset: u16,
}

impl CcuClockDesc {
    /// Creates a descriptor with no gate, reset, lock, or update bits.
    pub const fn new(get_parent: ParentHook, get_rate: RateHook) -> Self {
        Self {
            get_parent,
            get_rate,
            reg: 0,
            lock: 0,
            update: 0,
            gate: 0,
            reset: 0,
        }
    }

    /// Sets the byte offset of the clock configuration register.
    pub const fn with_reg(mut self, reg: usize) -> Self {
        self.reg = reg;
        self
    }

    /// Sets the lock bit position inside the configuration register.
    pub const fn with_lock(mut self, bit: u8) -> Self {
        self.lock = bit;
        self
    }

    /// Sets the update bit position inside the configuration register.
    pub const fn with_update(mut self, bit: u8) -> Self {
        self.update = bit;
        self
    }

    /// Sets the register-bitmap index of the clock gate.
    pub const fn with_gate(mut self, index: u16) -> Self {
        self.gate = index;
        self
    }

    /// Sets the register-bitmap index of the module reset.
    pub const fn with_reset(mut self, index: u16) -> Self {
        self.reset = index;
        self
    }
}

/// A clock controller described by a table of clock descriptors.
#[derive(Debug)]
pub struct Ccu {
    dev: Device,
    regs: Mmio,
    clocks: &'static [CcuClockDesc],
    refcounts: &'static [AtomicU8],
}

impl Ccu {
    /// Creates a clock controller over the given register window.
    ///
    /// `refcounts` must have one entry per clock descriptor.
    pub const fn new(
        name: &'static str,
        regs: Mmio,
        clocks: &'static [CcuClockDesc],
        refcounts: &'static [AtomicU8],
    ) -> Self {
        assert!(clocks.len() == refcounts.len());

        Self {
            dev: Device::new(name),
            regs,
            clocks,
            refcounts,
        }
    }

    /// The controller's register window.
    pub fn regs(&self) -> Mmio {
        self.regs
    }

    fn desc(&self, id: u8) -> &CcuClockDesc {
        &self.clocks[usize::from(id)]
    }

    pub(crate) fn refcount(&self, id: u8) -> u8 {
        self.refcounts[usize::from(id)].load(Relaxed)
    }

    pub(crate) fn ref_inc(&self, id: u8) {
        self.refcounts[usize::from(id)].fetch_add(1, Relaxed);
    }

    /// Decrements the refcount, returning its previous value.
    pub(crate) fn ref_dec(&self, id: u8) -> u8 {
        self.refcounts[usize::from(id)].fetch_sub(1, Relaxed)
    }

    pub(crate) fn parent(&'static self, id: u8) -> Option<ClockHandle> {
        (self.desc(id).get_parent)(self, id)
    }

    pub(crate) fn rate(&self, id: u8, parent_rate: u32) -> u32 {
        (self.desc(id).get_rate)(self, id, parent_rate)
    }

    /// The state of this clock alone, ignoring its ancestors.
    pub(crate) fn hw_state(&self, id: u8) -> ClockState {
        let desc = self.desc(id);

        // Check the reset line, if present.
        if desc.reset != 0 && !self.regs.bitmap_get(desc.reset) {
            return ClockState::Disabled;
        }
        // Check the clock gate, if present.
        if desc.gate != 0 && !self.regs.bitmap_get(desc.gate) {
            return ClockState::Gated;
        }

        ClockState::Enabled
    }

    pub(crate) fn set_state(&self, id: u8, state: ClockState) {
        let desc = self.desc(id);
        let enable = state > ClockState::Disabled;
        let ungate = state > ClockState::Gated;

        // Do nothing if the clock is already in the desired state.
        if self.hw_state(id) == state {
            return;
        }

        // First, (de)assert the reset line.
        if desc.reset != 0 {
            if enable {
                self.regs.bitmap_set(desc.reset);
            } else {
                self.regs.bitmap_clear(desc.reset);
            }
        }
        // Once the module is in/out of reset, (un)gate the clock.
        if desc.gate != 0 {
            if ungate {
                self.regs.bitmap_set(desc.gate);
            } else {
                self.regs.bitmap_clear(desc.gate);
            }
        }
        // Apply the changes by setting the update bit, if applicable.
        if desc.update != 0 {
            self.regs.set_32(desc.reg, 1 << desc.update);
        }
        // Wait for the lock bit to be set, if applicable.
        if desc.lock != 0 && ungate {
            self.regs.poll_32(desc.reg, 1 << desc.lock);
        }
    }
}

impl Driver for Ccu {
    fn device(&self) -> &Device {
        &self.dev
    }
}

/// Parent hook for root clocks: no parent.
pub fn parent_none(_ccu: &'static Ccu, _id: u8) -> Option<ClockHandle> {
    None
}

/// Rate hook passing the parent's rate through unchanged.
pub fn rate_parent(_ccu: &Ccu, _id: u8, parent_rate: u32) -> u32 {
    parent_rate
}

/// Applies an M divider field to a parent rate.
pub fn calc_rate_m(value: u32, rate: u32, m_shift: u32, m_width: u32) -> u32 {
    rate / (bitfield_get(value, m_shift, m_width) + 1)
}

/// Applies M and P divider fields to a parent rate.
pub fn calc_rate_mp(
    value: u32,
    rate: u32,
    m_shift: u32,
    m_width: u32,
    p_shift: u32,
    p_width: u32,
) -> u32 {
    calc_rate_m(value, rate, m_shift, m_width) >> bitfield_get(value, p_shift, p_width)
}

/// Defines a rate hook returning a fixed rate.
#[macro_export]
macro_rules! define_fixed_rate {
    ($name:ident, $rate:expr) => {
        fn $name(_ccu: &$crate::drivers::ccu::Ccu, _id: u8, _parent_rate: u32) -> u32 {
            $rate
        }
    };
}

/// Defines a parent hook returning a fixed handle into another controller.
#[macro_export]
macro_rules! define_fixed_parent {
    ($name:ident, $ctrl:expr, $id:expr) => {
        fn $name(
            _ccu: &'static $crate::drivers::ccu::Ccu,
            _id: u8,
        ) -> Option<$crate::drivers::clock::ClockHandle> {
            Some($crate::drivers::clock::ClockHandle::new(&$ctrl, $id))
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divider_helpers() {
        // M field = 3 (divide by 4), P field = 1 (shift by 1).
        let value = 0x3 | 0x1 << 8;
        assert_eq!(calc_rate_m(value, 24_000_000, 0, 5), 6_000_000);
        assert_eq!(calc_rate_mp(value, 24_000_000, 0, 5, 8, 2), 3_000_000);
    }
}
