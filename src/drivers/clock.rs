// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The clock tree framework.
//!
//! A clock is identified by a handle naming its controller and clock id.
//! Handles are freely copyable and not owned; the per-clock reference
//! counts live in the controller. Acquiring the first reference to a
//! clock acquires the controller device and, recursively, the parent
//! clock, so an enabled clock always has enabled ancestors.

use crate::device::{self, Driver};
use crate::drivers::ccu::Ccu;
use crate::error::Result;
use log::debug;

/// The gating state of a clock.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ClockState {
    /// The clock is stopped and its module is held in reset.
    Disabled,
    /// The module is out of reset, but the clock is gated.
    Gated,
    /// The clock is running.
    Enabled,
}

/// A reference to a single clock provided by a clock controller.
#[derive(Clone, Copy, Debug)]
pub struct ClockHandle {
    /// The controller device providing this clock.
    pub ctrl: &'static Ccu,
    /// The controller-specific clock identifier.
    pub id: u8,
}

impl ClockHandle {
    /// Creates a handle to clock `id` of `ctrl`.
    pub const fn new(ctrl: &'static Ccu, id: u8) -> Self {
        Self { ctrl, id }
    }

    /// Returns whether this clock has any active references.
    pub fn is_active(self) -> bool {
        self.ctrl.refcount(self.id) > 0
    }

    /// Acquires a reference to this clock and enables it.
    ///
    /// The first reference acquires the controller device and the parent
    /// clock. May fail with the controller's probe errors; subsequent
    /// references are O(1) and infallible.
    pub fn get(self) -> Result<()> {
        // Perform additional setup if this is the first reference.
        if !self.is_active() {
            // Ensure the controller's driver is loaded.
            device::get(self.ctrl)?;

            // Ensure the clock's parent has an active reference.
            if let Some(parent) = self.ctrl.parent(self.id) {
                if let Err(err) = parent.get() {
                    device::put(self.ctrl);
                    return Err(err);
                }
            }

            debug!(
                "{}: Clock {} running at {} Hz",
                self.ctrl.device().name(),
                self.id,
                self.rate()
            );
        }

        // Bump the refcount only after successfully acquiring dependencies.
        self.ctrl.ref_inc(self.id);

        self.enable();

        Ok(())
    }

    /// Releases a reference to this clock.
    ///
    /// The last release fully disables the clock and drops the parent and
    /// controller references.
    pub fn put(self) {
        assert!(self.is_active());

        // Do nothing if there are other consumers of this clock.
        if self.ctrl.ref_dec(self.id) > 1 {
            return;
        }

        debug!(
            "{}: Releasing clock {}",
            self.ctrl.device().name(),
            self.id
        );

        // Completely disable the clock once the last consumer is gone.
        self.ctrl.set_state(self.id, ClockState::Disabled);

        if let Some(parent) = self.ctrl.parent(self.id) {
            parent.put();
        }

        device::put(self.ctrl);
    }

    /// Enables this clock and its ancestors without a refcount change.
    ///
    /// Idempotent. Only allowed while a reference is held.
    pub fn enable(self) {
        assert!(self.is_active());

        // If the clock has a parent, ensure the parent is enabled.
        if let Some(parent) = self.ctrl.parent(self.id) {
            parent.enable();
        }

        self.ctrl.set_state(self.id, ClockState::Enabled);
    }

    /// Gates this clock without a refcount change.
    ///
    /// Idempotent. Only allowed while a reference is held.
    pub fn disable(self) {
        assert!(self.is_active());

        self.ctrl.set_state(self.id, ClockState::Gated);
    }

    /// Computes this clock's current rate in Hz from its parent's rate.
    pub fn rate(self) -> u32 {
        let parent_rate = self.ctrl.parent(self.id).map_or(0, ClockHandle::rate);

        self.ctrl.rate(self.id, parent_rate)
    }

    /// Returns the effective state of this clock.
    ///
    /// A clock is only `Enabled` if it and all of its ancestors are
    /// ungated and out of reset; otherwise it reports the shallowest
    /// blocking state.
    pub fn state(self) -> ClockState {
        if let Some(parent) = self.ctrl.parent(self.id) {
            let parent_state = parent.state();

            // If the parent is not enabled, this clock has that state.
            if parent_state != ClockState::Enabled {
                return parent_state;
            }
        }

        self.ctrl.hw_state(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ccu::{self, CcuClockDesc};
    use crate::mmio::{Mmio, bitmap_index};
    use core::sync::atomic::AtomicU8;

    const ROOT: u8 = 0;
    const BUS: u8 = 1;
    const LEAF: u8 = 2;
    const PLL: u8 = 3;

    fn root_parent(ccu: &'static Ccu, _id: u8) -> Option<ClockHandle> {
        Some(ClockHandle::new(ccu, ROOT))
    }

    fn bus_parent(ccu: &'static Ccu, _id: u8) -> Option<ClockHandle> {
        Some(ClockHandle::new(ccu, BUS))
    }

    fn root_rate(_ccu: &Ccu, _id: u8, _parent: u32) -> u32 {
        24_000_000
    }

    fn leaf_rate(_ccu: &Ccu, _id: u8, parent: u32) -> u32 {
        parent / 4
    }

    const CLOCKS: [CcuClockDesc; 4] = [
        CcuClockDesc::new(ccu::parent_none, root_rate),
        CcuClockDesc::new(root_parent, ccu::rate_parent)
            .with_gate(bitmap_index(0x10, 0))
            .with_reset(bitmap_index(0x10, 16)),
        CcuClockDesc::new(bus_parent, leaf_rate).with_gate(bitmap_index(0x14, 0)),
        CcuClockDesc::new(ccu::parent_none, root_rate)
            .with_reg(0x18)
            .with_lock(28)
            .with_update(27)
            .with_gate(bitmap_index(0x18, 31)),
    ];

    fn make_ccu() -> (&'static Ccu, Mmio) {
        let backing = Box::leak(Box::new([0u32; 16]));
        // SAFETY: The leaked array outlives the leaked controller.
        let regs = unsafe { Mmio::new(backing.as_mut_ptr() as usize) };
        const ZERO: AtomicU8 = AtomicU8::new(0);
        let refcounts = Box::leak(Box::new([ZERO; 4]));
        let ccu = Box::leak(Box::new(Ccu::new("test-ccu", regs, &CLOCKS, refcounts)));
        (ccu, regs)
    }

    #[test]
    fn get_enables_ancestors_first() {
        let (ccu, regs) = make_ccu();
        let leaf = ClockHandle::new(ccu, LEAF);

        leaf.get().unwrap();

        // The whole chain is referenced and ungated.
        assert!(leaf.is_active());
        assert!(ClockHandle::new(ccu, BUS).is_active());
        assert!(ClockHandle::new(ccu, ROOT).is_active());
        assert_eq!(regs.read_32(0x10), 1 << 0 | 1 << 16);
        assert_eq!(regs.read_32(0x14), 1 << 0);
        assert_eq!(leaf.state(), ClockState::Enabled);
        assert_eq!(ccu.device().refcount(), 3);
    }

    #[test]
    fn get_put_pairs_restore_the_initial_state() {
        let (ccu, regs) = make_ccu();
        let leaf = ClockHandle::new(ccu, LEAF);

        leaf.get().unwrap();
        leaf.get().unwrap();
        leaf.put();
        // A remaining reference keeps the chain alive.
        assert!(ClockHandle::new(ccu, BUS).is_active());

        leaf.put();
        assert!(!leaf.is_active());
        assert!(!ClockHandle::new(ccu, BUS).is_active());
        assert!(!ClockHandle::new(ccu, ROOT).is_active());
        assert_eq!(regs.read_32(0x10), 0);
        assert_eq!(regs.read_32(0x14), 0);
        assert_eq!(ccu.device().refcount(), 0);
    }

    #[test]
    fn state_reports_the_shallowest_blocking_ancestor() {
        let (ccu, regs) = make_ccu();
        let leaf = ClockHandle::new(ccu, LEAF);
        let bus = ClockHandle::new(ccu, BUS);

        leaf.get().unwrap();
        assert_eq!(leaf.state(), ClockState::Enabled);

        // Gate the bus behind the framework's back.
        regs.clr_32(0x10, 1 << 0);
        assert_eq!(leaf.state(), ClockState::Gated);

        // Assert the bus reset.
        regs.clr_32(0x10, 1 << 16);
        assert_eq!(leaf.state(), ClockState::Disabled);
        assert_eq!(bus.state(), ClockState::Disabled);
    }

    #[test]
    fn rate_applies_the_divider_chain() {
        let (ccu, _) = make_ccu();
        assert_eq!(ClockHandle::new(ccu, LEAF).rate(), 6_000_000);
        assert_eq!(ClockHandle::new(ccu, ROOT).rate(), 24_000_000);
    }

    #[test]
    fn enable_waits_for_the_lock_bit() {
        let (ccu, regs) = make_ccu();
        let pll = ClockHandle::new(ccu, PLL);

        // Model a PLL that locks instantly.
        regs.write_32(0x18, 1 << 28);
        pll.get().unwrap();

        let reg = regs.read_32(0x18);
        assert_eq!(reg & 1 << 31, 1 << 31, "PLL must be ungated");
        assert_eq!(reg & 1 << 27, 1 << 27, "update bit must be set");
    }

    #[test]
    fn disable_gates_without_releasing() {
        let (ccu, regs) = make_ccu();
        let bus = ClockHandle::new(ccu, BUS);

        bus.get().unwrap();
        bus.disable();
        // Gated, but still out of reset and still referenced.
        assert_eq!(regs.read_32(0x10), 1 << 16);
        assert!(bus.is_active());

        bus.enable();
        assert_eq!(regs.read_32(0x10), 1 << 0 | 1 << 16);
        bus.put();
    }

    #[test]
    fn refcounts_are_per_clock() {
        let (ccu, _) = make_ccu();
        let root = ClockHandle::new(ccu, ROOT);
        let bus = ClockHandle::new(ccu, BUS);

        bus.get().unwrap();
        assert_eq!(ccu.refcount(ROOT), 1);
        root.get().unwrap();
        assert_eq!(ccu.refcount(ROOT), 2);
        assert_eq!(ccu.refcount(BUS), 1);
        bus.put();
        assert_eq!(ccu.refcount(ROOT), 1);
        root.put();
    }
}
