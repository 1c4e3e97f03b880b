// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Shared plumbing for devices that use one clock and up to two pins.

use crate::device::{self, Device, Driver};
use crate::drivers::clock::{ClockHandle, ClockState};
use crate::drivers::gpio::GpioHandle;
use crate::error::Result;
use crate::mmio::Mmio;

/// The descriptor and resources common to simple devices.
///
/// Concrete drivers embed this and forward their probe and release hooks
/// to [`SimpleDevice::probe`] and [`SimpleDevice::release`].
pub struct SimpleDevice {
    dev: Device,
    clock: ClockHandle,
    pins: Option<[GpioHandle; 2]>,
    regs: Mmio,
}

impl SimpleDevice {
    /// Creates a simple device descriptor.
    pub const fn new(
        name: &'static str,
        clock: ClockHandle,
        pins: Option<[GpioHandle; 2]>,
        regs: Mmio,
    ) -> Self {
        Self {
            dev: Device::new(name),
            clock,
            pins,
            regs,
        }
    }

    /// The embedded device descriptor.
    pub fn device(&self) -> &Device {
        &self.dev
    }

    /// The device's bus clock.
    pub fn clock(&self) -> ClockHandle {
        self.clock
    }

    /// The device's register window.
    pub fn regs(&self) -> Mmio {
        self.regs
    }

    /// Acquires the device's clock and pins.
    ///
    /// Propagates the clock's and pins' acquisition errors.
    pub fn probe(&self) -> Result<()> {
        self.clock.get()?;

        if let Some(pins) = &self.pins {
            if let Err(err) = pins[0].get() {
                self.clock.put();
                return Err(err);
            }
            if let Err(err) = pins[1].get() {
                pins[0].put();
                self.clock.put();
                return Err(err);
            }
        }

        Ok(())
    }

    /// Releases the device's pins and clock.
    pub fn release(&self) {
        if let Some(pins) = &self.pins {
            pins[1].put();
            pins[0].put();
        }
        self.clock.put();
    }
}

/// Adjusts a device's refcount to match the state the AP left it in.
///
/// If the device has no references but its clock is running, a
/// persistent reference is acquired so the device's resources are not
/// torn down underneath the AP. Conversely, if the only reference is one
/// previously acquired by this function and the clock has stopped, that
/// reference is dropped. Must not be called while other references to
/// the device are held.
pub fn sync(drv: &dyn Driver, clock: ClockHandle) {
    let refcount = drv.device().refcount();

    if clock.state() == ClockState::Enabled {
        if refcount == 0 {
            let _ = device::get(drv);
        }
    } else if refcount == 1 {
        device::put(drv);
    }
}
