// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Watchdog drivers.
//!
//! While the system is awake the watchdog is held probed and restarted
//! every iteration of the main loop; an unserviced timeout resets the
//! SoC. Programming the minimum timeout is also how the firmware
//! deliberately resets the SoC.

use crate::device::{Device, Driver};
use crate::drivers::simple::SimpleDevice;
use crate::error::Result;
use crate::platform::{Platform, PlatformImpl};

const TWD_CTRL_REG: usize = 0x10;
const TWD_RESTART_REG: usize = 0x14;
const TWD_INTV_REG: usize = 0x30;

const TWD_RESTART_KEY: u32 = 0xd14 << 16;

/// A watchdog device.
pub trait Watchdog: Driver {
    /// Restarts the watchdog countdown. Must be called before the
    /// current timeout elapses.
    fn restart(&self);

    /// Programs the timeout, in reference-clock ticks.
    fn set_timeout(&self, ticks: u32);
}

/// The sunxi trusted watchdog.
pub struct SunxiTwd {
    sdev: SimpleDevice,
}

impl SunxiTwd {
    /// The default timeout programmed at probe time: five seconds.
    pub const DEFAULT_TIMEOUT: u32 = 5 * PlatformImpl::REFCLK_HZ;

    /// Creates a trusted watchdog over the given simple device.
    pub const fn new(sdev: SimpleDevice) -> Self {
        Self { sdev }
    }
}

impl Driver for SunxiTwd {
    fn device(&self) -> &Device {
        self.sdev.device()
    }

    fn probe(&self) -> Result<()> {
        self.sdev.probe()?;

        let regs = self.sdev.regs();

        // Clear the watchdog configuration.
        regs.write_32(TWD_CTRL_REG, 1 << 0);
        regs.pollz_32(TWD_CTRL_REG, 1 << 0);

        // Set the counter clock source to OSC24M.
        regs.set_32(TWD_CTRL_REG, 1 << 31);

        // Program a conservative default timeout.
        regs.write_32(TWD_INTV_REG, Self::DEFAULT_TIMEOUT);

        // Update the comparator to (counter + timeout).
        self.restart();

        // Start the watchdog counter; enable system reset.
        regs.clrset_32(TWD_CTRL_REG, 1 << 1, 1 << 9);

        Ok(())
    }

    fn release(&self) {
        // Disable system reset; stop the watchdog counter.
        self.sdev.regs().clrset_32(TWD_CTRL_REG, 1 << 9, 1 << 1);

        self.sdev.release();
    }
}

impl Watchdog for SunxiTwd {
    fn restart(&self) {
        self.sdev
            .regs()
            .write_32(TWD_RESTART_REG, TWD_RESTART_KEY | 1 << 0);
    }

    fn set_timeout(&self, ticks: u32) {
        self.sdev.regs().write_32(TWD_INTV_REG, ticks);
    }
}
