// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! PMIC policy drivers.
//!
//! A PMIC exposes four verbs, each a single control-bit write: `reset`
//! (board-level power cycle), `resume` (restore regulator state after
//! suspend), `shutdown` (soft power off), and `suspend` (arm the wakeup
//! machinery and remember voltages).

use crate::device::{self, Device, Driver};
use crate::drivers::regmap::Regmap;
use crate::drivers::regulator::RegulatorHandle;
use crate::error::{Error, Result};
use crate::platform::{Platform, PlatformImpl};

const IC_TYPE_REG: u8 = 0x03;
const IC_TYPE_MASK: u8 = 0xcf;

const WAKEUP_CTRL_REG: u8 = 0x31;
const POWER_DISABLE_REG: u8 = 0x32;

/// A power-management IC.
pub trait Pmic: Driver {
    /// Initiates a board-level power cycle. May fail with `Io`.
    fn reset(&self) -> Result<()>;

    /// Initiates the resume process. May fail with `Io`.
    fn resume(&self) -> Result<()>;

    /// Initiates the shutdown process. May fail with `Io`.
    fn shutdown(&self) -> Result<()>;

    /// Initiates the suspend process. May fail with `Io`.
    fn suspend(&self) -> Result<()>;
}

/// Acquires a reference to the board's PMIC, if one is available.
pub fn get() -> Option<&'static dyn Pmic> {
    device::get_or_none(PlatformImpl::pmic()?)
}

/// The shared core of an AXP20x-family multi-function device.
///
/// The PMIC, regulator, and fuel-gauge functions all talk to the same
/// chip; this device owns the register map and verifies the chip
/// identifies itself correctly on first acquisition.
pub struct Axp20x {
    dev: Device,
    map: Regmap,
    ic_type: u8,
}

impl Axp20x {
    /// Creates an AXP20x-family device expected to identify as `ic_type`.
    pub const fn new(name: &'static str, map: Regmap, ic_type: u8) -> Self {
        Self {
            dev: Device::new(name),
            map,
            ic_type,
        }
    }

    /// The chip's register map.
    pub fn map(&self) -> &Regmap {
        &self.map
    }
}

impl Driver for Axp20x {
    fn device(&self) -> &Device {
        &self.dev
    }

    fn probe(&self) -> Result<()> {
        self.map.get()?;

        match self.map.read(IC_TYPE_REG) {
            Ok(reg) if reg & IC_TYPE_MASK == self.ic_type => Ok(()),
            result => {
                self.map.put();
                result.map(|_| ()).and(Err(Error::NoDevice))
            }
        }
    }

    fn release(&self) {
        self.map.put();
    }
}

/// The PMIC function of an AXP805.
pub struct Axp805Pmic {
    dev: Device,
    mfd: &'static Axp20x,
}

impl Axp805Pmic {
    /// Creates the PMIC function over the shared AXP device.
    pub const fn new(mfd: &'static Axp20x) -> Self {
        Self {
            dev: Device::new("axp805-pmic"),
            mfd,
        }
    }
}

impl Driver for Axp805Pmic {
    fn device(&self) -> &Device {
        &self.dev
    }

    fn probe(&self) -> Result<()> {
        device::get(self.mfd)
    }

    fn release(&self) {
        device::put(self.mfd)
    }
}

impl Pmic for Axp805Pmic {
    fn reset(&self) -> Result<()> {
        // Trigger soft power restart.
        self.mfd.map().set_bits(POWER_DISABLE_REG, 1 << 6)
    }

    fn resume(&self) -> Result<()> {
        // Trigger soft power resume.
        self.mfd.map().set_bits(WAKEUP_CTRL_REG, 1 << 5)
    }

    fn shutdown(&self) -> Result<()> {
        // Trigger soft power off.
        self.mfd.map().set_bits(POWER_DISABLE_REG, 1 << 7)
    }

    fn suspend(&self) -> Result<()> {
        // Enable resume, remember voltages, and allow IRQs during suspend.
        self.mfd.map().set_bits(WAKEUP_CTRL_REG, 1 << 6 | 1 << 4 | 1 << 3)
    }
}

/// A PMIC substitute for boards with discrete regulators only.
pub struct DummyPmic {
    dev: Device,
    cpu_supply: Option<RegulatorHandle>,
}

impl DummyPmic {
    /// Creates a dummy PMIC controlling the optional CPU supply.
    pub const fn new(cpu_supply: Option<RegulatorHandle>) -> Self {
        Self {
            dev: Device::new("dummy-pmic"),
            cpu_supply,
        }
    }

    fn power_on(&self) -> Result<()> {
        if let Some(supply) = self.cpu_supply {
            supply.enable()?;
        }
        Ok(())
    }

    fn power_off(&self) -> Result<()> {
        if let Some(supply) = self.cpu_supply {
            supply.disable()?;
        }
        Ok(())
    }
}

impl Driver for DummyPmic {
    fn device(&self) -> &Device {
        &self.dev
    }
}

impl Pmic for DummyPmic {
    fn reset(&self) -> Result<()> {
        self.power_on()
    }

    fn resume(&self) -> Result<()> {
        self.power_on()
    }

    fn shutdown(&self) -> Result<()> {
        self.power_off()
    }

    fn suspend(&self) -> Result<()> {
        self.power_off()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::regulator::RegulatorController;
    use core::sync::atomic::{AtomicBool, Ordering::Relaxed};

    struct OneRail {
        dev: Device,
        enabled: AtomicBool,
    }

    impl Driver for OneRail {
        fn device(&self) -> &Device {
            &self.dev
        }
    }

    impl RegulatorController for OneRail {
        fn set_state(&self, _id: u8, enabled: bool) -> Result<()> {
            self.enabled.store(enabled, Relaxed);
            Ok(())
        }

        fn get_state(&self, _id: u8) -> Result<bool> {
            Ok(self.enabled.load(Relaxed))
        }
    }

    #[test]
    fn dummy_pmic_drives_the_cpu_supply() {
        let rail: &'static OneRail = Box::leak(Box::new(OneRail {
            dev: Device::new("one-rail"),
            enabled: AtomicBool::new(true),
        }));
        let pmic = DummyPmic::new(Some(RegulatorHandle::new(rail, 0)));

        pmic.suspend().unwrap();
        assert!(!rail.enabled.load(Relaxed));
        pmic.resume().unwrap();
        assert!(rail.enabled.load(Relaxed));
        pmic.shutdown().unwrap();
        assert!(!rail.enabled.load(Relaxed));
        pmic.reset().unwrap();
        assert!(rail.enabled.load(Relaxed));
    }

    #[test]
    fn dummy_pmic_without_a_rail_is_inert() {
        let pmic = DummyPmic::new(None);
        assert!(pmic.suspend().is_ok());
        assert!(pmic.resume().is_ok());
    }
}
