// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The regulator framework and the AXP20x-family regulator driver.
//!
//! Acquiring a regulator handle does not imply enabling its output;
//! enable and disable are explicit. Each operation acquires and releases
//! the provider device around the hardware access, so callers that make
//! several calls in a row (the suspend path) hold their own reference to
//! the provider to reduce churn.

use crate::device::{self, Device, Driver};
use crate::drivers::pmic::Axp20x;
use crate::error::Result;

/// A regulator provider.
pub trait RegulatorController: Driver {
    /// Enables or disables a regulator's output.
    ///
    /// May fail with `Io`.
    fn set_state(&self, id: u8, enabled: bool) -> Result<()>;

    /// Reads whether a regulator's output is enabled.
    ///
    /// May fail with `Io`.
    fn get_state(&self, id: u8) -> Result<bool>;
}

/// A reference to a single voltage rail.
#[derive(Clone, Copy)]
pub struct RegulatorHandle {
    /// The provider device containing this regulator.
    pub ctrl: &'static dyn RegulatorController,
    /// The provider-specific regulator identifier.
    pub id: u8,
}

impl RegulatorHandle {
    /// Creates a handle to regulator `id` of `ctrl`.
    pub const fn new(ctrl: &'static dyn RegulatorController, id: u8) -> Self {
        Self { ctrl, id }
    }

    /// Enables the regulator's output.
    ///
    /// May fail with the provider's probe errors or `Io`.
    pub fn enable(&self) -> Result<()> {
        device::get(self.ctrl)?;
        let result = self.ctrl.set_state(self.id, true);
        device::put(self.ctrl);
        result
    }

    /// Disables the regulator's output.
    ///
    /// May fail with the provider's probe errors or `Io`.
    pub fn disable(&self) -> Result<()> {
        device::get(self.ctrl)?;
        let result = self.ctrl.set_state(self.id, false);
        device::put(self.ctrl);
        result
    }

    /// Reads whether the regulator's output is enabled.
    ///
    /// May fail with the provider's probe errors or `Io`.
    pub fn get_state(&self) -> Result<bool> {
        device::get(self.ctrl)?;
        let result = self.ctrl.get_state(self.id);
        device::put(self.ctrl);
        result
    }
}

/// Enables a possibly-absent supply, ignoring failures.
pub fn enable_supply(supply: Option<RegulatorHandle>) {
    if let Some(handle) = supply {
        let _ = handle.enable();
    }
}

/// Disables a possibly-absent supply, ignoring failures.
pub fn disable_supply(supply: Option<RegulatorHandle>) {
    if let Some(handle) = supply {
        let _ = handle.disable();
    }
}

/// The named system supplies a board provides.
///
/// Any rail the board does not control is `None`.
#[derive(Clone, Copy)]
pub struct SystemSupplies {
    /// The regulator supplying VDD-CPUX.
    pub cpu: Option<RegulatorHandle>,
    /// The regulator supplying VCC-DRAM.
    pub dram: Option<RegulatorHandle>,
    /// The regulator supplying VCC-PLL (AVCC).
    pub vcc_pll: Option<RegulatorHandle>,
    /// The regulator supplying VDD-SYS.
    pub vdd_sys: Option<RegulatorHandle>,
}

/// Regulator identifiers and the enable-bit table for the AXP805.
pub mod axp805 {
    use super::Axp20xRegulatorInfo;

    /// DCDCA converter.
    pub const DCDCA: u8 = 0;
    /// DCDCB converter.
    pub const DCDCB: u8 = 1;
    /// DCDCC converter.
    pub const DCDCC: u8 = 2;
    /// DCDCD converter.
    pub const DCDCD: u8 = 3;
    /// DCDCE converter.
    pub const DCDCE: u8 = 4;
    /// ALDO1 linear regulator.
    pub const ALDO1: u8 = 5;
    /// ALDO2 linear regulator.
    pub const ALDO2: u8 = 6;
    /// ALDO3 linear regulator.
    pub const ALDO3: u8 = 7;
    /// BLDO1 linear regulator.
    pub const BLDO1: u8 = 8;
    /// BLDO2 linear regulator.
    pub const BLDO2: u8 = 9;
    /// BLDO3 linear regulator.
    pub const BLDO3: u8 = 10;
    /// BLDO4 linear regulator.
    pub const BLDO4: u8 = 11;
    /// CLDO1 linear regulator.
    pub const CLDO1: u8 = 12;
    /// CLDO2 linear regulator.
    pub const CLDO2: u8 = 13;
    /// CLDO3 linear regulator.
    pub const CLDO3: u8 = 14;
    /// DC/DC switch output.
    pub const DCSW: u8 = 15;

    const POWER_ONOFF_CTRL_REG1: u8 = 0x10;
    const POWER_ONOFF_CTRL_REG2: u8 = 0x11;

    const fn ctrl1(bit: u8) -> Axp20xRegulatorInfo {
        Axp20xRegulatorInfo {
            enable_register: POWER_ONOFF_CTRL_REG1,
            enable_mask: 1 << bit,
        }
    }

    const fn ctrl2(bit: u8) -> Axp20xRegulatorInfo {
        Axp20xRegulatorInfo {
            enable_register: POWER_ONOFF_CTRL_REG2,
            enable_mask: 1 << bit,
        }
    }

    /// The enable-bit locations, indexed by regulator id.
    pub const INFO: [Axp20xRegulatorInfo; 16] = [
        ctrl1(0),
        ctrl1(1),
        ctrl1(2),
        ctrl1(3),
        ctrl1(4),
        ctrl1(5),
        ctrl1(6),
        ctrl1(7),
        ctrl2(0),
        ctrl2(1),
        ctrl2(2),
        ctrl2(3),
        ctrl2(4),
        ctrl2(5),
        ctrl2(6),
        ctrl2(7),
    ];
}

/// The location of one regulator's enable bit in an AXP register file.
#[derive(Clone, Copy)]
pub struct Axp20xRegulatorInfo {
    /// The register holding the enable bit.
    pub enable_register: u8,
    /// The mask of the enable bit within that register.
    pub enable_mask: u8,
}

/// The regulator half of an AXP20x-family PMIC.
pub struct Axp20xRegulator {
    dev: Device,
    mfd: &'static Axp20x,
    info: &'static [Axp20xRegulatorInfo],
}

impl Axp20xRegulator {
    /// Creates a regulator provider backed by an AXP20x-family device.
    pub const fn new(
        name: &'static str,
        mfd: &'static Axp20x,
        info: &'static [Axp20xRegulatorInfo],
    ) -> Self {
        Self {
            dev: Device::new(name),
            mfd,
            info,
        }
    }
}

impl Driver for Axp20xRegulator {
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

impl RegulatorController for Axp20xRegulator {
    fn set_state(&self, id: u8, enabled: bool) -> Result<()> {
        let info = &self.info[usize::from(id)];

        self.mfd.map().update_bits(
            info.enable_register,
            info.enable_mask,
            if enabled { info.enable_mask } else { 0 },
        )
    }

    fn get_state(&self, id: u8) -> Result<bool> {
        let info = &self.info[usize::from(id)];

        Ok(self.mfd.map().read(info.enable_register)? & info.enable_mask != 0)
    }
}
