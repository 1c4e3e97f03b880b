// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The sunxi reduced serial bus (RSB) controller.

use crate::device::{Device, Driver};
use crate::drivers::regmap::RegmapBus;
use crate::drivers::simple::SimpleDevice;
use crate::error::{Error, Result};

const RSB_CTRL_REG: usize = 0x00;
const RSB_CCR_REG: usize = 0x04;
const RSB_STAT_REG: usize = 0x0c;
const RSB_ADDR_REG: usize = 0x10;
const RSB_DATA_REG: usize = 0x1c;
const RSB_PMCR_REG: usize = 0x28;
const RSB_CMD_REG: usize = 0x2c;
const RSB_SADDR_REG: usize = 0x30;

const I2C_BCAST_ADDR: u32 = 0;

const PMIC_MODE_REG: u32 = 0x3e;
const PMIC_MODE_VAL: u32 = 0x7c;

const RSB_SRTA: u32 = 0xe8;
const RSB_RD8: u32 = 0x8b;
const RSB_WR8: u32 = 0x4e;

/// A sunxi RSB controller instance.
pub struct SunxiRsb {
    sdev: SimpleDevice,
}

impl SunxiRsb {
    /// Creates an RSB controller over the given simple device.
    pub const fn new(sdev: SimpleDevice) -> Self {
        Self { sdev }
    }

    fn do_command(&self, addr: u8, cmd: u32) -> Result<()> {
        let regs = self.sdev.regs();

        regs.write_32(RSB_CMD_REG, cmd);
        regs.write_32(RSB_SADDR_REG, addr.into());
        regs.write_32(RSB_CTRL_REG, 1 << 7);

        regs.pollz_32(RSB_CTRL_REG, 1 << 7);

        if regs.read_32(RSB_STAT_REG) == 1 << 0 {
            Ok(())
        } else {
            Err(Error::Io)
        }
    }

    fn set_rate(&self, rate: u32) {
        let mut divider = (self.sdev.clock().rate() + rate) / (2 * rate);

        if divider > 0 {
            divider -= 1;
        }
        if divider > 0xff {
            divider = 0xff;
        }

        self.sdev.regs().write_32(RSB_CCR_REG, 1 << 8 | divider);
    }
}

impl Driver for SunxiRsb {
    fn device(&self) -> &Device {
        self.sdev.device()
    }

    fn probe(&self) -> Result<()> {
        self.sdev.probe()?;

        let regs = self.sdev.regs();

        // Soft-reset the controller.
        regs.write_32(RSB_CTRL_REG, 1 << 0);
        regs.pollz_32(RSB_CTRL_REG, 1 << 0);

        // Set the bus clock rate to its default value (3 MHz).
        self.set_rate(3_000_000);

        // Switch all devices to RSB mode.
        regs.write_32(
            RSB_PMCR_REG,
            I2C_BCAST_ADDR | PMIC_MODE_REG << 8 | PMIC_MODE_VAL << 16 | 1 << 31,
        );
        regs.pollz_32(RSB_PMCR_REG, 1 << 31);

        Ok(())
    }

    fn release(&self) {
        self.sdev.release()
    }
}

impl RegmapBus for SunxiRsb {
    fn prepare(&self, addr: u8) -> Result<()> {
        // Set the device's runtime address.
        self.do_command(addr, RSB_SRTA)
    }

    fn read(&self, addr: u8, reg: u8) -> Result<u8> {
        let regs = self.sdev.regs();

        regs.write_32(RSB_ADDR_REG, reg.into());
        self.do_command(addr, RSB_RD8)?;

        Ok(regs.read_32(RSB_DATA_REG) as u8)
    }

    fn write(&self, addr: u8, reg: u8, value: u8) -> Result<()> {
        let regs = self.sdev.regs();

        regs.write_32(RSB_ADDR_REG, reg.into());
        regs.write_32(RSB_DATA_REG, value.into());

        self.do_command(addr, RSB_WR8)
    }
}
