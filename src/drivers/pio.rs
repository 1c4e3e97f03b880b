// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The sunxi pin controller.

use crate::device::{Device, Driver};
use crate::drivers::gpio::{GpioController, GpioHandle, MODE_DISABLE};
use crate::drivers::simple::{self, SimpleDevice};
use crate::error::Result;

const PINS_PER_PORT: u8 = 32;

const MODE_WIDTH: u32 = 4;
const DATA_WIDTH: u32 = 1;
const DRIVE_WIDTH: u32 = 2;
const PULL_WIDTH: u32 = 2;

fn mode_reg(port: u8, pin: u8) -> usize {
    0x24 * usize::from(port) + 4 * (usize::from(pin) / (32 / MODE_WIDTH as usize))
}

fn mode_bit(pin: u8) -> u32 {
    MODE_WIDTH * (u32::from(pin) % (32 / MODE_WIDTH))
}

fn data_reg(port: u8) -> usize {
    0x0010 + 0x24 * usize::from(port)
}

fn drive_reg(port: u8, pin: u8) -> usize {
    0x0014 + 0x24 * usize::from(port) + 4 * (usize::from(pin) / (32 / DRIVE_WIDTH as usize))
}

fn drive_bit(pin: u8) -> u32 {
    DRIVE_WIDTH * (u32::from(pin) % (32 / DRIVE_WIDTH))
}

fn pull_reg(port: u8, pin: u8) -> usize {
    0x001c + 0x24 * usize::from(port) + 4 * (usize::from(pin) / (32 / PULL_WIDTH as usize))
}

fn pull_bit(pin: u8) -> u32 {
    PULL_WIDTH * (u32::from(pin) % (32 / PULL_WIDTH))
}

/// A sunxi port-I/O controller instance.
pub struct SunxiGpio {
    sdev: SimpleDevice,
}

impl SunxiGpio {
    /// Creates a pin controller over the given simple device.
    pub const fn new(sdev: SimpleDevice) -> Self {
        Self { sdev }
    }

    /// Adjusts this controller's refcount to match the AP's pinmux state.
    pub fn sync(&self) {
        simple::sync(self, self.sdev.clock());
    }

    fn split(gpio: &GpioHandle) -> (u8, u8) {
        (gpio.id / PINS_PER_PORT, gpio.id % PINS_PER_PORT)
    }
}

impl Driver for SunxiGpio {
    fn device(&self) -> &Device {
        self.sdev.device()
    }

    fn probe(&self) -> Result<()> {
        self.sdev.probe()
    }

    fn release(&self) {
        self.sdev.release()
    }
}

impl GpioController for SunxiGpio {
    fn init_pin(&self, gpio: &GpioHandle) -> Result<()> {
        let (port, pin) = Self::split(gpio);
        let regs = self.sdev.regs();

        // Set pin function configuration (mode).
        regs.set_bitfield_32(mode_reg(port, pin), mode_bit(pin), MODE_WIDTH, gpio.mode.into());
        // Set pin drive strength.
        regs.set_bitfield_32(
            drive_reg(port, pin),
            drive_bit(pin),
            DRIVE_WIDTH,
            gpio.drive.into(),
        );
        // Set pin pull-up or pull-down.
        regs.set_bitfield_32(pull_reg(port, pin), pull_bit(pin), PULL_WIDTH, gpio.pull.into());

        Ok(())
    }

    fn release_pin(&self, gpio: &GpioHandle) {
        let (port, pin) = Self::split(gpio);

        self.sdev.regs().set_bitfield_32(
            mode_reg(port, pin),
            mode_bit(pin),
            MODE_WIDTH,
            MODE_DISABLE.into(),
        );
    }

    fn get_value(&self, gpio: &GpioHandle) -> Result<bool> {
        let (port, pin) = Self::split(gpio);

        Ok(self
            .sdev
            .regs()
            .get_bitfield_32(data_reg(port), u32::from(pin), DATA_WIDTH)
            != 0)
    }

    fn set_value(&self, gpio: &GpioHandle, value: bool) -> Result<()> {
        let (port, pin) = Self::split(gpio);

        self.sdev
            .regs()
            .set_bitfield_32(data_reg(port), u32::from(pin), DATA_WIDTH, value.into());

        Ok(())
    }
}
