// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The sun6i I²C controller, in master mode only.

use crate::counter::udelay;
use crate::device::{Device, Driver};
use crate::drivers::regmap::RegmapBus;
use crate::drivers::simple::SimpleDevice;
use crate::error::{Error, Result};

const I2C_ADDR_REG: usize = 0x00;
const I2C_XADDR_REG: usize = 0x04;
const I2C_DATA_REG: usize = 0x08;
const I2C_CTRL_REG: usize = 0x0c;
const I2C_STAT_REG: usize = 0x10;
const I2C_CCR_REG: usize = 0x14;
const I2C_SRST_REG: usize = 0x18;

const START_COND_TX: u32 = 0x08;
const START_COND_TX_REPEAT: u32 = 0x10;
const ADDR_WRITE_TX_ACK: u32 = 0x18;
const DATA_TX_ACK: u32 = 0x28;
const ADDR_READ_TX_ACK: u32 = 0x40;
const DATA_RX_NACK: u32 = 0x58;
const IDLE: u32 = 0xf8;

const READ: u32 = 1;
const WRITE: u32 = 0;

/// A sun6i I²C controller instance.
pub struct Sun6iI2c {
    sdev: SimpleDevice,
}

impl Sun6iI2c {
    /// Creates an I²C controller over the given simple device.
    pub const fn new(sdev: SimpleDevice) -> Self {
        Self { sdev }
    }

    fn wait_idle(&self) -> Result<()> {
        let regs = self.sdev.regs();

        // With a single master on the bus, this should only take one cycle.
        let mut timeout = 2;
        while regs.read_32(I2C_CTRL_REG) & (1 << 5 | 1 << 4) != 0 {
            // 10μs is one 100kHz bus cycle.
            udelay(10);
            if timeout == 0 {
                return Err(Error::Io);
            }
            timeout -= 1;
        }

        if regs.read_32(I2C_STAT_REG) != IDLE {
            return Err(Error::Io);
        }

        Ok(())
    }

    fn wait_start(&self) -> Result<()> {
        let regs = self.sdev.regs();

        let mut timeout = 2;
        while regs.read_32(I2C_CTRL_REG) & 1 << 5 != 0 {
            udelay(10);
            if timeout == 0 {
                return Err(Error::Io);
            }
            timeout -= 1;
        }

        Ok(())
    }

    fn wait_state(&self, state: u32) -> Result<()> {
        let regs = self.sdev.regs();

        // Wait for up to 8 transfer cycles, one ACK, and one extra cycle.
        let mut timeout = 10;
        while regs.read_32(I2C_CTRL_REG) & 1 << 3 == 0 {
            udelay(10);
            if timeout == 0 {
                return Err(Error::Io);
            }
            timeout -= 1;
        }

        if regs.read_32(I2C_STAT_REG) != state {
            return Err(Error::Io);
        }

        Ok(())
    }

    fn start(&self, addr: u8, direction: u32) -> Result<()> {
        let regs = self.sdev.regs();
        let init_state = regs.read_32(I2C_STAT_REG);

        // Send a start condition.
        regs.set_32(I2C_CTRL_REG, 1 << 5 | 1 << 3);
        self.wait_start()?;

        // The bus reports a repeated start unless it was previously idle.
        let state = if init_state == IDLE {
            START_COND_TX
        } else {
            START_COND_TX_REPEAT
        };
        self.wait_state(state)?;

        // Write the address and direction, then trigger a state change.
        regs.write_32(I2C_DATA_REG, u32::from(addr) << 1 | direction);
        regs.set_32(I2C_CTRL_REG, 1 << 3);

        // Check for address acknowledgement.
        let state = if direction == WRITE {
            ADDR_WRITE_TX_ACK
        } else {
            ADDR_READ_TX_ACK
        };
        self.wait_state(state)
    }

    fn stop(&self) {
        // Send a stop condition; wait for the bus to go idle.
        self.sdev.regs().set_32(I2C_CTRL_REG, 1 << 4 | 1 << 3);
        let _ = self.wait_idle();
    }

    fn read_byte(&self) -> Result<u8> {
        let regs = self.sdev.regs();

        // Disable sending an ACK and trigger a state change.
        regs.clrset_32(I2C_CTRL_REG, 1 << 2, 1 << 3);
        self.wait_state(DATA_RX_NACK)?;

        Ok(regs.read_32(I2C_DATA_REG) as u8)
    }

    fn write_byte(&self, value: u8) -> Result<()> {
        let regs = self.sdev.regs();

        // Write data, then trigger a state change.
        regs.write_32(I2C_DATA_REG, value.into());
        regs.set_32(I2C_CTRL_REG, 1 << 3);

        self.wait_state(DATA_TX_ACK)
    }
}

impl Driver for Sun6iI2c {
    fn device(&self) -> &Device {
        self.sdev.device()
    }

    fn probe(&self) -> Result<()> {
        self.sdev.probe()?;

        let regs = self.sdev.regs();

        // Set the bus clock divider for 400 kHz operation.
        regs.write_32(I2C_CCR_REG, 0x0000_0011);

        // Clear the slave address (this driver only supports master mode).
        regs.write_32(I2C_ADDR_REG, 0);
        regs.write_32(I2C_XADDR_REG, 0);

        // Enable the bus and stop any current transaction, with
        // interrupts disabled and no ACK for received bytes.
        regs.write_32(I2C_CTRL_REG, 1 << 6 | 1 << 4);

        // Soft reset the controller.
        regs.set_32(I2C_SRST_REG, 1 << 0);

        if let Err(err) = self.wait_idle() {
            self.sdev.release();
            return Err(err);
        }

        Ok(())
    }

    fn release(&self) {
        self.sdev.release()
    }
}

impl RegmapBus for Sun6iI2c {
    fn prepare(&self, addr: u8) -> Result<()> {
        // Read a byte to avoid putting the device in an inconsistent
        // state, then finish the transaction.
        let err = self
            .start(addr, READ)
            .and_then(|()| self.read_byte().map(|_| ()));
        self.stop();

        err.map_err(|_| Error::NoDevice)
    }

    fn read(&self, addr: u8, reg: u8) -> Result<u8> {
        let result = self
            .start(addr, WRITE)
            .and_then(|()| self.write_byte(reg))
            .and_then(|()| self.start(addr, READ))
            .and_then(|()| self.read_byte());
        self.stop();

        result
    }

    fn write(&self, addr: u8, reg: u8, value: u8) -> Result<()> {
        let result = self
            .start(addr, WRITE)
            .and_then(|()| self.write_byte(reg))
            .and_then(|()| self.write_byte(value));
        self.stop();

        result
    }
}
