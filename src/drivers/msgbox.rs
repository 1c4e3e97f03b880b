// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The sunxi message box.
//!
//! The controller provides eight unidirectional 32-bit FIFO channels
//! between the AP and the management core. Even channels carry AP to
//! firmware traffic and odd channels the reverse; the protocol engine
//! pairs them per client.

use crate::device::{Device, Driver};
use crate::drivers::clock::ClockHandle;
use crate::error::{Error, Result};
use crate::mmio::Mmio;

/// The number of hardware channels.
pub const CHANNELS: u8 = 8;

const CTRL_REG0: usize = 0x0000;
const CTRL_REG1: usize = 0x0004;
const CTRL_NORMAL: u32 = 0x0110_0110;

const IRQ_EN_REG: usize = 0x0040;
const IRQ_STAT_REG: usize = 0x0050;
const REMOTE_IRQ_STAT_REG: usize = 0x0070;

const FIFO_STAT_MASK: u32 = 1 << 0;
const MSG_STAT_MASK: u32 = 0x7;

fn rx_irq(chan: u8) -> u32 {
    1 << (2 * chan)
}

fn fifo_stat_reg(chan: u8) -> usize {
    0x0100 + 0x4 * usize::from(chan)
}

fn msg_stat_reg(chan: u8) -> usize {
    0x0140 + 0x4 * usize::from(chan)
}

fn msg_data_reg(chan: u8) -> usize {
    0x0180 + 0x4 * usize::from(chan)
}

/// A sunxi message box instance.
pub struct SunxiMsgbox {
    dev: Device,
    regs: Mmio,
    clock: ClockHandle,
}

impl SunxiMsgbox {
    /// Creates a message box over the given register window and bus
    /// clock.
    pub const fn new(regs: Mmio, clock: ClockHandle) -> Self {
        Self {
            dev: Device::new("msgbox"),
            regs,
            clock,
        }
    }

    fn peek_data(&self, chan: u8) -> bool {
        self.regs.read_32(msg_stat_reg(chan)) & MSG_STAT_MASK != 0
    }

    /// Dequeues one message from a channel, if one is pending.
    pub fn receive(&self, chan: u8) -> Option<u32> {
        debug_assert!(chan < CHANNELS);

        if !self.peek_data(chan) {
            return None;
        }

        Some(self.regs.read_32(msg_data_reg(chan)))
    }

    /// Acknowledges a received message, returning the channel's buffer
    /// to the sender.
    pub fn ack_rx(&self, chan: u8) {
        self.regs.write_32(IRQ_STAT_REG, rx_irq(chan));
    }

    /// Returns whether the remote side has drained the last message sent
    /// on a channel.
    pub fn last_tx_done(&self, chan: u8) -> bool {
        debug_assert!(chan < CHANNELS);

        self.regs.read_32(REMOTE_IRQ_STAT_REG) & rx_irq(chan) == 0
    }

    /// Enqueues a message on a channel.
    ///
    /// Fails with `Busy` if the channel FIFO is full.
    pub fn send(&self, chan: u8, msg: u32) -> Result<()> {
        debug_assert!(chan < CHANNELS);

        // Reject the message if the FIFO is full.
        if self.regs.read_32(fifo_stat_reg(chan)) & FIFO_STAT_MASK != 0 {
            return Err(Error::Busy);
        }
        self.regs.write_32(msg_data_reg(chan), msg);

        Ok(())
    }
}

impl Driver for SunxiMsgbox {
    fn device(&self) -> &Device {
        &self.dev
    }

    fn probe(&self) -> Result<()> {
        self.clock.get()?;

        // Set even channels ARM -> SCP and odd channels SCP -> ARM.
        self.regs.write_32(CTRL_REG0, CTRL_NORMAL);
        self.regs.write_32(CTRL_REG1, CTRL_NORMAL);

        // Drain messages in RX channels (required to clear IRQs).
        for chan in (0..CHANNELS).step_by(2) {
            while self.peek_data(chan) {
                self.regs.read_32(msg_data_reg(chan));
            }
        }

        // Disable and clear all IRQs.
        self.regs.write_32(IRQ_EN_REG, 0);
        self.regs.write_32(IRQ_STAT_REG, 0xffff);

        Ok(())
    }

    fn release(&self) {
        self.clock.put();
    }
}
