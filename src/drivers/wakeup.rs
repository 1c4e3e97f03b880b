// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Wake sources polled while the system is off or asleep.
//!
//! Each source latches a wake condition in hardware; the protocol
//! decoders (CEC opcode filtering, infrared protocols) run in the
//! controllers or are out of scope here, so polling only has to check
//! and clear the latch.

use crate::device::{Device, Driver};
use crate::drivers::clock::ClockHandle;
use crate::error::Result;
use crate::mmio::Mmio;

/// An input able to wake the system from OFF or ASLEEP.
pub trait WakeSource: Driver {
    /// Returns a nonzero value if the source has signalled a wake
    /// condition since the last poll.
    fn pending(&self) -> u32;
}

const CEC_STAT: usize = 0x0106;
const CEC_MUTE: usize = 0x0186;
const IH_MUTE: usize = 0x01ff;
const CEC_CTRL: usize = 0x7d00;
const CEC_MASK: usize = 0x7d02;
const CEC_POL: usize = 0x7d03;
const CEC_LOCK: usize = 0x7d30;
const CEC_WKUPCTRL: usize = 0x7d31;

const IRQ_WAKEUP: u8 = 1 << 6;
const IRQ_ALL: u8 = 0xff;

const IH_MUTE_ALL: u8 = 0x03;

const CEC_CTRL_STANDBY: u8 = 1 << 4;

const CEC_LOCK_RELEASE: u8 = 0x00;

/// Wake on any of the CEC opcodes the controller can match in standby
/// mode (One Touch Play, Set Stream Path, deck and audio control, user
/// control presses).
const CEC_WKUP_MSG_ALL: u8 = 0xff;

/// The CEC function of a DesignWare HDMI controller.
pub struct DwHdmiCec {
    dev: Device,
    regs: Mmio,
    bus_clock: ClockHandle,
}

impl DwHdmiCec {
    /// Creates the CEC wake source over the HDMI register window.
    pub const fn new(regs: Mmio, bus_clock: ClockHandle) -> Self {
        Self {
            dev: Device::new("dw-hdmi-cec"),
            regs,
            bus_clock,
        }
    }
}

impl Driver for DwHdmiCec {
    fn device(&self) -> &Device {
        &self.dev
    }

    fn probe(&self) -> Result<()> {
        self.bus_clock.get()?;

        // Mute all interrupts while reconfiguring.
        self.regs.write_8(IH_MUTE, IH_MUTE_ALL);

        // Configure the CEC wakeup opcodes.
        self.regs.write_8(CEC_WKUPCTRL, CEC_WKUP_MSG_ALL);

        // Allow only the wakeup interrupt, on the positive edge.
        self.regs.write_8(CEC_POL, IRQ_WAKEUP);
        self.regs.write_8(CEC_MUTE, !IRQ_WAKEUP);
        self.regs.write_8(CEC_MASK, !IRQ_WAKEUP);

        // Clear any pending interrupt.
        self.regs.write_8(CEC_STAT, IRQ_ALL);

        // Release any CEC message held in the RX buffer.
        self.regs.write_8(CEC_LOCK, CEC_LOCK_RELEASE);

        // Put the controller in automatic mode: it NACKs everything but
        // the opcodes selected in CEC_WKUPCTRL.
        self.regs.write_8(CEC_CTRL, CEC_CTRL_STANDBY);

        // Unmute interrupts.
        self.regs.write_8(IH_MUTE, 0x00);

        Ok(())
    }

    fn release(&self) {
        // Mute all interrupts and leave automatic mode.
        self.regs.write_8(IH_MUTE, IH_MUTE_ALL);
        self.regs.write_8(CEC_WKUPCTRL, 0x00);
        self.regs.write_8(CEC_CTRL, 0x00);

        // Clear any pending interrupt and release the RX buffer for the
        // AP's driver.
        self.regs.write_8(CEC_STAT, IRQ_ALL);
        self.regs.write_8(CEC_LOCK, CEC_LOCK_RELEASE);

        self.bus_clock.put();
    }
}

impl WakeSource for DwHdmiCec {
    fn pending(&self) -> u32 {
        let stat = self.regs.read_8(CEC_STAT);

        // The status register is write-one-to-clear.
        self.regs.write_8(CEC_STAT, stat);

        (stat & IRQ_WAKEUP).into()
    }
}

const CIR_RXCTL: usize = 0x00;
const CIR_RXFIFO: usize = 0x20;
const CIR_RXSTA: usize = 0x30;
const CIR_RXCFG: usize = 0x34;

/// The infrared receiver in the always-on domain.
///
/// The protocol decoder proper lives outside the core; a received burst
/// while the receiver is armed is treated as a wake condition.
pub struct SunxiCir {
    dev: Device,
    regs: Mmio,
    bus_clock: ClockHandle,
    mod_clock: ClockHandle,
}

impl SunxiCir {
    /// Creates the infrared wake source.
    pub const fn new(regs: Mmio, bus_clock: ClockHandle, mod_clock: ClockHandle) -> Self {
        Self {
            dev: Device::new("r_cir_rx"),
            regs,
            bus_clock,
            mod_clock,
        }
    }
}

impl Driver for SunxiCir {
    fn device(&self) -> &Device {
        &self.dev
    }

    fn probe(&self) -> Result<()> {
        self.bus_clock.get()?;
        if let Err(err) = self.mod_clock.get() {
            self.bus_clock.put();
            return Err(err);
        }

        // Sample at the modulation clock rate with active-low input and
        // a generous idle threshold.
        self.regs.write_32(CIR_RXCFG, 0x010f_0310);

        // Reset, then enable the receiver in CIR mode.
        self.regs.write_32(CIR_RXCTL, 0x30);
        self.regs.write_32(CIR_RXCTL, 0x33);

        Ok(())
    }

    fn release(&self) {
        self.regs.write_32(CIR_RXCTL, 0x30);

        self.mod_clock.put();
        self.bus_clock.put();
    }
}

impl WakeSource for SunxiCir {
    fn pending(&self) -> u32 {
        // FIFO fill level; nonzero means a burst arrived.
        let available = self.regs.read_32(CIR_RXSTA) >> 8;

        if available != 0 {
            // Drain one sample so a stuck FIFO cannot wedge the poll.
            self.regs.read_32(CIR_RXFIFO);
        }

        available
    }
}
