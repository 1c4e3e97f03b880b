// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Device addresses and statically-declared driver instances.

use super::ccu::{CCU, R_CCU, clk, r_clk};
use crate::drivers::clock::ClockHandle;
use crate::drivers::dram::Dram;
use crate::drivers::gpio::{self, GpioHandle};
use crate::drivers::i2c::Sun6iI2c;
use crate::drivers::irq::SunxiRIntc;
use crate::drivers::msgbox::SunxiMsgbox;
use crate::drivers::pio::SunxiGpio;
use crate::drivers::pmic::{Axp20x, Axp805Pmic};
use crate::drivers::regmap::{Regmap, RegmapBus};
use crate::drivers::regulator::{Axp20xRegulator, axp805};
use crate::drivers::rsb::SunxiRsb;
use crate::drivers::simple::SimpleDevice;
use crate::drivers::watchdog::SunxiTwd;
use crate::drivers::wakeup::{DwHdmiCec, SunxiCir};
use crate::mmio::Mmio;

/// MMIO window for a fixed device address on this SoC.
const fn dev(base: usize) -> Mmio {
    // SAFETY: `base` is the physical address of a device register block
    // on the H6, which is identity-mapped and always accessible to the
    // management core.
    unsafe { Mmio::new(base) }
}

pub const DEV_CCU: usize = 0x0300_1000;
pub const DEV_MSGBOX: usize = 0x0300_3000;
pub const DEV_PIO: usize = 0x0300_b000;
pub const DEV_DRAMCOM: usize = 0x0400_2000;
pub const DEV_DRAMCTL: usize = 0x0400_3000;
pub const DEV_DRAMPHY: usize = 0x0400_5000;
pub const DEV_HDMI: usize = 0x0600_0000;
pub const DEV_RTC: usize = 0x0700_0000;
pub const DEV_R_CPUCFG: usize = 0x0700_0400;
pub const DEV_R_PRCM: usize = 0x0701_0000;
pub const DEV_R_TWD: usize = 0x0702_0800;
pub const DEV_R_INTC: usize = 0x0702_1000;
pub const DEV_R_PIO: usize = 0x0702_2000;
pub const DEV_R_CIR_RX: usize = 0x0704_0000;
pub const DEV_R_UART: usize = 0x0708_0000;
pub const DEV_R_I2C: usize = 0x0708_1400;
pub const DEV_R_RSB: usize = 0x0708_3000;
pub const DEV_CNT_R: usize = 0x0811_0000;
pub const DEV_CPUCFG: usize = 0x0901_0000;

/// The base of DRAM in the management core's address space.
pub const DRAM_BASE: usize = 0x4000_0000;

/// The register window for a fixed device address.
pub const fn mmio(base: usize) -> Mmio {
    dev(base)
}

pub static MSGBOX: SunxiMsgbox = SunxiMsgbox::new(
    dev(DEV_MSGBOX),
    ClockHandle::new(&CCU, clk::BUS_MSGBOX),
);

pub static PIO: SunxiGpio = SunxiGpio::new(SimpleDevice::new(
    "pio",
    ClockHandle::new(&CCU, clk::BUS_PIO),
    None,
    dev(DEV_PIO),
));

pub static R_PIO: SunxiGpio = SunxiGpio::new(SimpleDevice::new(
    "r_pio",
    ClockHandle::new(&R_CCU, r_clk::BUS_R_PIO),
    None,
    dev(DEV_R_PIO),
));

pub static R_TWD: SunxiTwd = SunxiTwd::new(SimpleDevice::new(
    "r_twd",
    ClockHandle::new(&R_CCU, r_clk::BUS_R_TWD),
    None,
    dev(DEV_R_TWD),
));

pub static R_RSB: SunxiRsb = SunxiRsb::new(SimpleDevice::new(
    "r_rsb",
    ClockHandle::new(&R_CCU, r_clk::BUS_R_RSB),
    Some([
        GpioHandle {
            ctrl: &R_PIO,
            id: gpio::pin(0, 0),
            drive: gpio::DRIVE_30MA,
            mode: 2,
            pull: gpio::PULL_UP,
        },
        GpioHandle {
            ctrl: &R_PIO,
            id: gpio::pin(0, 1),
            drive: gpio::DRIVE_30MA,
            mode: 2,
            pull: gpio::PULL_UP,
        },
    ]),
    dev(DEV_R_RSB),
));

pub static R_I2C: Sun6iI2c = Sun6iI2c::new(SimpleDevice::new(
    "r_i2c",
    ClockHandle::new(&R_CCU, r_clk::BUS_R_I2C),
    Some([
        GpioHandle {
            ctrl: &R_PIO,
            id: gpio::pin(0, 0),
            drive: gpio::DRIVE_10MA,
            mode: 3,
            pull: gpio::PULL_UP,
        },
        GpioHandle {
            ctrl: &R_PIO,
            id: gpio::pin(0, 1),
            drive: gpio::DRIVE_10MA,
            mode: 3,
            pull: gpio::PULL_UP,
        },
    ]),
    dev(DEV_R_I2C),
));

/// The AXP805's register map, on the bus the board wires it to.
static PMIC_MAP: Regmap = if super::PMIC_USES_RSB {
    Regmap::new(&R_RSB as &'static dyn RegmapBus, 0x2d)
} else {
    Regmap::new(&R_I2C as &'static dyn RegmapBus, 0x36)
};

pub static AXP: Axp20x = Axp20x::new("axp20x", PMIC_MAP, 0x40);

pub static PMIC: Axp805Pmic = Axp805Pmic::new(&AXP);

pub static REGULATOR: Axp20xRegulator =
    Axp20xRegulator::new("axp805-regulator", &AXP, &axp805::INFO);

pub static CEC: DwHdmiCec = DwHdmiCec::new(
    dev(DEV_HDMI),
    ClockHandle::new(&R_CCU, r_clk::OSC24M),
);

pub static CIR: SunxiCir = SunxiCir::new(
    dev(DEV_R_CIR_RX),
    ClockHandle::new(&R_CCU, r_clk::BUS_R_CIR),
    ClockHandle::new(&R_CCU, r_clk::R_CIR),
);

// External interrupt lines whose pads lose power with VDD-SYS: ports B,
// F, G, and H (interrupts 83, 85, 86, and 91).
pub static WAKE_IRQ: SunxiRIntc = SunxiRIntc::new(
    dev(DEV_R_INTC),
    2,
    [0; 4],
    [0, 1 << (83 - 64) | 1 << (85 - 64) | 1 << (86 - 64) | 1 << (91 - 64), 0, 0],
);

pub static DRAM: Dram = Dram::new(
    dev(DEV_DRAMCOM),
    dev(DEV_DRAMCTL),
    dev(DEV_DRAMPHY),
    ClockHandle::new(&CCU, clk::BUS_DRAM),
    ClockHandle::new(&CCU, clk::DRAM),
    ClockHandle::new(&CCU, clk::MBUS),
    dev(DRAM_BASE),
    1 << 26,
);
