// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The H6 clock controllers and always-on power-domain sequencing.

use super::devices::{DEV_CCU, DEV_R_PRCM, mmio};
use crate::counter::udelay;
use crate::drivers::ccu::{self, Ccu, CcuClockDesc};
use crate::drivers::clock::ClockHandle;
use crate::mmio::{bitfield_get, bitmap_index};
use crate::system::SuspendDepth;
use crate::{define_fixed_parent, define_fixed_rate};
use core::sync::atomic::AtomicU8;

/// Clock ids provided by the main clock controller.
pub mod clk {
    pub const PLL_DDR0: u8 = 0;
    pub const PLL_PERIPH0: u8 = 1;
    pub const APB2: u8 = 2;
    pub const MBUS: u8 = 3;
    pub const BUS_MSGBOX: u8 = 4;
    pub const DRAM: u8 = 5;
    pub const BUS_DRAM: u8 = 6;
    pub const BUS_PIO: u8 = 7;
}

/// Clock ids provided by the always-on (PRCM) clock controller.
pub mod r_clk {
    pub const OSC16M: u8 = 0;
    pub const OSC24M: u8 = 1;
    pub const OSC32K: u8 = 2;
    pub const AR100: u8 = 3;
    pub const R_AHB: u8 = 4;
    pub const R_APB1: u8 = 5;
    pub const R_APB2: u8 = 6;
    pub const BUS_R_PIO: u8 = 7;
    pub const BUS_R_TWD: u8 = 8;
    pub const BUS_R_UART: u8 = 9;
    pub const BUS_R_I2C: u8 = 10;
    pub const BUS_R_RSB: u8 = 11;
    pub const BUS_R_CIR: u8 = 12;
    pub const R_CIR: u8 = 13;
}

const ATOMIC_U8_ZERO: AtomicU8 = AtomicU8::new(0);

// Main clock controller configuration registers.
const CPUX_AXI_CFG_REG: usize = 0x0500;
const PSI_CFG_REG: usize = 0x0510;
const AHB3_CFG_REG: usize = 0x051c;
const APB1_CFG_REG: usize = 0x0520;
const APB2_CFG_REG: usize = 0x0524;

define_fixed_rate!(pll_periph0_rate, 600_000_000);
define_fixed_parent!(pll_ddr0_parent, CCU, clk::PLL_DDR0);
// While APB2 has a mux, assume its parent is OSC24M. Reparenting APB2 to
// PLL_PERIPH0 for faster UART clocks is unsupported.
define_fixed_parent!(apb2_parent, R_CCU, r_clk::OSC24M);

static CCU_CLOCKS: [CcuClockDesc; 8] = [
    // PLL_DDR0
    CcuClockDesc::new(ccu::parent_none, ccu::rate_parent)
        .with_reg(0x0010)
        .with_lock(28)
        .with_gate(bitmap_index(0x0010, 31)),
    // PLL_PERIPH0
    CcuClockDesc::new(ccu::parent_none, pll_periph0_rate),
    // APB2
    CcuClockDesc::new(apb2_parent, ccu::rate_parent),
    // MBUS
    CcuClockDesc::new(ccu::parent_none, ccu::rate_parent)
        .with_gate(bitmap_index(0x0540, 31))
        .with_reset(bitmap_index(0x0540, 30)),
    // BUS_MSGBOX
    CcuClockDesc::new(ccu::parent_none, ccu::rate_parent)
        .with_gate(bitmap_index(0x071c, 0))
        .with_reset(bitmap_index(0x071c, 16)),
    // DRAM
    CcuClockDesc::new(pll_ddr0_parent, ccu::rate_parent)
        .with_reg(0x0800)
        .with_update(27)
        .with_reset(bitmap_index(0x0800, 30)),
    // BUS_DRAM (reset requires re-training DRAM, so ignore it)
    CcuClockDesc::new(ccu::parent_none, ccu::rate_parent).with_gate(bitmap_index(0x080c, 0)),
    // BUS_PIO
    CcuClockDesc::new(ccu::parent_none, ccu::rate_parent),
];

static CCU_REFCOUNTS: [AtomicU8; 8] = [ATOMIC_U8_ZERO; 8];

/// The main clock controller.
pub static CCU: Ccu = Ccu::new("ccu", mmio(DEV_CCU), &CCU_CLOCKS, &CCU_REFCOUNTS);

// Always-on clock controller configuration registers.
const CLK_AR100_REG: usize = 0x0000;
const CLK_R_APB1_REG: usize = 0x000c;
const CLK_R_APB2_REG: usize = 0x0010;
const CLK_R_CIR_REG: usize = 0x01c0;

define_fixed_rate!(osc16m_rate, 16_000_000);
define_fixed_rate!(osc24m_rate, 24_000_000);
define_fixed_rate!(osc32k_rate, 32_768);

static BUS_PARENTS: [ClockHandle; 4] = [
    ClockHandle::new(&R_CCU, r_clk::OSC24M),
    ClockHandle::new(&R_CCU, r_clk::OSC32K),
    ClockHandle::new(&R_CCU, r_clk::OSC16M),
    ClockHandle::new(&CCU, clk::PLL_PERIPH0),
];

fn bus_parent(ccu: &'static Ccu, _id: u8) -> Option<ClockHandle> {
    let val = ccu.regs().read_32(CLK_AR100_REG);

    Some(BUS_PARENTS[bitfield_get(val, 24, 2) as usize])
}

fn mp_rate(ccu: &Ccu, id: u8, parent_rate: u32) -> u32 {
    let reg = match id {
        r_clk::AR100 => CLK_AR100_REG,
        r_clk::R_APB2 => CLK_R_APB2_REG,
        r_clk::R_CIR => CLK_R_CIR_REG,
        _ => unreachable!(),
    };
    let val = ccu.regs().read_32(reg);

    // For AR100 and R_APB2, this assumes the pre-divider for PLL_PERIPH0
    // (parent 3) will only be set if parent 3 is selected in the mux.
    ccu::calc_rate_mp(val, parent_rate, 0, 5, 8, 2)
}

define_fixed_parent!(r_ahb_parent, R_CCU, r_clk::AR100);
define_fixed_parent!(r_apb1_parent, R_CCU, r_clk::R_AHB);
define_fixed_parent!(r_apb1_dev_parent, R_CCU, r_clk::R_APB1);
define_fixed_parent!(r_apb2_dev_parent, R_CCU, r_clk::R_APB2);

fn r_apb1_rate(ccu: &Ccu, _id: u8, parent_rate: u32) -> u32 {
    let val = ccu.regs().read_32(CLK_R_APB1_REG);

    ccu::calc_rate_m(val, parent_rate, 0, 2)
}

static MODULE_PARENTS: [ClockHandle; 2] = [
    ClockHandle::new(&R_CCU, r_clk::OSC32K),
    ClockHandle::new(&R_CCU, r_clk::OSC24M),
];

fn module_parent(ccu: &'static Ccu, _id: u8) -> Option<ClockHandle> {
    let val = ccu.regs().read_32(CLK_R_CIR_REG);

    Some(MODULE_PARENTS[bitfield_get(val, 24, 1) as usize])
}

static R_CCU_CLOCKS: [CcuClockDesc; 14] = [
    // OSC16M
    CcuClockDesc::new(ccu::parent_none, osc16m_rate),
    // OSC24M
    CcuClockDesc::new(ccu::parent_none, osc24m_rate),
    // OSC32K
    CcuClockDesc::new(ccu::parent_none, osc32k_rate),
    // AR100
    CcuClockDesc::new(bus_parent, mp_rate),
    // R_AHB
    CcuClockDesc::new(r_ahb_parent, ccu::rate_parent),
    // R_APB1
    CcuClockDesc::new(r_apb1_parent, r_apb1_rate),
    // R_APB2
    CcuClockDesc::new(bus_parent, mp_rate),
    // BUS_R_PIO
    CcuClockDesc::new(r_apb1_dev_parent, ccu::rate_parent),
    // BUS_R_TWD
    CcuClockDesc::new(r_apb1_dev_parent, ccu::rate_parent)
        .with_gate(bitmap_index(0x012c, 0))
        .with_reset(bitmap_index(0x012c, 16)),
    // BUS_R_UART
    CcuClockDesc::new(r_apb2_dev_parent, ccu::rate_parent)
        .with_gate(bitmap_index(0x018c, 0))
        .with_reset(bitmap_index(0x018c, 16)),
    // BUS_R_I2C
    CcuClockDesc::new(r_apb2_dev_parent, ccu::rate_parent)
        .with_gate(bitmap_index(0x019c, 0))
        .with_reset(bitmap_index(0x019c, 16)),
    // BUS_R_RSB
    CcuClockDesc::new(r_apb2_dev_parent, ccu::rate_parent)
        .with_gate(bitmap_index(0x01bc, 0))
        .with_reset(bitmap_index(0x01bc, 16)),
    // BUS_R_CIR
    CcuClockDesc::new(r_apb1_dev_parent, ccu::rate_parent)
        .with_gate(bitmap_index(0x01cc, 0))
        .with_reset(bitmap_index(0x01cc, 16)),
    // R_CIR
    CcuClockDesc::new(module_parent, mp_rate).with_gate(bitmap_index(0x01c0, 31)),
];

static R_CCU_REFCOUNTS: [AtomicU8; 14] = [ATOMIC_U8_ZERO; 14];

/// The always-on clock controller, sharing the PRCM register block.
pub static R_CCU: Ccu = Ccu::new("r_ccu", mmio(DEV_R_PRCM), &R_CCU_CLOCKS, &R_CCU_REFCOUNTS);

// PRCM power-control registers.
const CPUS_CLK_REG: usize = 0x0000;
const PLL_CTRL_REG1: usize = 0x0244;
const PLL_CTRL_REG1_KEY: u32 = 0xa7 << 24;
const PLL_CTRL_REG1_KEY_FIELD: u32 = 0xff << 24;
const PLL_CTRL_REG1_CRYSTAL_EN: u32 = 1 << 2;
const PLL_CTRL_REG1_LDO_EN: u32 = 1 << 0;
const PLL_CTRL_REG1_MASK: u32 =
    PLL_CTRL_REG1_KEY_FIELD | PLL_CTRL_REG1_CRYSTAL_EN | PLL_CTRL_REG1_LDO_EN;

const VDD_SYS_PWROFF_GATING_REG: usize = 0x0250;
const VDD_CPUS_GATING: u32 = 1 << 3;
const VCC_PLL_GATING: u32 = 1 << 2;

const VDD_SYS_RESET_REG: usize = 0x0260;
const VDD_SYS_RESET: u32 = 1 << 0;

/// Writes a value to the lockable bits in PLL_CTRL_REG1.
fn write_pll_ctrl_reg1(new: u32) {
    let regs = mmio(DEV_R_PRCM);
    let val = regs.read_32(PLL_CTRL_REG1) & !PLL_CTRL_REG1_MASK;

    // Unlock if locked, otherwise write value.
    regs.write_32(PLL_CTRL_REG1, val | new | PLL_CTRL_REG1_KEY);
    // Write value if just unlocked, otherwise write same; lock.
    regs.write_32(PLL_CTRL_REG1, val | new);
}

/// One-time setup of the always-on clock tree.
pub fn r_ccu_init() {
    // Run CPUS from OSC24M directly; the management core does not need
    // more, and OSC24M is available from cold boot.
    mmio(DEV_R_PRCM).write_32(CPUS_CLK_REG, 0);
}

/// Collapses the always-on domain to the given depth.
pub fn r_ccu_suspend(depth: SuspendDepth) {
    let regs = mmio(DEV_R_PRCM);

    if depth == SuspendDepth::None {
        return;
    }

    // Power down the crystal oscillator and the PLL LDO.
    write_pll_ctrl_reg1(PLL_CTRL_REG1_LDO_EN);
    udelay(1);
    write_pll_ctrl_reg1(0);
    if depth == SuspendDepth::Osc24m {
        return;
    }

    regs.set_32(VDD_SYS_PWROFF_GATING_REG, VCC_PLL_GATING);
    if depth == SuspendDepth::Avcc {
        return;
    }

    regs.set_32(VDD_SYS_PWROFF_GATING_REG, VDD_CPUS_GATING);
    regs.write_32(VDD_SYS_RESET_REG, 0);
}

/// Restores the always-on domain.
///
/// The suspend steps are incremental and idempotent, so there is no need
/// to branch on the suspend depth; just undo them all. This also handles
/// a firmware restart where the depth is unknown.
pub fn r_ccu_resume() {
    let regs = mmio(DEV_R_PRCM);

    regs.write_32(VDD_SYS_RESET_REG, VDD_SYS_RESET);
    regs.clr_32(VDD_SYS_PWROFF_GATING_REG, VDD_CPUS_GATING | VCC_PLL_GATING);
    if regs.get_32(PLL_CTRL_REG1, PLL_CTRL_REG1_LDO_EN) == 0 {
        write_pll_ctrl_reg1(PLL_CTRL_REG1_LDO_EN);
        udelay(2000);
        write_pll_ctrl_reg1(PLL_CTRL_REG1_CRYSTAL_EN | PLL_CTRL_REG1_LDO_EN);
    }
}

/// One-time setup of the main clock tree.
pub fn ccu_init() {
    // Set APB2 to OSC24M/1 (24MHz).
    mmio(DEV_CCU).write_32(APB2_CFG_REG, 0);

    ccu_resume();
}

/// Slows the AP clock tree down for suspend.
pub fn ccu_suspend() {
    let regs = mmio(DEV_CCU);

    // Set CPUX to LOSC (32kHz), APB to CPUX/4, AXI to CPUX/3.
    regs.write_32(CPUX_AXI_CFG_REG, 1 << 24 | 3 << 8 | 2);

    // Set PSI/AHB1/AHB2 to LOSC/1 (32kHz).
    regs.write_32(PSI_CFG_REG, 1 << 24);

    // Set AHB3 to LOSC/1 (32kHz).
    regs.write_32(AHB3_CFG_REG, 1 << 24);

    // Set APB1 to LOSC/2 (16kHz).
    regs.write_32(APB1_CFG_REG, 1 << 24 | 1 << 8);
}

/// Restores the AP clock tree to full speed.
pub fn ccu_resume() {
    let regs = mmio(DEV_CCU);

    // Set CPUX to PLL_CPUX, APB to CPUX/4, AXI to CPUX/3.
    regs.write_32(CPUX_AXI_CFG_REG, 3 << 24 | 3 << 8 | 2);

    // Set PSI/AHB1/AHB2 to PLL_PERIPH0/3 (200MHz).
    regs.write_32(PSI_CFG_REG, 3 << 24 | 2);

    // Set AHB3 to PLL_PERIPH0/3 (200MHz).
    regs.write_32(AHB3_CFG_REG, 3 << 24 | 2);

    // Set APB1 to PLL_PERIPH0/6 (100MHz).
    regs.write_32(APB1_CFG_REG, 3 << 24 | 1 << 8 | 2);
}
